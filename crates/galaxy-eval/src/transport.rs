//! The wire capability used by `send` and the interaction driver.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no transport configured")]
    Unavailable,

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Io(String),
}

/// Sends one modulated request and blocks until the response arrives.
pub trait Transport {
    fn send(&mut self, request: &str) -> Result<String, TransportError>;
}

impl<F> Transport for F
where
    F: FnMut(&str) -> Result<String, TransportError>,
{
    fn send(&mut self, request: &str) -> Result<String, TransportError> {
        self(request)
    }
}
