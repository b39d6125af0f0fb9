//! HTTP transport for `send`.

use std::time::Duration;

use galaxy_eval::{Transport, TransportError};
use log::debug;

use crate::config::RunnerConfig;

/// POSTs each modulated request as `text/plain` and returns the body
/// unmodified. Any non-2xx status is a failure.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            url: config.send_url(),
            timeout: config.timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, request: &str) -> Result<String, TransportError> {
        debug!("POST {}", self.url);
        let response = ureq::post(&self.url)
            .timeout(self.timeout)
            .set("Content-Type", "text/plain")
            .send_string(request);

        match response {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| TransportError::Io(e.to_string())),
            Err(ureq::Error::Status(status, resp)) => Err(TransportError::Status {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(e) => Err(TransportError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_from_config() {
        let config = RunnerConfig {
            api_key: Some("k".into()),
            ..RunnerConfig::default()
        };
        let transport = HttpTransport::new(&config);
        assert!(transport.url().ends_with("/aliens/send?apiKey=k"));
    }

    #[test]
    fn test_unreachable_server_is_io_error() {
        let config = RunnerConfig {
            // port 9 (discard) on loopback is closed on test machines
            server: "http://127.0.0.1:9".into(),
            timeout: Duration::from_secs(2),
            ..RunnerConfig::default()
        };
        let mut transport = HttpTransport::new(&config);
        assert!(matches!(transport.send("010"), Err(TransportError::Io(_))));
    }
}
