//! Galaxy evaluator.
//!
//! Reduces linked term graphs to weak head normal form, encodes and decodes
//! modulated signals, and drives the interaction protocol through an
//! injected [`Transport`].

pub mod codec;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod session;
pub mod transport;

pub use codec::{demodulate, modulate, CodecError};
pub use env::Environment;
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use session::{InteractionOutcome, Session};
pub use transport::{Transport, TransportError};
