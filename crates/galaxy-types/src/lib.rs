//! Shared types for the Galaxy evaluator.
//!
//! This crate defines the term graph, the flat pre-link token stream,
//! the picture record produced by drawing primitives, parsed scripts, source
//! spans and the structured errors reported by the front end.

mod error;
mod span;
pub mod picture;
pub mod script;
pub mod term;

pub use error::{CompileErrors, ErrorCategory, ErrorCode, GalaxyError, MAX_ERRORS};
pub use picture::{Picture, Point};
pub use script::{Script, Statement, StatementKind};
pub use span::{SourceFile, Span};
pub use term::{Application, Combinator, FlatTerm, Term, TermRef, VarId};
