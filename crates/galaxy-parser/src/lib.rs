//! Galaxy parser: converts a token stream into linked statements.
//!
//! A statement's tokens go through two pure stages. [`desugar`] rewrites
//! list literals into plain `ap ap cons` prefix form, and [`link`] turns the
//! resulting flat stream into an application graph.

mod desugar;
mod linker;
mod parser;

pub use desugar::{desugar, SugarError};
pub use linker::{link, LinkError};
pub use parser::{ParseResult, Parser};
