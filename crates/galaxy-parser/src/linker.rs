//! Flat prefix stream → application graph.
//!
//! The stream is consumed right to left with two stacks. Popping the input
//! stack yields either a leaf, which moves to the output stack, or the `ap`
//! marker, which pops the function and then its argument from the output
//! stack and pushes their application. A well-formed stream leaves exactly
//! one term behind.

use galaxy_types::{FlatTerm, Term, TermRef};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("expression is empty")]
    Empty,

    /// `position` is the index of the offending `ap` in the stream.
    #[error("'ap' at position {position} needs two operands, found {found}")]
    MissingOperands { position: usize, found: usize },

    #[error("expression leaves {count} terms instead of one; missing 'ap'?")]
    DanglingTerms { count: usize },
}

/// Link a flat stream into a single term.
pub fn link(stream: &[FlatTerm]) -> Result<TermRef, LinkError> {
    let mut input: Vec<(usize, &FlatTerm)> = stream.iter().enumerate().collect();
    let mut output: Vec<TermRef> = Vec::new();

    while let Some((position, item)) = input.pop() {
        match item {
            FlatTerm::Leaf(term) => output.push(term.clone()),
            FlatTerm::Apply => {
                let found = output.len().min(2);
                let (Some(function), Some(argument)) = (output.pop(), output.pop()) else {
                    return Err(LinkError::MissingOperands { position, found });
                };
                output.push(Term::apply(function, argument));
            }
        }
    }

    match output.len() {
        0 => Err(LinkError::Empty),
        1 => output.pop().ok_or(LinkError::Empty),
        count => Err(LinkError::DanglingTerms { count }),
    }
}
