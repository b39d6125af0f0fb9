//! Parsed galaxy scripts.

use crate::term::{TermRef, VarId};
use crate::Span;

/// A parsed script: one statement per non-blank line, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub statements: Vec<Statement>,
}

impl Script {
    /// Statements that bind a variable.
    pub fn assignments(&self) -> impl Iterator<Item = (VarId, &TermRef)> {
        self.statements.iter().filter_map(|stmt| match &stmt.kind {
            StatementKind::Assignment { target, term } => Some((*target, term)),
            StatementKind::Expression(_) => None,
        })
    }

    /// Bare expressions whose values are reported.
    pub fn expressions(&self) -> impl Iterator<Item = &TermRef> {
        self.statements.iter().filter_map(|stmt| match &stmt.kind {
            StatementKind::Expression(term) => Some(term),
            StatementKind::Assignment { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `:N = expr` or `galaxy = expr`
    Assignment { target: VarId, term: TermRef },
    Expression(TermRef),
}
