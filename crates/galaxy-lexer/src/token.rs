//! Token types for the galaxy lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of a galaxy script and
//! [`Token`], which pairs a kind with a source [`Span`].

use galaxy_types::{Combinator, Span, VarId};
use std::fmt;

/// Words with a meaning of their own besides the combinator names.
pub const RESERVED_WORDS: &[&str] = &["ap", "nil", "galaxy"];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the galaxy lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns `true` for tokens that become a leaf of the term graph.
    pub fn is_operand(&self) -> bool {
        self.kind.is_operand()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// The application marker `ap`.
    Ap,
    Combinator(Combinator),
    Nil,
    Integer(i64),
    /// `:N` or `galaxy`.
    Variable(VarId),
    /// A quoted bit string, without the quotes.
    Signal(String),

    Assign,
    LParen,
    Comma,
    RParen,

    Newline,
    Eof,
}

impl TokenKind {
    /// Resolve a bare word that is not a number or a variable reference.
    pub fn from_word(word: &str) -> Option<TokenKind> {
        match word {
            "ap" => Some(TokenKind::Ap),
            "nil" => Some(TokenKind::Nil),
            "galaxy" => Some(TokenKind::Variable(VarId::GALAXY)),
            _ => Combinator::from_name(word).map(TokenKind::Combinator),
        }
    }

    pub fn is_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Combinator(_)
                | TokenKind::Nil
                | TokenKind::Integer(_)
                | TokenKind::Variable(_)
                | TokenKind::Signal(_)
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ap => write!(f, "ap"),
            TokenKind::Combinator(op) => write!(f, "{op}"),
            TokenKind::Nil => write!(f, "nil"),
            TokenKind::Integer(n) => write!(f, "{n}"),
            TokenKind::Variable(id) => write!(f, "{id}"),
            TokenKind::Signal(bits) => write!(f, "\"{bits}\""),
            TokenKind::Assign => write!(f, "="),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Comma => write!(f, ","),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_word_reserved() {
        assert_eq!(TokenKind::from_word("ap"), Some(TokenKind::Ap));
        assert_eq!(TokenKind::from_word("nil"), Some(TokenKind::Nil));
        assert_eq!(
            TokenKind::from_word("galaxy"),
            Some(TokenKind::Variable(VarId::GALAXY))
        );
    }

    #[test]
    fn test_from_word_combinators_and_aliases() {
        assert_eq!(
            TokenKind::from_word("cons"),
            Some(TokenKind::Combinator(Combinator::Cons))
        );
        assert_eq!(
            TokenKind::from_word("vec"),
            Some(TokenKind::Combinator(Combinator::Cons))
        );
        assert_eq!(
            TokenKind::from_word("mod"),
            Some(TokenKind::Combinator(Combinator::Modulate))
        );
        assert_eq!(TokenKind::from_word("Cons"), None);
        assert_eq!(TokenKind::from_word("frob"), None);
    }

    #[test]
    fn test_reserved_words_resolve() {
        for word in RESERVED_WORDS {
            assert!(TokenKind::from_word(word).is_some(), "{word}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TokenKind::Ap.to_string(), "ap");
        assert_eq!(TokenKind::Combinator(Combinator::Pwr2).to_string(), "pwr2");
        assert_eq!(TokenKind::Integer(-42).to_string(), "-42");
        assert_eq!(TokenKind::Variable(VarId(1029)).to_string(), ":1029");
        assert_eq!(TokenKind::Signal("110".into()).to_string(), "\"110\"");
        assert_eq!(TokenKind::Eof.to_string(), "end of file");
    }

    #[test]
    fn test_operands() {
        let span = Span::new(1, 1, 2);
        assert!(Token::new(TokenKind::Nil, span).is_operand());
        assert!(Token::new(TokenKind::Integer(0), span).is_operand());
        assert!(!Token::new(TokenKind::Ap, span).is_operand());
        assert!(!Token::new(TokenKind::Comma, span).is_operand());
    }
}
