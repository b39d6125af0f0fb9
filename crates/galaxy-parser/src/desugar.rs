//! List literal sugar.
//!
//! `(a, b, c)` is shorthand for `ap ap cons a ap ap cons b ap ap cons c nil`
//! and `()` for `nil`. A comma outside any parentheses wraps the whole
//! expression in an implied list, so `1, 2` reads as `(1, 2)`. The rewrite
//! is purely lexical: elements are copied through unchanged, and whether each
//! one is a complete expression is left to the linker.

use galaxy_lexer::{Token, TokenKind};
use galaxy_types::{Combinator, ErrorCode, FlatTerm, Span, Term, TermRef};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SugarError {
    #[error("list element is empty or incomplete")]
    MisplacedComma { span: Span },

    #[error("'(' is never closed")]
    Unclosed { span: Span },

    #[error("')' has no matching '('")]
    Unopened { span: Span },

    #[error("'{token}' cannot appear inside an expression")]
    Unexpected { token: TokenKind, span: Span },
}

impl SugarError {
    pub fn span(&self) -> Span {
        match self {
            Self::MisplacedComma { span }
            | Self::Unclosed { span }
            | Self::Unopened { span }
            | Self::Unexpected { span, .. } => *span,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MisplacedComma { .. } => ErrorCode::MISPLACED_COMMA,
            Self::Unclosed { .. } | Self::Unopened { .. } => ErrorCode::UNBALANCED_LIST,
            Self::Unexpected {
                token: TokenKind::Assign,
                ..
            } => ErrorCode::MISPLACED_ASSIGNMENT,
            Self::Unexpected { .. } => ErrorCode::MALFORMED_PROGRAM,
        }
    }
}

/// What the previous token left the rewrite expecting.
#[derive(Clone, Copy, PartialEq)]
enum Prev {
    Start,
    Open,
    Comma,
    /// An `ap` marker, still waiting for its operands.
    Apply,
    Operand,
}

/// Rewrite the tokens of one expression into a flat prefix stream.
pub fn desugar(tokens: &[Token]) -> Result<Vec<FlatTerm>, SugarError> {
    let implied = has_top_level_comma(tokens);
    let mut out = Vec::with_capacity(tokens.len() + 4);
    let mut open: Vec<Span> = Vec::new();
    let mut prev = Prev::Start;

    if implied {
        push_cons(&mut out);
    }

    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        prev = match &token.kind {
            TokenKind::LParen => {
                if iter.next_if(|t| t.kind == TokenKind::RParen).is_some() {
                    out.push(FlatTerm::Leaf(Term::nil()));
                    Prev::Operand
                } else {
                    open.push(token.span);
                    push_cons(&mut out);
                    Prev::Open
                }
            }
            TokenKind::Comma => {
                let next_is_empty = matches!(
                    iter.peek().map(|t| &t.kind),
                    None | Some(TokenKind::RParen) | Some(TokenKind::Comma)
                );
                if prev != Prev::Operand || next_is_empty {
                    return Err(SugarError::MisplacedComma { span: token.span });
                }
                push_cons(&mut out);
                Prev::Comma
            }
            TokenKind::RParen => {
                if open.pop().is_none() {
                    return Err(SugarError::Unopened { span: token.span });
                }
                out.push(FlatTerm::Leaf(Term::nil()));
                Prev::Operand
            }
            TokenKind::Ap => {
                out.push(FlatTerm::Apply);
                Prev::Apply
            }
            kind => {
                let leaf = leaf(kind).ok_or_else(|| SugarError::Unexpected {
                    token: kind.clone(),
                    span: token.span,
                })?;
                out.push(FlatTerm::Leaf(leaf));
                Prev::Operand
            }
        };
    }

    if let Some(span) = open.pop() {
        return Err(SugarError::Unclosed { span });
    }
    if implied {
        out.push(FlatTerm::Leaf(Term::nil()));
    }
    Ok(out)
}

fn push_cons(out: &mut Vec<FlatTerm>) {
    out.push(FlatTerm::Apply);
    out.push(FlatTerm::Apply);
    out.push(FlatTerm::Leaf(Term::combinator(Combinator::Cons)));
}

fn has_top_level_comma(tokens: &[Token]) -> bool {
    let mut depth = 0i32;
    for token in tokens {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            TokenKind::Comma if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

fn leaf(kind: &TokenKind) -> Option<TermRef> {
    match kind {
        TokenKind::Combinator(op) => Some(Term::combinator(*op)),
        TokenKind::Nil => Some(Term::nil()),
        TokenKind::Integer(n) => Some(Term::int(*n)),
        TokenKind::Variable(id) => Some(Term::var(*id)),
        TokenKind::Signal(bits) => Some(Term::signal(bits.as_str())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_lexer::Lexer;
    use galaxy_types::SourceFile;

    fn tokens(source: &str) -> Vec<Token> {
        let sf = SourceFile::new("t.txt", source);
        let mut tokens = Lexer::new(&sf).lex().tokens;
        tokens.retain(|t| t.kind != TokenKind::Eof);
        tokens
    }

    fn rewrite(source: &str) -> String {
        let flat = desugar(&tokens(source)).unwrap();
        flat.iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_plain_expression_unchanged() {
        assert_eq!(rewrite("ap ap add 1 2"), "ap ap add 1 2");
    }

    #[test]
    fn test_list_literal() {
        assert_eq!(
            rewrite("(1, 2, 3)"),
            "ap ap cons 1 ap ap cons 2 ap ap cons 3 nil"
        );
    }

    #[test]
    fn test_empty_and_singleton() {
        assert_eq!(rewrite("()"), "nil");
        assert_eq!(rewrite("(7)"), "ap ap cons 7 nil");
    }

    #[test]
    fn test_nested_lists() {
        assert_eq!(
            rewrite("((), (1))"),
            "ap ap cons nil ap ap cons ap ap cons 1 nil nil"
        );
    }

    #[test]
    fn test_elements_are_expressions() {
        assert_eq!(
            rewrite("(ap inc 1, :5)"),
            "ap ap cons ap inc 1 ap ap cons :5 nil"
        );
    }

    #[test]
    fn test_top_level_comma_implies_list() {
        assert_eq!(rewrite("1, 2"), rewrite("(1, 2)"));
        assert_eq!(
            rewrite("(1, 2), 3"),
            "ap ap cons ap ap cons 1 ap ap cons 2 nil ap ap cons 3 nil"
        );
    }

    #[test]
    fn test_misplaced_commas() {
        for src in ["(, 1)", "(1, )", "(1,, 2)", ", 1", "1 ,"] {
            let err = desugar(&tokens(src)).unwrap_err();
            assert_eq!(err.code(), ErrorCode::MISPLACED_COMMA, "{src}");
        }
    }

    #[test]
    fn test_comma_after_ap_is_reported_at_the_comma() {
        let err = desugar(&tokens("(ap, 1)")).unwrap_err();
        assert_eq!(err, SugarError::MisplacedComma { span: Span::point(1, 4) });
        let err = desugar(&tokens("(1, ap ap, 2)")).unwrap_err();
        assert_eq!(err, SugarError::MisplacedComma { span: Span::point(1, 10) });
    }

    #[test]
    fn test_unbalanced() {
        let err = desugar(&tokens("(1, (2)")).unwrap_err();
        assert_eq!(err, SugarError::Unclosed { span: Span::point(1, 1) });
        let err = desugar(&tokens("1)")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UNBALANCED_LIST);
    }

    #[test]
    fn test_assign_inside_expression() {
        let err = desugar(&tokens("ap inc = 1")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MISPLACED_ASSIGNMENT);
    }
}
