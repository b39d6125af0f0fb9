//! Core galaxy lexer: converts script text to a token stream.
//!
//! Features:
//! - Words are separated by whitespace and the punctuation `( , ) =`
//! - `#` comments run to the end of the line
//! - Signed decimal integers, checked against the `i64` range
//! - `:N` variable references and the reserved `galaxy` entry point
//! - Quoted bit strings (`"0110"`)
//! - Error recovery: collects up to 20 errors instead of stopping at the first
//! - Newlines are tokens, since every statement occupies one line

use galaxy_types::{CompileErrors, ErrorCode, GalaxyError, SourceFile, Span, VarId};

use crate::token::{Token, TokenKind};

/// The galaxy lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`galaxy_types::MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    source: &'src [u8],
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, counted in characters).
    col: u32,
    errors: CompileErrors,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        while !self.errors.is_full() {
            let Some(token) = self.scan_token() else {
                continue;
            };
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if !is_continuation_byte(ch) {
            self.col += 1;
        }
        Some(ch)
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_col: u32) -> Span {
        Span::new(self.line, start_col, self.col.saturating_sub(1).max(start_col))
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.line).unwrap_or("");
        let err = GalaxyError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_file.line(span.line).unwrap_or("");
        let err = GalaxyError::new(&self.source_file.name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip spaces, tabs and a `#` comment (NOT newlines, those are tokens).
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                b' ' | b'\t' | b'\r' => {
                    self.advance();
                }
                b'#' => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Main dispatch
    // ─────────────────────────────────────────────────────────────

    /// Scan one token. Returns `None` when the input was rejected and
    /// skipped.
    fn scan_token(&mut self) -> Option<Token> {
        self.skip_trivia();

        let start = self.pos;
        let start_col = self.col;
        let Some(ch) = self.peek() else {
            return Some(Token::new(TokenKind::Eof, self.current_span()));
        };

        let punct = match ch {
            b'\n' => Some(TokenKind::Newline),
            b'(' => Some(TokenKind::LParen),
            b',' => Some(TokenKind::Comma),
            b')' => Some(TokenKind::RParen),
            b'=' => Some(TokenKind::Assign),
            _ => None,
        };
        if let Some(kind) = punct {
            let span = Span::point(self.line, start_col);
            self.advance();
            return Some(Token::new(kind, span));
        }

        if ch == b'"' {
            self.advance();
            return Some(self.scan_signal(start_col));
        }

        if is_word_byte(ch) {
            return self.scan_word(start, start_col);
        }

        // Anything else is a control character or non-ASCII text.
        self.advance();
        while self.peek().is_some_and(is_continuation_byte) {
            self.advance();
        }
        let span = self.span_from(start_col);
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        self.emit_error(
            ErrorCode::UNEXPECTED_CHARACTER,
            format!("unexpected character {text:?}"),
            span,
        );
        None
    }

    // ─────────────────────────────────────────────────────────────
    // Words: keywords, combinators, integers, variables
    // ─────────────────────────────────────────────────────────────

    fn scan_word(&mut self, start: usize, start_col: u32) -> Option<Token> {
        while self.peek().is_some_and(is_word_byte) {
            self.advance();
        }
        let span = self.span_from(start_col);
        let source = self.source;
        // Word bytes are ASCII graphic characters.
        let word = std::str::from_utf8(&source[start..self.pos]).unwrap_or_default();

        if let Some(digits) = word.strip_prefix(':') {
            return self.scan_variable(word, digits, span);
        }

        if looks_numeric(word) {
            return match word.parse::<i64>() {
                Ok(value) => Some(Token::new(TokenKind::Integer(value), span)),
                Err(_) => {
                    self.emit_error(
                        ErrorCode::INVALID_INTEGER,
                        format!("'{word}' is not a 64-bit integer"),
                        span,
                    );
                    None
                }
            };
        }

        if let Some(kind) = TokenKind::from_word(word) {
            return Some(Token::new(kind, span));
        }

        let lowered = word.to_ascii_lowercase();
        match TokenKind::from_word(&lowered) {
            Some(_) => self.emit_error_with_suggestion(
                ErrorCode::UNKNOWN_IDENTIFIER,
                format!("unknown identifier '{word}'"),
                span,
                format!("names are case-sensitive; did you mean '{lowered}'?"),
            ),
            None => self.emit_error(
                ErrorCode::UNKNOWN_IDENTIFIER,
                format!("unknown identifier '{word}'"),
                span,
            ),
        }
        None
    }

    fn scan_variable(&mut self, word: &str, digits: &str, span: Span) -> Option<Token> {
        let index = if digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse::<u32>().ok()
        } else {
            None
        };
        match index {
            Some(index) if VarId(index) != VarId::GALAXY => {
                Some(Token::new(TokenKind::Variable(VarId(index)), span))
            }
            Some(_) => {
                self.emit_error_with_suggestion(
                    ErrorCode::INVALID_VARIABLE,
                    format!("variable '{word}' is reserved"),
                    span,
                    "use `galaxy` to refer to the entry point",
                );
                None
            }
            None => {
                self.emit_error(
                    ErrorCode::INVALID_VARIABLE,
                    format!("'{word}' is not a variable reference; expected ':' followed by digits"),
                    span,
                );
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Bit strings
    // ─────────────────────────────────────────────────────────────

    /// Scan a bit string starting after the opening `"`.
    fn scan_signal(&mut self, start_col: u32) -> Token {
        let mut bits = String::new();
        let mut bad: Option<Span> = None;

        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(start_col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED_SIGNAL,
                        "unterminated bit string",
                        span,
                        "close the bit string with '\"' on the same line",
                    );
                    return Token::new(TokenKind::Signal(bits), span);
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(ch @ (b'0' | b'1')) => {
                    self.advance();
                    bits.push(ch as char);
                }
                Some(_) => {
                    let col = self.col;
                    self.advance();
                    while self.peek().is_some_and(is_continuation_byte) {
                        self.advance();
                    }
                    bad.get_or_insert(Span::point(self.line, col));
                }
            }
        }

        let span = self.span_from(start_col);
        if let Some(at) = bad {
            self.emit_error(
                ErrorCode::INVALID_SIGNAL,
                "bit strings may only contain '0' and '1'",
                at,
            );
        } else if bits.is_empty() {
            self.emit_error(ErrorCode::INVALID_SIGNAL, "empty bit string", span);
        }
        Token::new(TokenKind::Signal(bits), span)
    }
}

fn is_continuation_byte(b: u8) -> bool {
    b & 0xC0 == 0x80
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_graphic() && !matches!(b, b'(' | b')' | b',' | b'=' | b'"' | b'#')
}

fn looks_numeric(word: &str) -> bool {
    let unsigned = word
        .strip_prefix('-')
        .or_else(|| word.strip_prefix('+'))
        .unwrap_or(word);
    unsigned.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> LexResult {
        let sf = SourceFile::new("test.txt", source);
        Lexer::new(&sf).lex()
    }

    #[test]
    fn test_spans_are_character_columns() {
        let result = lex(":1 = ap inc 7");
        let spans: Vec<Span> = result.tokens.iter().map(|t| t.span).collect();
        assert_eq!(spans[0], Span::new(1, 1, 2));
        assert_eq!(spans[1], Span::new(1, 4, 4));
        assert_eq!(spans[2], Span::new(1, 6, 7));
        assert_eq!(spans[3], Span::new(1, 9, 11));
        assert_eq!(spans[4], Span::new(1, 13, 13));
    }

    #[test]
    fn test_non_ascii_counts_one_column() {
        let result = lex("é 1");
        assert_eq!(result.errors.total_errors, 1);
        assert_eq!(result.errors.errors[0].span, Span::new(1, 1, 1));
        assert_eq!(result.tokens[0].span, Span::new(1, 3, 3));
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("12"));
        assert!(looks_numeric("-3"));
        assert!(looks_numeric("+3"));
        assert!(looks_numeric("4x"));
        assert!(!looks_numeric("-"));
        assert!(!looks_numeric("x4"));
    }
}
