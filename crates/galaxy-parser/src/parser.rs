//! Statement parser: token cursor, error reporting, statement assembly.

use std::collections::BTreeMap;

use galaxy_lexer::token::{Token, TokenKind};
use galaxy_types::{
    CompileErrors, ErrorCode, GalaxyError, Script, SourceFile, Span, Statement, StatementKind,
    TermRef, VarId,
};

use crate::{desugar, link};

/// The galaxy parser.
///
/// Consumes a token stream produced by the lexer, one line at a time, and
/// links every statement into a term graph. Errors are collected and the
/// parser resumes at the next line.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source_file: &'src SourceFile,
    errors: CompileErrors,
    /// Line of the first assignment to each variable.
    defined: BTreeMap<VarId, u32>,
}

/// Result of parsing. `script` is `None` when any error was reported.
pub struct ParseResult {
    pub script: Option<Script>,
    pub errors: CompileErrors,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: CompileErrors::empty(),
            defined: BTreeMap::new(),
        }
    }

    /// Parse every line of the token stream.
    pub fn parse(mut self) -> ParseResult {
        let mut statements = Vec::new();

        self.skip_newlines();
        while !self.at_end() && !self.errors.is_full() {
            let line = self.take_line();
            if let Some(stmt) = self.parse_statement(&line) {
                statements.push(stmt);
            }
            self.skip_newlines();
        }

        let script = (!self.errors.has_errors()).then_some(Script { statements });
        ParseResult {
            script,
            errors: self.errors,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    fn peek_kind(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline) {
            self.pos += 1;
        }
    }

    /// Consume the tokens up to (not including) the next newline.
    fn take_line(&mut self) -> Vec<Token> {
        let start = self.pos;
        while !matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof) {
            self.pos += 1;
        }
        self.tokens[start..self.pos].to_vec()
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    fn error(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> GalaxyError {
        let source_line = self.source_file.line(span.line).unwrap_or("");
        GalaxyError::new(&self.source_file.name, code, message, span, source_line)
    }

    fn report(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let err = self.error(code, message, span);
        self.errors.push_error(err);
    }

    // ── Statements ────────────────────────────────────────────────────────────

    /// Parse one non-empty line.
    ///
    /// ```text
    /// statement  := target '=' expression | expression
    /// target     := ':' N | 'galaxy'
    /// ```
    fn parse_statement(&mut self, line: &[Token]) -> Option<Statement> {
        let first = line.first()?;
        let last = line.last()?;
        let span = first.span.merge(last.span);

        let assigns = line
            .iter()
            .position(|t| t.kind == TokenKind::Assign);
        let Some(eq) = assigns else {
            let term = self.parse_expression(line, span)?;
            return Some(Statement {
                kind: StatementKind::Expression(term),
                span,
            });
        };

        let target = match (eq, &first.kind) {
            (1, TokenKind::Variable(id)) => *id,
            _ => {
                let at = line[eq].span;
                self.report(
                    ErrorCode::MISPLACED_ASSIGNMENT,
                    "'=' must follow a single variable at the start of the line",
                    at,
                );
                return None;
            }
        };

        let body = &line[eq + 1..];
        if body.is_empty() {
            self.report(
                ErrorCode::EMPTY_EXPRESSION,
                format!("nothing is assigned to {target}"),
                line[eq].span,
            );
            return None;
        }
        let body_span = body[0].span.merge(last.span);
        let term = self.parse_expression(body, body_span)?;

        if let Some(&first_line) = self.defined.get(&target) {
            let err = self
                .error(
                    ErrorCode::VARIABLE_REDEFINED,
                    format!("{target} is already defined"),
                    first.span,
                )
                .with_suggestion(format!(
                    "variables are assigned once; {target} was first defined on line {first_line}"
                ));
            self.errors.push_error(err);
            return None;
        }
        self.defined.insert(target, first.span.line);

        Some(Statement {
            kind: StatementKind::Assignment { target, term },
            span,
        })
    }

    fn parse_expression(&mut self, tokens: &[Token], span: Span) -> Option<TermRef> {
        let flat = match desugar(tokens) {
            Ok(flat) => flat,
            Err(err) => {
                self.report(err.code(), err.to_string(), err.span());
                return None;
            }
        };
        match link(&flat) {
            Ok(term) => Some(term),
            Err(err) => {
                self.report(ErrorCode::MALFORMED_PROGRAM, err.to_string(), span);
                None
            }
        }
    }
}
