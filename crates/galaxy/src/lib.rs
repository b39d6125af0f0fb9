//! Galaxy runner: orchestrates the full pipeline.
//!
//! ```text
//! source → Lexer → Parser (desugar, link) → Session (reduce, draw, send) → report
//! ```
//!
//! Scripts are compiled into a [`Script`], loaded into a [`Session`], and
//! either evaluated expression by expression ([`run`]) or used as the
//! protocol of an interaction driven by a list of events ([`interact`]).

pub mod config;
pub mod http;

pub use config::RunnerConfig;
pub use http::HttpTransport;

use galaxy_eval::{EvalError, Session};
use galaxy_lexer::Lexer;
use galaxy_parser::Parser;
use galaxy_types::{
    CompileErrors, ErrorCode, GalaxyError, Picture, Script, SourceFile, Span, StatementKind,
    TermRef,
};
use log::info;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Compile(#[from] CompileErrors),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Result of [`run`], serialized as the `eval` command's output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// SHA-256 of the script text, hex encoded.
    pub source_hash: String,
    /// Canonical text of each bare expression's value, in source order.
    /// Values are in WHNF unless the session normalizes results.
    pub results: Vec<String>,
    /// Everything drawn during the run.
    pub picture: Picture,
    pub steps: u64,
    pub rounds: u64,
}

/// Result of [`interact`], serialized as the `interact` command's output.
#[derive(Debug, Clone, Serialize)]
pub struct InteractReport {
    pub source_hash: String,
    /// Canonical text of the state after the last event.
    pub state: String,
    /// The picture each event ended with.
    pub pictures: Vec<Picture>,
    pub steps: u64,
    pub rounds: u64,
}

/// Lex and parse `source`. Lexing errors stop the pipeline before parsing.
pub fn compile(source: &str, name: &str) -> Result<Script, CompileErrors> {
    let source_file = SourceFile::new(name, source);

    let lex_result = Lexer::new(&source_file).lex();
    if lex_result.errors.has_errors() {
        return Err(lex_result.errors);
    }

    let parse_result = Parser::new(lex_result.tokens, &source_file).parse();
    if parse_result.errors.has_errors() {
        return Err(parse_result.errors);
    }
    parse_result.script.ok_or(parse_result.errors)
}

/// Compile `source` as a single bare expression.
pub fn parse_term(source: &str, name: &str) -> Result<TermRef, CompileErrors> {
    let script = compile(source, name)?;
    if let [statement] = script.statements.as_slice() {
        if let StatementKind::Expression(term) = &statement.kind {
            return Ok(term.clone());
        }
    }

    let mut errors = CompileErrors::empty();
    errors.push_error(GalaxyError::new(
        name,
        ErrorCode::MALFORMED_PROGRAM,
        format!(
            "expected a single expression, found {} statements",
            script.statements.len()
        ),
        script
            .statements
            .first()
            .map_or(Span::point(1, 1), |s| s.span),
        source.lines().next().unwrap_or(""),
    ));
    Err(errors)
}

pub fn source_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A session configured from `config`: HTTP transport, result depth and
/// step limit.
pub fn session(config: &RunnerConfig) -> Session {
    let transport = HttpTransport::new(config);
    info!("transport {}", transport.url());
    let session = Session::new()
        .with_transport(transport)
        .with_normalized_results(config.normalize_results);
    match config.step_limit {
        Some(limit) => session.with_step_limit(limit),
        None => session,
    }
}

/// Compile `source`, load its bindings and evaluate each bare expression.
pub fn run(source: &str, name: &str, session: &mut Session) -> Result<RunReport, RunError> {
    let script = compile(source, name)?;
    let values = session.run(&script)?;
    info!(
        "{name}: {} results, {} steps",
        values.len(),
        session.steps()
    );

    Ok(RunReport {
        source_hash: source_hash(source),
        results: values.iter().map(|v| v.to_string()).collect(),
        picture: session.take_picture(),
        steps: session.steps(),
        rounds: session.rounds(),
    })
}

/// Compile `source`, load its bindings, and run one interaction per event,
/// threading the state from each round into the next.
///
/// `protocol`, `state` and each event are galaxy expressions, typically
/// `galaxy`, `nil` and `ap ap vec x y`.
pub fn interact(
    source: &str,
    name: &str,
    session: &mut Session,
    protocol: &str,
    state: &str,
    events: &[String],
) -> Result<InteractReport, RunError> {
    let script = compile(source, name)?;
    session.load(&script)?;

    let protocol = parse_term(protocol, "<protocol>")?;
    let mut state = parse_term(state, "<state>")?;
    let mut pictures = Vec::with_capacity(events.len());

    for (i, event) in events.iter().enumerate() {
        let event = parse_term(event, &format!("<event {}>", i + 1))?;
        let outcome = session.interact(protocol.clone(), state, event)?;
        info!(
            "event {}: {} points, {} rounds so far",
            i + 1,
            outcome.picture.points().count(),
            session.rounds()
        );
        state = outcome.state;
        pictures.push(outcome.picture);
    }

    Ok(InteractReport {
        source_hash: source_hash(source),
        state: state.to_string(),
        pictures,
        steps: session.steps(),
        rounds: session.rounds(),
    })
}
