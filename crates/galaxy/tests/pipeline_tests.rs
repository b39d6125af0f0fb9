//! End-to-end pipeline tests.
//!
//! Tests verify the full pipeline: source → lex → parse → link → evaluate →
//! report, for plain scripts, interactions with a scripted transport, and
//! the error paths of each stage.

use galaxy::{compile, interact, parse_term, run, source_hash, RunError, RunnerConfig};
use galaxy_eval::{modulate, EvalError, Session, TransportError};
use galaxy_types::{ErrorCode, Term};

// ══════════════════════════════════════════════════════════════════════════════
// Sources
// ══════════════════════════════════════════════════════════════════════════════

const ARITHMETIC: &str = "\
# a few bindings and results
:1 = ap ap add 1 41
:2 = ap ap mul :1 2
ap ap add :2 0
ap ap div :2 -8
ap draw (ap ap vec 1 2, ap ap vec 3 4)
";

/// Always stops: `(0, s + 1, ((s, s)))`.
const COUNTER: &str = "\
# s -> ((s, s))
:1 = ap ap b ap ap c cons nil ap ap b ap ap c cons nil ap ap s vec i
# s -> (((s, s)))
:2 = ap ap b ap ap c cons nil :1
galaxy = ap ap b t ap ap b ap cons 0 ap ap s ap ap b cons inc :2
";

fn silent_session() -> Session {
    Session::new().with_transport(|_: &str| -> Result<String, TransportError> {
        Err(TransportError::Unavailable)
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// Compile
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn compile_counts_statements() {
    let script = compile(ARITHMETIC, "arith.txt").unwrap();
    assert_eq!(script.statements.len(), 5);
    assert_eq!(script.assignments().count(), 2);
}

#[test]
fn lex_errors_stop_before_parsing() {
    let errors = compile("ap frob 1\n(1", "bad.txt").unwrap_err();
    let codes: Vec<_> = errors.errors.iter().map(|e| e.code).collect();
    assert_eq!(codes, vec![ErrorCode::UNKNOWN_IDENTIFIER]);
    assert_eq!(errors.errors[0].file, "bad.txt");
}

#[test]
fn parse_errors_are_reported() {
    let errors = compile(":1 = ap inc", "bad.txt").unwrap_err();
    assert_eq!(errors.errors[0].code, ErrorCode::MALFORMED_PROGRAM);
}

#[test]
fn parse_term_accepts_one_expression() {
    assert_eq!(parse_term("ap ap vec 1 2", "<event>").unwrap(), Term::point(1, 2));
    assert_eq!(parse_term("galaxy", "<protocol>").unwrap().to_string(), "galaxy");
}

#[test]
fn parse_term_rejects_other_shapes() {
    for source in [":1 = 2", "1\n2", ""] {
        let errors = parse_term(source, "<state>").unwrap_err();
        assert_eq!(errors.errors[0].code, ErrorCode::MALFORMED_PROGRAM, "{source:?}");
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Run
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn run_reports_every_expression() {
    let mut session = silent_session();
    let report = run(ARITHMETIC, "arith.txt", &mut session).unwrap();
    assert_eq!(report.results[0], "84");
    assert_eq!(report.results[1], "-10");
    assert!(report.results[2].starts_with('{'));
    assert_eq!(report.picture.draw_count(), 1);
    assert!(report.steps > 0);
    assert_eq!(report.rounds, 0);
}

#[test]
fn run_report_json_shape() {
    let mut session = silent_session();
    let report = run(ARITHMETIC, "arith.txt", &mut session).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["source_hash"], source_hash(ARITHMETIC));
    assert_eq!(json["results"][0], "84");
    assert_eq!(json["picture"]["draws"][0][1]["x"], 3);
    assert_eq!(json["picture"]["draws"][0][1]["y"], 4);
    assert!(json["steps"].as_u64().unwrap() > 0);
}

#[test]
fn source_hash_is_sha256_hex() {
    let hash = source_hash("");
    assert_eq!(
        hash,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
    assert_ne!(source_hash(ARITHMETIC), hash);
}

#[test]
fn run_surfaces_compile_errors() {
    let mut session = silent_session();
    let err = run("ap inc", "bad.txt", &mut session).unwrap_err();
    assert!(matches!(err, RunError::Compile(_)));
    assert!(err.to_string().contains("E200"), "{err}");
}

#[test]
fn run_surfaces_eval_errors() {
    let mut session = silent_session();
    let err = run("ap ap div 1 0", "div.txt", &mut session).unwrap_err();
    assert!(matches!(err, RunError::Eval(EvalError::ArithmeticTrap(_))));

    let mut session = silent_session();
    let err = run("ap send 1", "send.txt", &mut session).unwrap_err();
    assert!(matches!(
        err,
        RunError::Eval(EvalError::Transport(TransportError::Unavailable))
    ));
}

#[test]
fn configured_session_applies_step_limit() {
    let config = RunnerConfig {
        step_limit: Some(1_000),
        ..RunnerConfig::default()
    };
    let mut session = galaxy::session(&config);
    let err = run("ap ap ap s i i ap ap s i i", "omega.txt", &mut session).unwrap_err();
    assert!(matches!(
        err,
        RunError::Eval(EvalError::StepLimitExceeded { limit: 1_000 })
    ));
}

#[test]
fn results_stop_at_whnf_unless_normalized() {
    let source = "ap ap cons ap inc 1 nil\n";

    let mut session = galaxy::session(&RunnerConfig::default());
    let report = run(source, "lazy.txt", &mut session).unwrap();
    assert_eq!(report.results, vec!["ap ap cons ap inc 1 nil"]);

    let config = RunnerConfig {
        normalize_results: true,
        ..RunnerConfig::default()
    };
    let mut session = galaxy::session(&config);
    let report = run(source, "lazy.txt", &mut session).unwrap();
    assert_eq!(report.results, vec!["ap ap cons 2 nil"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Interact
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn interact_threads_state_across_events() {
    let mut session = silent_session();
    let events: Vec<String> = vec!["ap ap vec 0 0".into(); 3];
    let report = interact(COUNTER, "counter.txt", &mut session, "galaxy", "0", &events).unwrap();

    assert_eq!(report.state, "3");
    assert_eq!(report.pictures.len(), 3);
    for (i, picture) in report.pictures.iter().enumerate() {
        let p = i as i64;
        assert!(picture.contains(galaxy_types::Point::new(p, p)), "event {i}");
    }
    assert_eq!(report.rounds, 3);
}

#[test]
fn interact_sends_through_the_session_transport() {
    // flag 1 once, then flag 0 with the server's answer as state
    let source = "\
:1 = ap ap s ap ap b cons car ap ap c cons ap ap cons nil nil
galaxy = ap t :1
";
    let answer = modulate(&Term::point(0, 5)).unwrap();
    let mut session = Session::new().with_transport(
        move |request: &str| -> Result<String, TransportError> {
            assert_eq!(request, "00");
            Ok(answer.clone())
        },
    );
    let events = vec!["ap ap vec 1 1".to_string()];
    let report = interact(source, "send.txt", &mut session, "galaxy", "nil", &events).unwrap();
    assert_eq!(report.state, "ap ap cons 0 5");
    assert_eq!(report.rounds, 2);
}

#[test]
fn interact_rejects_bad_event() {
    let mut session = silent_session();
    let events = vec!["ap ap vec 0".to_string()];
    let err = interact(COUNTER, "counter.txt", &mut session, "galaxy", "0", &events).unwrap_err();
    assert!(matches!(err, RunError::Compile(_)));
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn full_pipeline_determinism_100_iterations() {
    let render = || {
        let mut session = silent_session();
        let report = run(ARITHMETIC, "arith.txt", &mut session).unwrap();
        serde_json::to_string(&report).unwrap()
    };
    let first = render();
    for i in 0..100 {
        assert_eq!(render(), first, "iteration {i} differs");
    }
}
