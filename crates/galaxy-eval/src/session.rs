//! Session: one evaluation context driven from the outside.
//!
//! Owns an [`Evaluator`] and its environment, loads script bindings, and
//! exposes the two entry points a host needs: evaluate a term, or run one
//! interaction round from an event.

use galaxy_types::{Combinator, Picture, Script, Term, TermRef};

use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::transport::Transport;

/// What one call of [`Session::interact`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionOutcome {
    /// State to pass to the next round.
    pub state: TermRef,
    /// The picture shown when the protocol stopped.
    pub picture: Picture,
}

#[derive(Debug)]
pub struct Session {
    evaluator: Evaluator,
    /// Report bare expressions fully normalized instead of in WHNF.
    normalize_results: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session with no transport and no step limit.
    pub fn new() -> Self {
        Self {
            evaluator: Evaluator::new(Environment::new()),
            normalize_results: false,
        }
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.evaluator.env.set_transport(transport);
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.evaluator.set_step_limit(Some(limit));
        self
    }

    /// Force every pair component of a reported result, not just its head.
    pub fn with_normalized_results(mut self, enabled: bool) -> Self {
        self.normalize_results = enabled;
        self
    }

    /// Define every assignment of `script`, in source order.
    pub fn load(&mut self, script: &Script) -> EvalResult<()> {
        for (target, term) in script.assignments() {
            self.evaluator.env.define(target, term.clone())?;
        }
        Ok(())
    }

    /// Load the bindings, then reduce each bare expression in order.
    ///
    /// Results are in WHNF: a pair's components stay unevaluated unless
    /// [`Session::with_normalized_results`] is on. Bindings are visible to
    /// every expression regardless of where they appear in the script.
    pub fn run(&mut self, script: &Script) -> EvalResult<Vec<TermRef>> {
        self.load(script)?;
        script
            .expressions()
            .map(|term| self.report(term.clone()))
            .collect()
    }

    fn report(&mut self, term: TermRef) -> EvalResult<TermRef> {
        if self.normalize_results {
            self.evaluator.normalize(term)
        } else {
            self.evaluator.reduce_to_whnf(term)
        }
    }

    /// Reduce `term` to WHNF.
    pub fn evaluate(&mut self, term: TermRef) -> EvalResult<TermRef> {
        self.evaluator.reduce_to_whnf(term)
    }

    /// Reduce `term` and every pair component below it.
    pub fn normalize(&mut self, term: TermRef) -> EvalResult<TermRef> {
        self.evaluator.normalize(term)
    }

    /// Run `interact protocol state event` until the protocol stops.
    pub fn interact(
        &mut self,
        protocol: TermRef,
        state: TermRef,
        event: TermRef,
    ) -> EvalResult<InteractionOutcome> {
        let call = Term::apply(
            Term::apply(
                Term::apply(Term::combinator(Combinator::Interact), protocol),
                state,
            ),
            event,
        );
        let result = self.evaluator.normalize(call)?;

        let outcome = match &*result {
            Term::Pair(state, rest) => match &**rest {
                Term::Pair(picture, tail) if tail.is_nil() => match &**picture {
                    Term::Picture(picture) => Some(InteractionOutcome {
                        state: state.clone(),
                        picture: picture.clone(),
                    }),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        };
        outcome.ok_or_else(|| EvalError::mismatch("(state, picture)", &result))
    }

    /// Everything drawn since the last [`Session::take_picture`].
    pub fn picture(&self) -> &Picture {
        self.evaluator.env.picture()
    }

    pub fn take_picture(&mut self) -> Picture {
        self.evaluator.env.take_picture()
    }

    pub fn steps(&self) -> u64 {
        self.evaluator.steps()
    }

    pub fn rounds(&self) -> u64 {
        self.evaluator.rounds()
    }

    pub fn evaluator_mut(&mut self) -> &mut Evaluator {
        &mut self.evaluator
    }
}
