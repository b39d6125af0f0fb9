//! Weak head normal form reduction.
//!
//! [`Evaluator::reduce_to_whnf`] is a spine-unwinding machine with an
//! explicit frame stack. Walking down an application pushes its argument;
//! once the head is a value, the top frame decides what happens next:
//! an argument frame fires a rewrite rule, an update frame records the value
//! as the WHNF of a shared node, and a force frame hands the value to a
//! strict primitive that was waiting for its operands. No rule recurses on
//! the host stack to evaluate an operand, so nesting depth and the number of
//! interaction rounds are bounded by the heap.
//!
//! Primitives that need whole data structures (`draw`, `mod`, `send`, the
//! interaction step) call [`Evaluator::normalize`], which runs a fresh
//! reduction for each component it visits.

use std::rc::Rc;

use galaxy_types::{Combinator, Picture, Point, Term, TermRef, VarId};
use log::{debug, trace};

use crate::codec::{demodulate, modulate};
use crate::env::Environment;
use crate::error::{EvalError, EvalResult};

/// Largest exponent accepted by `pwr2`.
const MAX_PWR2_EXPONENT: i64 = 62;

/// The reduction engine and its counters.
pub struct Evaluator {
    pub env: Environment,
    /// Rewrites performed so far.
    steps: u64,
    /// Interaction rounds completed so far.
    rounds: u64,
    step_limit: Option<u64>,
}

enum Frame {
    /// Apply the value being computed to this argument.
    Arg(TermRef),
    /// Record the value being computed as the WHNF of this shared node.
    Update(TermRef),
    /// A strict primitive collecting its operand values.
    Force(Pending),
}

/// A saturated strict primitive. The first `strict` arguments are reduced
/// to values, in order, before the rule runs.
struct Pending {
    op: Combinator,
    args: Vec<TermRef>,
    strict: usize,
    values: Vec<TermRef>,
}

impl Pending {
    fn new(op: Combinator, args: Vec<TermRef>, strict: usize) -> Self {
        Self {
            op,
            args,
            strict,
            values: Vec::with_capacity(strict),
        }
    }

    fn next_operand(&self) -> Option<TermRef> {
        let next = self.values.len();
        if next < self.strict {
            self.args.get(next).cloned()
        } else {
            None
        }
    }
}

enum Rewrite {
    Term(TermRef),
    Force(Pending),
}

enum Unwind {
    Apply {
        memo: Option<TermRef>,
        function: TermRef,
        argument: TermRef,
    },
    Var(VarId),
    Value,
}

impl Evaluator {
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            steps: 0,
            rounds: 0,
            step_limit: None,
        }
    }

    /// Fail with [`EvalError::StepLimitExceeded`] after `limit` rewrites.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn set_step_limit(&mut self, limit: Option<u64>) {
        self.step_limit = limit;
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Consume one step. Returns error if the limit is reached.
    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => Err(EvalError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Reduction loop
    // ══════════════════════════════════════════════════════════════════════

    /// Reduce `term` until its head can no longer be rewritten.
    pub fn reduce_to_whnf(&mut self, term: TermRef) -> EvalResult<TermRef> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut current = term;

        loop {
            let unwind = match &*current {
                Term::Apply(app) => Unwind::Apply {
                    memo: app.whnf().cloned(),
                    function: app.function.clone(),
                    argument: app.argument.clone(),
                },
                Term::Var(id) => Unwind::Var(*id),
                _ => Unwind::Value,
            };

            match unwind {
                Unwind::Apply {
                    memo: Some(value), ..
                } => {
                    current = value;
                    continue;
                }
                Unwind::Apply {
                    memo: None,
                    function,
                    argument,
                } => {
                    // A node nobody else holds cannot be observed again.
                    if Rc::strong_count(&current) > 1 {
                        stack.push(Frame::Update(current));
                    }
                    stack.push(Frame::Arg(argument));
                    current = function;
                    continue;
                }
                Unwind::Var(id) => {
                    self.tick()?;
                    current = self.env.get(id)?;
                    continue;
                }
                Unwind::Value => {}
            }

            let next = match stack.pop() {
                None => return Ok(current),
                Some(Frame::Update(node)) => {
                    if let Term::Apply(app) = &*node {
                        app.memoize(current.clone());
                    }
                    continue;
                }
                Some(Frame::Arg(argument)) => {
                    self.tick()?;
                    self.apply(current, argument)?
                }
                Some(Frame::Force(mut pending)) => {
                    pending.values.push(current);
                    Rewrite::Force(pending)
                }
            };

            current = match next {
                Rewrite::Term(term) => term,
                Rewrite::Force(pending) => match pending.next_operand() {
                    Some(operand) => {
                        stack.push(Frame::Force(pending));
                        operand
                    }
                    None => self.finish(pending)?,
                },
            };
        }
    }

    /// Reduce `term` and every pair component below it.
    ///
    /// Components that are not pairs are left in WHNF. Pairs whose
    /// components were already values are reused rather than rebuilt.
    pub fn normalize(&mut self, term: TermRef) -> EvalResult<TermRef> {
        enum Task {
            Visit(TermRef),
            Build(TermRef),
        }

        let mut tasks = vec![Task::Visit(term)];
        let mut values: Vec<TermRef> = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(term) => {
                    let value = self.reduce_to_whnf(term)?;
                    if let Term::Pair(car, cdr) = &*value {
                        let (car, cdr) = (car.clone(), cdr.clone());
                        tasks.push(Task::Build(value));
                        tasks.push(Task::Visit(cdr));
                        tasks.push(Task::Visit(car));
                    } else {
                        values.push(value);
                    }
                }
                Task::Build(original) => {
                    let (Some(cdr), Some(car)) = (values.pop(), values.pop()) else {
                        return Err(EvalError::mismatch("pair", &original));
                    };
                    let unchanged = match &*original {
                        Term::Pair(a, b) => Rc::ptr_eq(a, &car) && Rc::ptr_eq(b, &cdr),
                        _ => false,
                    };
                    values.push(if unchanged {
                        original
                    } else {
                        Term::pair(car, cdr)
                    });
                }
            }
        }

        values
            .pop()
            .ok_or_else(|| EvalError::mismatch("value", &Term::Nil))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Rewrite rules
    // ══════════════════════════════════════════════════════════════════════

    /// Apply a value in WHNF to an argument.
    fn apply(&mut self, function: TermRef, argument: TermRef) -> EvalResult<Rewrite> {
        match &*function {
            Term::Combinator(op, captured) => {
                let arity = op.arity();
                if captured.len() + 1 < arity {
                    return Ok(Rewrite::Term(Term::apply(function.clone(), argument)));
                }
                if captured.len() + 1 > arity {
                    return Err(EvalError::Overapplied {
                        op: *op,
                        arity,
                        found: captured.len(),
                    });
                }
                let mut args = captured.clone();
                args.push(argument);
                self.fire(*op, args)
            }
            // cons a b g → g a b
            Term::Pair(car, cdr) => Ok(Rewrite::Term(Term::apply(
                Term::apply(argument, car.clone()),
                cdr.clone(),
            ))),
            Term::Nil => Ok(Rewrite::Term(Term::boolean(true))),
            other => Err(EvalError::mismatch("function", other)),
        }
    }

    /// Run the rule of a saturated combinator.
    fn fire(&mut self, op: Combinator, args: Vec<TermRef>) -> EvalResult<Rewrite> {
        use Combinator::*;
        trace!("fire {op}");

        if let Some(strict) = strict_operands(op) {
            return Ok(Rewrite::Force(Pending::new(op, args, strict)));
        }

        let term = match (op, args.as_slice()) {
            (S, [x, y, z]) => Term::apply(
                Term::apply(x.clone(), z.clone()),
                Term::apply(y.clone(), z.clone()),
            ),
            (C, [x, y, z]) => Term::apply(Term::apply(x.clone(), z.clone()), y.clone()),
            (B, [x, y, z]) => Term::apply(x.clone(), Term::apply(y.clone(), z.clone())),
            (I, [x]) => x.clone(),
            (True, [a, _]) => a.clone(),
            (False, [_, b]) => b.clone(),
            (Cons, [a, b, g]) => Term::apply(Term::apply(g.clone(), a.clone()), b.clone()),
            (Car, [p]) => Term::apply(p.clone(), Term::boolean(true)),
            (Cdr, [p]) => Term::apply(p.clone(), Term::boolean(false)),
            (IsNil, [x]) => Term::apply(x.clone(), Term::combinator(NilProbe)),
            (NilProbe, [_, _]) => Term::boolean(false),

            (Draw, [points]) => {
                let points = self.normalize(points.clone())?;
                let picture = Picture::from_points(point_list(&points)?);
                self.env.draw(&picture);
                Term::picture(picture)
            }
            (MultipleDraw, [lists]) => Term::picture(self.multiple_draw(lists.clone())?),
            (Modulate, [x]) => {
                let value = self.normalize(x.clone())?;
                Term::signal(modulate(&value)?)
            }
            (Send, [x]) => self.send(x.clone())?,
            // interact p s e → interactstep p (p s e)
            (Interact, [protocol, state, event]) => Term::apply(
                Term::apply(Term::combinator(InteractStep), protocol.clone()),
                Term::apply(Term::apply(protocol.clone(), state.clone()), event.clone()),
            ),
            (InteractStep, [protocol, result]) => {
                self.interaction_step(protocol.clone(), result.clone())?
            }

            _ => {
                return Err(EvalError::Overapplied {
                    op,
                    arity: op.arity(),
                    found: args.len(),
                })
            }
        };
        Ok(Rewrite::Term(term))
    }

    /// Complete a strict primitive once its operands are values.
    fn finish(&mut self, pending: Pending) -> EvalResult<TermRef> {
        use Combinator::*;
        let Pending {
            op, args, values, ..
        } = pending;

        match (op, values.as_slice(), args.as_slice()) {
            (Inc, [x], _) => {
                let x = expect_int(x)?;
                arith(x.checked_add(1), || format!("inc {x} overflows"))
            }
            (Dec, [x], _) => {
                let x = expect_int(x)?;
                arith(x.checked_sub(1), || format!("dec {x} overflows"))
            }
            (Neg, [x], _) => {
                let x = expect_int(x)?;
                arith(x.checked_neg(), || format!("neg {x} overflows"))
            }
            (Pwr2, [x], _) => {
                let x = expect_int(x)?;
                if (0..=MAX_PWR2_EXPONENT).contains(&x) {
                    Ok(Term::int(1i64 << x))
                } else {
                    Err(EvalError::ArithmeticTrap(format!(
                        "pwr2 exponent {x} is outside 0..={MAX_PWR2_EXPONENT}"
                    )))
                }
            }
            (Add, [a, b], _) => {
                let (a, b) = (expect_int(a)?, expect_int(b)?);
                arith(a.checked_add(b), || format!("{a} + {b} overflows"))
            }
            (Mul, [a, b], _) => {
                let (a, b) = (expect_int(a)?, expect_int(b)?);
                arith(a.checked_mul(b), || format!("{a} * {b} overflows"))
            }
            (Div, [a, b], _) => {
                let (a, b) = (expect_int(a)?, expect_int(b)?);
                if b == 0 {
                    return Err(EvalError::ArithmeticTrap(format!("{a} / 0")));
                }
                // checked_div truncates toward zero
                arith(a.checked_div(b), || format!("{a} / {b} overflows"))
            }
            (Eq, [a, b], _) => Ok(Term::boolean(expect_int(a)? == expect_int(b)?)),
            (Lt, [a, b], _) => Ok(Term::boolean(expect_int(a)? < expect_int(b)?)),
            (If0, [c], [_, then, otherwise]) => Ok(if expect_int(c)? == 0 {
                then.clone()
            } else {
                otherwise.clone()
            }),
            (Checkerboard, [n], _) => Ok(checkerboard(expect_int(n)?)),
            (Demodulate, [signal], _) => match &**signal {
                Term::Signal(bits) => Ok(demodulate(bits)?),
                other => Err(EvalError::mismatch("bit string", other)),
            },
            _ => Err(EvalError::Overapplied {
                op,
                arity: op.arity(),
                found: args.len(),
            }),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Drawing, signals, interaction
    // ══════════════════════════════════════════════════════════════════════

    fn multiple_draw(&mut self, lists: TermRef) -> EvalResult<Picture> {
        let lists = self.normalize(lists)?;
        let mut picture = Picture::new();
        for list in list_items(&lists)? {
            picture.draw_points(point_list(list)?);
        }
        self.env.draw(&picture);
        Ok(picture)
    }

    /// Modulate `data`, send it, and demodulate the response.
    fn send(&mut self, data: TermRef) -> EvalResult<TermRef> {
        let data = self.normalize(data)?;
        let request = modulate(&data)?;
        let response = self.env.transmit(&request)?;
        Ok(demodulate(&response)?)
    }

    /// `interactstep protocol (flag, newState, data)`
    ///
    /// Flag 0 draws `data` and yields `(newState, picture)`. Any other flag
    /// sends `data` and continues with `interact protocol newState response`.
    /// `newState` must be plain data: it passes through modulation on the
    /// way.
    fn interaction_step(&mut self, protocol: TermRef, result: TermRef) -> EvalResult<TermRef> {
        self.rounds += 1;
        let result = self.normalize(result)?;
        let items = list_items(&result)?;
        let [flag, state, data] = items.as_slice() else {
            return Err(EvalError::mismatch("(flag, state, data)", &result));
        };

        let flag = expect_int(flag)?;
        let state = demodulate(&modulate(state)?)?;
        debug!("interaction round {}: flag {flag}", self.rounds);
        trace!("state {state}");

        if flag == 0 {
            let picture = self.multiple_draw(TermRef::clone(data))?;
            return Ok(Term::list([state, Term::picture(picture)]));
        }

        let response = self.send(TermRef::clone(data))?;
        Ok(Term::apply(
            Term::apply(
                Term::apply(Term::combinator(Combinator::Interact), protocol),
                state,
            ),
            response,
        ))
    }
}

/// Number of leading arguments a strict primitive needs as values.
fn strict_operands(op: Combinator) -> Option<usize> {
    use Combinator::*;
    match op {
        Inc | Dec | Neg | Pwr2 | If0 | Checkerboard | Demodulate => Some(1),
        Add | Mul | Div | Eq | Lt => Some(2),
        _ => None,
    }
}

fn arith(value: Option<i64>, trap: impl FnOnce() -> String) -> EvalResult<TermRef> {
    value
        .map(Term::int)
        .ok_or_else(|| EvalError::ArithmeticTrap(trap()))
}

fn expect_int(term: &Term) -> EvalResult<i64> {
    term.as_int()
        .ok_or_else(|| EvalError::mismatch("integer", term))
}

/// The elements of a normalized list.
fn list_items(list: &TermRef) -> EvalResult<Vec<&TermRef>> {
    let mut items = Vec::new();
    let mut cursor = list;
    loop {
        match &**cursor {
            Term::Nil => return Ok(items),
            Term::Pair(car, cdr) => {
                items.push(car);
                cursor = cdr;
            }
            _ => return Err(EvalError::mismatch("list", list)),
        }
    }
}

/// Points of a normalized list of `(x, y)` pairs.
fn point_list(list: &TermRef) -> EvalResult<Vec<Point>> {
    list_items(list)?
        .into_iter()
        .map(|item| match &**item {
            Term::Pair(x, y) => match (x.as_int(), y.as_int()) {
                (Some(x), Some(y)) => Ok(Point::new(x, y)),
                _ => Err(EvalError::mismatch("point", item)),
            },
            _ => Err(EvalError::mismatch("point", item)),
        })
        .collect()
}

/// Points `(x, y)` with `0 <= x, y < n` and `x + y` even, x-major.
fn checkerboard(n: i64) -> TermRef {
    let mut points = Vec::new();
    for x in 0..n.max(0) {
        for y in (x % 2..n).step_by(2) {
            points.push(Term::point(x, y));
        }
    }
    Term::list(points)
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("env", &self.env)
            .field("steps", &self.steps)
            .field("rounds", &self.rounds)
            .field("step_limit", &self.step_limit)
            .finish()
    }
}
