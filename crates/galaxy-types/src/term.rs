//! The term graph reduced by the galaxy evaluator.
//!
//! Terms are immutable and shared through [`TermRef`]. Reduction never edits
//! a node; it builds new ones. The single exception is the write-once WHNF
//! cache on [`Application`], which only ever stores the value the node
//! reduces to and so cannot change what any observer sees.
//!
//! `Display` prints the canonical galaxy text (`ap ap add 1 2`), which the
//! parser reads back to an equal term. `Debug` prints a compact form meant
//! for logs (`(add 1 2)`).

use crate::picture::Picture;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a term.
pub type TermRef = Rc<Term>;

/// Index of a named variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl VarId {
    /// The slot named `galaxy` in scripts.
    pub const GALAXY: VarId = VarId(u32::MAX);
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::GALAXY {
            write!(f, "galaxy")
        } else {
            write!(f, ":{}", self.0)
        }
    }
}

/// Every primitive the evaluator knows how to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    S,
    C,
    B,
    I,
    True,
    False,
    Cons,
    Car,
    Cdr,
    Inc,
    Dec,
    Add,
    Mul,
    Div,
    Eq,
    Lt,
    Neg,
    Pwr2,
    If0,
    IsNil,
    /// Argument handed to a cons cell by `isnil`; always answers `f`.
    NilProbe,
    Draw,
    Checkerboard,
    MultipleDraw,
    Modulate,
    Demodulate,
    Send,
    Interact,
    /// Continuation of `interact`: inspects one protocol result.
    InteractStep,
}

impl Combinator {
    pub const ALL: [Combinator; 29] = [
        Self::S,
        Self::C,
        Self::B,
        Self::I,
        Self::True,
        Self::False,
        Self::Cons,
        Self::Car,
        Self::Cdr,
        Self::Inc,
        Self::Dec,
        Self::Add,
        Self::Mul,
        Self::Div,
        Self::Eq,
        Self::Lt,
        Self::Neg,
        Self::Pwr2,
        Self::If0,
        Self::IsNil,
        Self::NilProbe,
        Self::Draw,
        Self::Checkerboard,
        Self::MultipleDraw,
        Self::Modulate,
        Self::Demodulate,
        Self::Send,
        Self::Interact,
        Self::InteractStep,
    ];

    /// Number of arguments that triggers the rewrite rule.
    pub fn arity(self) -> usize {
        match self {
            Self::I
            | Self::Car
            | Self::Cdr
            | Self::Inc
            | Self::Dec
            | Self::Neg
            | Self::Pwr2
            | Self::IsNil
            | Self::Draw
            | Self::MultipleDraw
            | Self::Modulate
            | Self::Demodulate
            | Self::Send => 1,
            Self::True
            | Self::False
            | Self::Add
            | Self::Mul
            | Self::Div
            | Self::Eq
            | Self::Lt
            | Self::NilProbe
            | Self::Checkerboard
            | Self::InteractStep => 2,
            Self::S | Self::C | Self::B | Self::Cons | Self::If0 | Self::Interact => 3,
        }
    }

    /// Canonical source name.
    pub fn name(self) -> &'static str {
        match self {
            Self::S => "s",
            Self::C => "c",
            Self::B => "b",
            Self::I => "i",
            Self::True => "t",
            Self::False => "f",
            Self::Cons => "cons",
            Self::Car => "car",
            Self::Cdr => "cdr",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::Add => "add",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Eq => "eq",
            Self::Lt => "lt",
            Self::Neg => "neg",
            Self::Pwr2 => "pwr2",
            Self::If0 => "if0",
            Self::IsNil => "isnil",
            Self::NilProbe => "nilprobe",
            Self::Draw => "draw",
            Self::Checkerboard => "checkerboard",
            Self::MultipleDraw => "multipledraw",
            Self::Modulate => "mod",
            Self::Demodulate => "dem",
            Self::Send => "send",
            Self::Interact => "interact",
            Self::InteractStep => "interactstep",
        }
    }

    /// Resolve a source name, including the accepted aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vec" => Some(Self::Cons),
            "modulate" => Some(Self::Modulate),
            "demodulate" => Some(Self::Demodulate),
            _ => Self::ALL.iter().copied().find(|op| op.name() == name),
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A linked application node.
#[derive(Clone)]
pub struct Application {
    pub function: TermRef,
    pub argument: TermRef,
    whnf: OnceCell<TermRef>,
}

impl Application {
    pub fn new(function: TermRef, argument: TermRef) -> Self {
        Self {
            function,
            argument,
            whnf: OnceCell::new(),
        }
    }

    /// The weak head normal form recorded for this node, if any.
    pub fn whnf(&self) -> Option<&TermRef> {
        self.whnf.get()
    }

    /// Record the weak head normal form of this node. Later calls are ignored.
    pub fn memoize(&self, value: TermRef) {
        let _ = self.whnf.set(value);
    }
}

impl PartialEq for Application {
    fn eq(&self, other: &Self) -> bool {
        self.function == other.function && self.argument == other.argument
    }
}

/// A node of the term graph.
#[derive(Clone)]
pub enum Term {
    /// `ap f x` whose head is not a combinator waiting for more arguments.
    Apply(Application),
    Var(VarId),
    Int(i64),
    /// A modulated bit string.
    Signal(String),
    Nil,
    Pair(TermRef, TermRef),
    /// A combinator with fewer captured arguments than its arity.
    Combinator(Combinator, Vec<TermRef>),
    Picture(Picture),
}

impl Term {
    pub fn int(value: i64) -> TermRef {
        Rc::new(Term::Int(value))
    }

    pub fn var(id: VarId) -> TermRef {
        Rc::new(Term::Var(id))
    }

    pub fn signal(bits: impl Into<String>) -> TermRef {
        Rc::new(Term::Signal(bits.into()))
    }

    pub fn nil() -> TermRef {
        Rc::new(Term::Nil)
    }

    pub fn pair(car: TermRef, cdr: TermRef) -> TermRef {
        Rc::new(Term::Pair(car, cdr))
    }

    pub fn combinator(op: Combinator) -> TermRef {
        Rc::new(Term::Combinator(op, Vec::new()))
    }

    pub fn boolean(value: bool) -> TermRef {
        Self::combinator(if value {
            Combinator::True
        } else {
            Combinator::False
        })
    }

    pub fn picture(picture: Picture) -> TermRef {
        Rc::new(Term::Picture(picture))
    }

    /// Apply `function` to `argument`.
    ///
    /// A combinator still short of its arity captures the argument directly,
    /// and `cons` with two arguments becomes a [`Term::Pair`]. Everything
    /// else becomes an [`Application`] node for the evaluator to reduce.
    pub fn apply(function: TermRef, argument: TermRef) -> TermRef {
        if let Term::Combinator(op, args) = &*function {
            if args.len() + 1 < op.arity() {
                let mut args = args.clone();
                args.push(argument);
                if *op == Combinator::Cons && args.len() == 2 {
                    let cdr = args.pop();
                    let car = args.pop();
                    if let (Some(car), Some(cdr)) = (car, cdr) {
                        return Self::pair(car, cdr);
                    }
                }
                return Rc::new(Term::Combinator(*op, args));
            }
        }
        Rc::new(Term::Apply(Application::new(function, argument)))
    }

    /// Build a cons list ending in `nil`.
    pub fn list<I>(items: I) -> TermRef
    where
        I: IntoIterator<Item = TermRef>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(Self::nil(), |tail, head| Self::pair(head, tail))
    }

    /// A pair of two integers, the shape `draw` expects for a point.
    pub fn point(x: i64, y: i64) -> TermRef {
        Self::pair(Self::int(x), Self::int(y))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(&TermRef, &TermRef)> {
        match self {
            Term::Pair(car, cdr) => Some((car, cdr)),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Term::Nil)
    }

    /// Short name of the variant, used in type mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Term::Apply(_) => "application",
            Term::Var(_) => "variable",
            Term::Int(_) => "integer",
            Term::Signal(_) => "bit string",
            Term::Nil => "nil",
            Term::Pair(..) => "pair",
            Term::Combinator(..) => "function",
            Term::Picture(_) => "picture",
        }
    }
}

thread_local! {
    static VACANT: TermRef = Rc::new(Term::Nil);
}

fn vacant() -> TermRef {
    VACANT
        .try_with(Rc::clone)
        .unwrap_or_else(|_| Rc::new(Term::Nil))
}

/// Move `slot` into `out` if this is its last owner.
fn detach(slot: &mut TermRef, out: &mut Vec<TermRef>) {
    if Rc::strong_count(slot) == 1 {
        out.push(std::mem::replace(slot, vacant()));
    }
}

impl Term {
    fn detach_children(&mut self, out: &mut Vec<TermRef>) {
        match self {
            Term::Apply(app) => {
                detach(&mut app.function, out);
                detach(&mut app.argument, out);
                out.extend(app.whnf.take());
            }
            Term::Pair(car, cdr) => {
                detach(car, out);
                detach(cdr, out);
            }
            Term::Combinator(_, args) => out.append(args),
            Term::Var(_) | Term::Int(_) | Term::Signal(_) | Term::Nil | Term::Picture(_) => {}
        }
    }
}

// Lists nest one level per element, so a recursive drop could exhaust the
// stack; unlink uniquely owned children onto a heap worklist instead.
impl Drop for Term {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(child) = pending.pop() {
            if let Ok(mut term) = Rc::try_unwrap(child) {
                term.detach_children(&mut pending);
            }
        }
    }
}

// Structural equality, ignoring memoized results. Walks with a worklist
// for the same reason as `Drop`.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        let mut pending: Vec<(&Term, &Term)> = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if std::ptr::eq(a, b) {
                continue;
            }
            match (a, b) {
                (Term::Apply(x), Term::Apply(y)) => {
                    pending.push((&*x.argument, &*y.argument));
                    pending.push((&*x.function, &*y.function));
                }
                (Term::Pair(car1, cdr1), Term::Pair(car2, cdr2)) => {
                    pending.push((&**cdr1, &**cdr2));
                    pending.push((&**car1, &**car2));
                }
                (Term::Combinator(op1, args1), Term::Combinator(op2, args2)) => {
                    if op1 != op2 || args1.len() != args2.len() {
                        return false;
                    }
                    pending.extend(args1.iter().zip(args2).map(|(x, y)| (&**x, &**y)));
                }
                (Term::Var(x), Term::Var(y)) if x == y => {}
                (Term::Int(x), Term::Int(y)) if x == y => {}
                (Term::Signal(x), Term::Signal(y)) if x == y => {}
                (Term::Nil, Term::Nil) => {}
                (Term::Picture(x), Term::Picture(y)) if x == y => {}
                _ => return false,
            }
        }
        true
    }
}

enum Piece<'a> {
    Term(&'a Term),
    Space,
}

impl fmt::Display for Term {
    // Walks with an explicit stack: long lists nest one level per element.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Piece::Term(self)];
        while let Some(piece) = stack.pop() {
            let term = match piece {
                Piece::Space => {
                    f.write_str(" ")?;
                    continue;
                }
                Piece::Term(term) => term,
            };
            match term {
                Term::Apply(app) => {
                    f.write_str("ap ")?;
                    stack.push(Piece::Term(&app.argument));
                    stack.push(Piece::Space);
                    stack.push(Piece::Term(&app.function));
                }
                Term::Pair(car, cdr) => {
                    f.write_str("ap ap cons ")?;
                    stack.push(Piece::Term(cdr));
                    stack.push(Piece::Space);
                    stack.push(Piece::Term(car));
                }
                Term::Combinator(op, args) => {
                    for _ in args {
                        f.write_str("ap ")?;
                    }
                    f.write_str(op.name())?;
                    for arg in args.iter().rev() {
                        stack.push(Piece::Term(arg));
                        stack.push(Piece::Space);
                    }
                }
                Term::Var(id) => write!(f, "{id}")?,
                Term::Int(n) => write!(f, "{n}")?,
                Term::Signal(bits) => write!(f, "\"{bits}\"")?,
                Term::Nil => f.write_str("nil")?,
                Term::Picture(picture) => write!(f, "{picture}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Apply(app) => write!(f, "({:?} {:?})", app.function, app.argument),
            Term::Pair(car, cdr) => write!(f, "({car:?} . {cdr:?})"),
            Term::Combinator(op, args) if args.is_empty() => write!(f, "{op}"),
            Term::Combinator(op, args) => {
                write!(f, "({op}")?;
                for arg in args {
                    write!(f, " {arg:?}")?;
                }
                write!(f, ")")
            }
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?} {:?})", self.function, self.argument)
    }
}

/// One element of the flat token stream the linker consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatTerm {
    /// The `ap` marker.
    Apply,
    Leaf(TermRef),
}

impl fmt::Display for FlatTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlatTerm::Apply => f.write_str("ap"),
            FlatTerm::Leaf(term) => write!(f, "{term}"),
        }
    }
}
