use crate::opcode::{Frame, Opcode, OpcodeRegistry};
use crate::tree::{Shape, Tree};
use std::rc::Rc;

pub fn register(registry: &mut OpcodeRegistry) {
    registry.register(Rc::new(Add));
    registry.register(Rc::new(Sub));
    registry.register(Rc::new(Mul));
    registry.register(Rc::new(Div));
    registry.register(Rc::new(Rem));
    registry.register(Rc::new(Neg));
    registry.register(Rc::new(Double));
}

fn numeric_pair(frame: &Frame) -> Option<(&Tree, &Tree)> {
    Some((frame.arg(0)?, frame.arg(1)?))
}

#[derive(Debug)]
struct Add;
impl Opcode for Add {
    fn op_id(&self) -> &str {
        "Add"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let (a, b) = numeric_pair(frame)?;
        let span = frame.body().span().clone();
        match (a.shape(), b.shape()) {
            (Shape::Integer(x), Shape::Integer(y)) => Some(Tree::integer(x + y, span)),
            (Shape::Real(x), Shape::Real(y)) => Some(Tree::real(x + y, span)),
            (Shape::Integer(x), Shape::Real(y)) => Some(Tree::real(*x as f64 + y, span)),
            (Shape::Real(x), Shape::Integer(y)) => Some(Tree::real(x + *y as f64, span)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Sub;
impl Opcode for Sub {
    fn op_id(&self) -> &str {
        "Sub"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let (a, b) = numeric_pair(frame)?;
        let span = frame.body().span().clone();
        match (a.shape(), b.shape()) {
            (Shape::Integer(x), Shape::Integer(y)) => Some(Tree::integer(x - y, span)),
            (Shape::Real(x), Shape::Real(y)) => Some(Tree::real(x - y, span)),
            (Shape::Integer(x), Shape::Real(y)) => Some(Tree::real(*x as f64 - y, span)),
            (Shape::Real(x), Shape::Integer(y)) => Some(Tree::real(x - *y as f64, span)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Mul;
impl Opcode for Mul {
    fn op_id(&self) -> &str {
        "Mul"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let (a, b) = numeric_pair(frame)?;
        let span = frame.body().span().clone();
        match (a.shape(), b.shape()) {
            (Shape::Integer(x), Shape::Integer(y)) => Some(Tree::integer(x * y, span)),
            (Shape::Real(x), Shape::Real(y)) => Some(Tree::real(x * y, span)),
            (Shape::Integer(x), Shape::Real(y)) => Some(Tree::real(*x as f64 * y, span)),
            (Shape::Real(x), Shape::Integer(y)) => Some(Tree::real(x * *y as f64, span)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Div;
impl Opcode for Div {
    fn op_id(&self) -> &str {
        "Div"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let (a, b) = numeric_pair(frame)?;
        let span = frame.body().span().clone();
        match (a.shape(), b.shape()) {
            (Shape::Integer(_), Shape::Integer(0)) => None,
            (Shape::Integer(x), Shape::Integer(y)) => Some(Tree::integer(x / y, span)),
            (Shape::Real(x), Shape::Real(y)) if *y != 0.0 => Some(Tree::real(x / y, span)),
            (Shape::Integer(x), Shape::Real(y)) if *y != 0.0 => Some(Tree::real(*x as f64 / y, span)),
            (Shape::Real(x), Shape::Integer(y)) if *y != 0 => Some(Tree::real(x / *y as f64, span)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Rem;
impl Opcode for Rem {
    fn op_id(&self) -> &str {
        "Rem"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let (a, b) = numeric_pair(frame)?;
        let span = frame.body().span().clone();
        match (a.shape(), b.shape()) {
            (Shape::Integer(_), Shape::Integer(0)) => None,
            (Shape::Integer(x), Shape::Integer(y)) => Some(Tree::integer(x % y, span)),
            (Shape::Real(x), Shape::Real(y)) if *y != 0.0 => Some(Tree::real(x % y, span)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Neg;
impl Opcode for Neg {
    fn op_id(&self) -> &str {
        "Neg"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let a = frame.arg(0)?;
        let span = frame.body().span().clone();
        match a.shape() {
            Shape::Integer(x) => Some(Tree::integer(-x, span)),
            Shape::Real(x) => Some(Tree::real(-x, span)),
            _ => None,
        }
    }
}

/// Unary: spec.md §8 scenario 4's `2 * X -> opcode Double X` names a
/// single-argument doubling opcode, not a binary multiply — the pattern's
/// literal `2` is matched, not captured, so a binary `Mul` would never see
/// it.
#[derive(Debug)]
struct Double;
impl Opcode for Double {
    fn op_id(&self) -> &str {
        "Double"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let a = frame.arg(0)?;
        let span = frame.body().span().clone();
        match a.shape() {
            Shape::Integer(x) => Some(Tree::integer(x * 2, span)),
            Shape::Real(x) => Some(Tree::real(x * 2.0, span)),
            _ => None,
        }
    }
}
