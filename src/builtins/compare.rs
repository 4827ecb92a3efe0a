use crate::opcode::{Frame, Opcode, OpcodeRegistry};
use crate::tree::{Shape, Tree};
use std::rc::Rc;

pub fn register(registry: &mut OpcodeRegistry) {
    registry.register(Rc::new(Eq));
    registry.register(Rc::new(Gt));
    registry.register(Rc::new(Lt));
    registry.register(Rc::new(Ge));
    registry.register(Rc::new(Le));
}

/// The canonical boolean encoding this crate's opcodes produce: the bare
/// names `true`/`false` (see `binder::as_bool`), since the tree model has
/// no dedicated boolean variant.
fn boolean(value: bool, frame: &Frame) -> Tree {
    let name = if value { "true" } else { "false" };
    Tree::name(name, frame.body().span().clone())
}

fn numeric_cmp(a: &Tree, b: &Tree) -> Option<std::cmp::Ordering> {
    match (a.shape(), b.shape()) {
        (Shape::Integer(x), Shape::Integer(y)) => x.partial_cmp(y),
        (Shape::Real(x), Shape::Real(y)) => x.partial_cmp(y),
        (Shape::Integer(x), Shape::Real(y)) => (*x as f64).partial_cmp(y),
        (Shape::Real(x), Shape::Integer(y)) => x.partial_cmp(&(*y as f64)),
        _ => None,
    }
}

#[derive(Debug)]
struct Eq;
impl Opcode for Eq {
    fn op_id(&self) -> &str {
        "Eq"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let a = frame.arg(0)?;
        let b = frame.arg(1)?;
        Some(boolean(a == b, frame))
    }
}

#[derive(Debug)]
struct Gt;
impl Opcode for Gt {
    fn op_id(&self) -> &str {
        "Gt"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let ordering = numeric_cmp(frame.arg(0)?, frame.arg(1)?)?;
        Some(boolean(ordering == std::cmp::Ordering::Greater, frame))
    }
}

#[derive(Debug)]
struct Lt;
impl Opcode for Lt {
    fn op_id(&self) -> &str {
        "Lt"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let ordering = numeric_cmp(frame.arg(0)?, frame.arg(1)?)?;
        Some(boolean(ordering == std::cmp::Ordering::Less, frame))
    }
}

#[derive(Debug)]
struct Ge;
impl Opcode for Ge {
    fn op_id(&self) -> &str {
        "Ge"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let ordering = numeric_cmp(frame.arg(0)?, frame.arg(1)?)?;
        Some(boolean(ordering != std::cmp::Ordering::Less, frame))
    }
}

#[derive(Debug)]
struct Le;
impl Opcode for Le {
    fn op_id(&self) -> &str {
        "Le"
    }

    fn run(&self, frame: &Frame) -> Option<Tree> {
        let ordering = numeric_cmp(frame.arg(0)?, frame.arg(1)?)?;
        Some(boolean(ordering != std::cmp::Ordering::Greater, frame))
    }
}
