//! A minimal, process-wide opcode and type-check registry: integer/real
//! arithmetic, comparison, and the primitive type checks spec.md §4.1's
//! special-cased `value` type and the §8 scenarios need. Grounded on
//! `core::math`/`core::logic` in the teacher repo (same binary-operator
//! match shapes), generalized from `Data`-pair opcodes to `Tree`-pair
//! opcodes.
//!
//! Anything past this — I/O, user-defined FFI, a real standard library —
//! is out of scope (spec.md §4 ambient "Opcode registry contents"), same as
//! the distilled spec's opcode *registry* being an external collaborator.

mod arith;
mod compare;
mod types;

use crate::opcode::OpcodeRegistry;
use crate::scope::Scope;
use crate::source::Span;
use crate::tree::{Delim, Tree};
use crate::typecheck::TypeRegistry;

pub fn standard_opcodes() -> OpcodeRegistry {
    let mut registry = OpcodeRegistry::new();
    arith::register(&mut registry);
    compare::register(&mut registry);
    registry
}

pub fn standard_types() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    types::register(&mut registry);
    registry
}

/// Builds the `Prefix("opcode", Name(opid))` shape a rule body uses to name
/// an opcode (spec.md §4.4).
pub fn opcode_body(opid: &str, span: Span) -> Tree {
    Tree::prefix(Tree::name("opcode", span.clone()), Tree::name(opid, span.clone()), span)
}

/// Convenience: installs `X:integer + Y:integer -> opcode Add` style rules
/// for the standard arithmetic and comparison operators, so embedders (and
/// this crate's own tests) don't need to hand-build every rule tree spelled
/// out in spec.md §8's scenarios.
pub fn define_arithmetic(scope: &Scope, span: Span) {
    for (op, opid) in [("+", "Add"), ("-", "Sub"), ("*", "Mul"), ("/", "Div"), ("%", "Rem")] {
        define_binop(scope, op, opid, "integer", span.clone());
        define_binop(scope, op, opid, "real", span.clone());
    }
    for (op, opid) in [("==", "Eq"), (">", "Gt"), ("<", "Lt"), (">=", "Ge"), ("<=", "Le")] {
        define_binop(scope, op, opid, "integer", span.clone());
        define_binop(scope, op, opid, "real", span.clone());
    }
}

fn define_binop(scope: &Scope, op: &str, opid: &str, ty: &str, span: Span) {
    let x = Tree::name("X", span.clone());
    let y = Tree::name("Y", span.clone());
    let typed_x = Tree::infix(":", x, Tree::name(ty, span.clone()), span.clone());
    let typed_y = Tree::infix(":", y, Tree::name(ty, span.clone()), span.clone());
    let pattern = Tree::infix(op, typed_x, typed_y, span.clone());
    let body = opcode_body(opid, span.clone());
    scope.define_rule(pattern, body, span);
}

/// Wraps a tree in parens, the delimiter pair an embedder's parser would
/// produce for `(...)`.
pub fn paren(child: Tree, span: Span) -> Tree {
    Tree::block(child, Delim::Paren, span)
}
