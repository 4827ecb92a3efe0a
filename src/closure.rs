//! A closure is a value paired with the scope it should be evaluated in,
//! encoded as a distinguished `Prefix` node: the left side is a sentinel
//! `Name` carrying the captured scope (in its attachment), the right side
//! is the wrapped value. Grounded on `common::closure::Closure` in the
//! teacher repo (`Closure { lambda, captureds }`, a value wrapped with
//! context), generalized from wrapping bytecode to wrapping any `Tree`.

use crate::scope::Scope;
use crate::tree::{Shape, Tree};

const SENTINEL: &str = "#closure";

/// Wraps `value` so it evaluates in `scope`. A no-op (returns `value`
/// unchanged) when `value` is already a fixed point of scope — a literal,
/// or a closure already captured over the very same scope.
pub fn make_closure(scope: &Scope, value: Tree) -> Tree {
    match value.shape() {
        Shape::Integer(_) | Shape::Real(_) | Shape::Text(..) => return value,
        _ => {},
    }

    if let Some((captured, _inner)) = unwrap_closure(&value) {
        if &captured == scope {
            return value;
        }
    }

    let span = value.span().clone();
    let sentinel = Tree::name(SENTINEL, span.clone());
    sentinel.set_closure_scope_attachment(scope.clone());
    Tree::prefix(sentinel, value, span)
}

/// `true` iff `tree` is a closure sentinel prefix.
pub fn is_closure(tree: &Tree) -> bool {
    match tree.shape() {
        Shape::Prefix(left, _) => left.closure_scope_attachment().is_some(),
        _ => false,
    }
}

/// Unwraps one layer of closure, returning the captured scope and the
/// wrapped value.
pub fn unwrap_closure(tree: &Tree) -> Option<(Scope, Tree)> {
    match tree.shape() {
        Shape::Prefix(left, right) => left.closure_scope_attachment().map(|scope| (scope, right.clone())),
        _ => None,
    }
}

/// Repeatedly unwraps closure-of-closure until reaching a non-closure
/// value, returning the innermost (latest-captured) scope alongside it.
/// `None` scope means the value was never wrapped.
pub fn unwrap_fully(mut tree: Tree) -> (Option<Scope>, Tree) {
    let mut last_scope = None;
    while let Some((scope, inner)) = unwrap_closure(&tree) {
        last_scope = Some(scope);
        tree = inner;
    }
    (last_scope, tree)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::Span;

    #[test]
    fn literal_is_unaffected_by_closure_wrapping() {
        let scope = Scope::root();
        let literal = Tree::integer(5, Span::empty());
        assert_eq!(make_closure(&scope, literal.clone()), literal);
    }

    #[test]
    fn wrapping_twice_over_same_scope_is_a_no_op() {
        let scope = Scope::root();
        let value = Tree::name("x", Span::empty());
        let once = make_closure(&scope, value);
        let twice = make_closure(&scope, once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn unwrap_recovers_scope_and_value() {
        let scope = Scope::root();
        let value = Tree::name("x", Span::empty());
        let wrapped = make_closure(&scope, value.clone());
        assert!(is_closure(&wrapped));
        let (captured, inner) = unwrap_closure(&wrapped).expect("should unwrap");
        assert_eq!(captured, scope);
        assert_eq!(inner, value);
    }

    #[test]
    fn unwrap_fully_peels_nested_closures() {
        let outer = Scope::root();
        let inner_scope = Scope::child(&outer);
        let value = Tree::name("x", Span::empty());

        // re-wrap manually over a different scope to force closure-of-closure.
        let once = make_closure(&outer, value.clone());
        let span = once.span().clone();
        let sentinel = Tree::name("#closure", span.clone());
        sentinel.set_closure_scope_attachment(inner_scope.clone());
        let twice = Tree::prefix(sentinel, once, span);

        let (scope, bottom) = unwrap_fully(twice);
        assert_eq!(scope, Some(inner_scope));
        assert_eq!(bottom, value);
    }
}
