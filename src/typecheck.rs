//! Two type-checking mechanisms, tried in order (spec.md §4.5):
//!
//! 1. A **primitive type check** — a [`TypeCheckOpcode`] attached to the
//!    type tree, resolved once by name and cached the same way an
//!    [`crate::opcode::Opcode`] is.
//! 2. A **type-shape check** — a type written `type <shape>` matches by
//!    running the pattern binder against the value with the shape as
//!    pattern, then *expanding* the shape with the bound names spliced
//!    back in.
//!
//! Grounded on `Rule::expand`/`Rule::expand_pattern` in the teacher's
//! `construct::rule`, which already does "reconstruct a tree with bound
//! names substituted" for syntactic macros — reused here for type shapes.

use std::fmt;
use std::rc::Rc;
use std::collections::HashMap;

use crate::binder::{self, MatchOutcome};
use crate::cache::EvaluationCache;
use crate::closure;
use crate::error::ErrorSink;
use crate::eval::Evaluator;
use crate::scope::{Context, Scope};
use crate::tree::{Delim, Shape, Tree};

/// A primitive type, resolved by name and cached on the type tree's
/// attachment. `check` may force-evaluate `value`; a `None` return means
/// "does not match," a `Some` return is the coerced value to bind.
pub trait TypeCheckOpcode: fmt::Debug {
    fn op_id(&self) -> &str;

    fn check(
        &self,
        evaluator: &Evaluator,
        ctx: &Context,
        value: &Tree,
        cache: &mut EvaluationCache,
        errors: &mut ErrorSink,
    ) -> Option<Tree>;
}

/// Process-wide, read-only after initialization, mapping primitive type
/// names (`"integer"`, `"real"`, ...) to their check implementation.
#[derive(Default)]
pub struct TypeRegistry {
    entries: HashMap<String, Rc<dyn TypeCheckOpcode>>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry { entries: HashMap::new() }
    }

    pub fn register(&mut self, check: Rc<dyn TypeCheckOpcode>) {
        self.entries.insert(check.op_id().to_string(), check);
    }

    pub fn find(&self, name: &str) -> Option<Rc<dyn TypeCheckOpcode>> {
        self.entries.get(name).map(Rc::clone)
    }
}

/// Checks `value` against `type_tree`, trying the primitive mechanism
/// first, then the type-shape mechanism. `None` means "does not match."
pub fn check_type(
    evaluator: &Evaluator,
    ctx: &Context,
    value: &Tree,
    type_tree: &Tree,
    cache: &mut EvaluationCache,
    errors: &mut ErrorSink,
) -> Option<Tree> {
    if let Some(op) = type_tree.type_check_attachment() {
        return op.check(evaluator, ctx, value, cache, errors);
    }

    if let Shape::Name(name) = type_tree.shape() {
        if let Some(op) = evaluator.type_registry().find(name) {
            type_tree.set_type_check_attachment(Rc::clone(&op));
            return op.check(evaluator, ctx, value, cache, errors);
        }
    }

    if let Shape::Prefix(head, shape) = type_tree.shape() {
        if head.is_name("type") {
            return check_shape(evaluator, ctx, value, shape, errors);
        }
    }

    None
}

/// Mechanism 2: `value` matches `type <shape>` iff it binds `shape` as a
/// pattern; the reconstructed, name-substituted shape is the result.
///
/// A bare leaf name in a shape that happens to name a registered primitive
/// type (`integer`, `real`, ...) is not an ordinary pattern-capture
/// variable — spec.md §8 scenario 5 writes shapes like `(pair integer
/// integer)` where each occurrence of `integer` independently checks that
/// field's value, rather than (as the generic "Name in P" rule would have
/// it) binding the first occurrence and then demanding every other field
/// be *equal* to it. `rewrite_primitive_leaves` turns each such leaf into a
/// freshly-named typed parameter (`#shape0:integer`, `#shape1:integer`, ...)
/// before the shape ever reaches the pattern binder, so the existing `":"`
/// typed-parameter machinery (`binder::bind_typed`) does the actual
/// checking and every occurrence gets its own, non-colliding capture name.
fn check_shape(
    evaluator: &Evaluator,
    ctx: &Context,
    value: &Tree,
    shape_tree: &Tree,
    errors: &mut ErrorSink,
) -> Option<Tree> {
    let stripped = match shape_tree.shape() {
        Shape::Block(inner, _) => inner.clone(),
        _ => shape_tree.clone(),
    };

    let mut counter = 0usize;
    let pattern = rewrite_primitive_leaves(evaluator, &stripped, &mut counter);

    let local = Scope::child(ctx.scope());
    let mut cache = EvaluationCache::new();
    let mut outcome = MatchOutcome::default();

    if !binder::bind(evaluator, &pattern, value, ctx, &local, &mut cache, errors, &mut outcome) {
        return None;
    }

    let expanded = expand(&pattern, &local);
    Some(closure::make_closure(&local, expanded))
}

/// Replaces every bare `Name` leaf in `tree` that names a registered
/// primitive type with `Infix(":", Name(fresh), Name(original))` — a
/// synthetic typed parameter. Head names in `Prefix`/`Postfix` position are
/// left alone (they are matched as literal tags via `is_name`, never
/// reaching the binder's generic `Name` case); the type-expression side of
/// an existing `":"`/`"as"` node and a `"when"` guard are left alone too,
/// mirroring `expand`'s own "only the left side" treatment of those
/// operators.
fn rewrite_primitive_leaves(evaluator: &Evaluator, tree: &Tree, counter: &mut usize) -> Tree {
    match tree.shape() {
        Shape::Integer(_) | Shape::Real(_) | Shape::Text(..) => tree.clone(),

        Shape::Name(name) => {
            if evaluator.type_registry().find(name).is_some() {
                *counter += 1;
                let fresh = Tree::name(format!("#shape{}", counter), tree.span().clone());
                Tree::infix(":", fresh, tree.clone(), tree.span().clone())
            } else {
                tree.clone()
            }
        },

        Shape::Block(child, delim) => {
            let new_child = rewrite_primitive_leaves(evaluator, child, counter);
            rebuild_block(tree, new_child, *delim)
        },

        Shape::Prefix(left, right) => {
            let new_left = match left.shape() {
                Shape::Name(_) => left.clone(),
                _ => rewrite_primitive_leaves(evaluator, left, counter),
            };
            let new_right = rewrite_primitive_leaves(evaluator, right, counter);
            rebuild_prefix(tree, new_left, new_right)
        },

        Shape::Postfix(left, right) => {
            let new_right = match right.shape() {
                Shape::Name(_) => right.clone(),
                _ => rewrite_primitive_leaves(evaluator, right, counter),
            };
            let new_left = rewrite_primitive_leaves(evaluator, left, counter);
            rebuild_postfix(tree, new_left, new_right)
        },

        Shape::Infix(op, left, right) => match op.as_str() {
            ":" | "as" | "when" => {
                let new_left = rewrite_primitive_leaves(evaluator, left, counter);
                rebuild_infix(tree, op.clone(), new_left, right.clone())
            },
            _ => {
                let new_left = rewrite_primitive_leaves(evaluator, left, counter);
                let new_right = rewrite_primitive_leaves(evaluator, right, counter);
                rebuild_infix(tree, op.clone(), new_left, new_right)
            },
        },
    }
}

/// Rebuilds `tree` with every bound name in `local` replaced by its
/// (unwrapped) bound value. Literals and unbound names pass through
/// unchanged; `":"`/`"as"`/`"when"` drop their annotation and expand only
/// the left side.
fn expand(tree: &Tree, local: &Scope) -> Tree {
    match tree.shape() {
        Shape::Integer(_) | Shape::Real(_) | Shape::Text(..) => tree.clone(),
        Shape::Name(name) => match local.bound(name) {
            Some(bound) => {
                let (_scope, inner) = closure::unwrap_fully(bound);
                inner
            },
            None => tree.clone(),
        },
        Shape::Block(child, delim) => {
            let new_child = expand(child, local);
            rebuild_block(tree, new_child, *delim)
        },
        Shape::Prefix(left, right) => {
            let new_left = expand(left, local);
            let new_right = expand(right, local);
            rebuild_prefix(tree, new_left, new_right)
        },
        Shape::Postfix(left, right) => {
            let new_left = expand(left, local);
            let new_right = expand(right, local);
            rebuild_postfix(tree, new_left, new_right)
        },
        Shape::Infix(op, left, right) => match op.as_str() {
            ":" | "as" | "when" => expand(left, local),
            _ => {
                let new_left = expand(left, local);
                let new_right = expand(right, local);
                rebuild_infix(tree, op.clone(), new_left, new_right)
            },
        },
    }
}

fn rebuild_block(original: &Tree, child: Tree, delim: Delim) -> Tree {
    match original.shape() {
        Shape::Block(old_child, _) if old_child == &child => original.clone(),
        _ => Tree::block(child, delim, original.span().clone()),
    }
}

fn rebuild_prefix(original: &Tree, left: Tree, right: Tree) -> Tree {
    match original.shape() {
        Shape::Prefix(ol, or_) if ol == &left && or_ == &right => original.clone(),
        _ => Tree::prefix(left, right, original.span().clone()),
    }
}

fn rebuild_postfix(original: &Tree, left: Tree, right: Tree) -> Tree {
    match original.shape() {
        Shape::Postfix(ol, or_) if ol == &left && or_ == &right => original.clone(),
        _ => Tree::postfix(left, right, original.span().clone()),
    }
}

fn rebuild_infix(original: &Tree, op: String, left: Tree, right: Tree) -> Tree {
    match original.shape() {
        Shape::Infix(oo, ol, or_) if oo == &op && ol == &left && or_ == &right => original.clone(),
        _ => Tree::infix(op, left, right, original.span().clone()),
    }
}
