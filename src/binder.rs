//! The pattern binder: walks a pattern tree `P` against a test tree `T`,
//! recording bindings into a local scope and failing (returning `false`)
//! the moment any sub-match can't be made. Grounded on
//! `Rule::bind`/`Rule::expand` in the teacher's `construct::rule` (same
//! "mismatch is silent, hard failure is reported" split this module keeps),
//! generalized from syntactic-macro argument patterns to the full rewrite
//! pattern language of spec.md §4.1.

use crate::closure;
use crate::error::{Diagnostic, ErrorSink};
use crate::eval::{force, Evaluator};
use crate::scope::{Context, Scope};
use crate::tree::{Shape, Tree};
use crate::typecheck;
use crate::cache::EvaluationCache;

/// What a successful match produced, beyond the bindings already installed
/// into the local scope: the positional argument list opcodes dispatch
/// against (spec.md §4.1 "Bindings output"), and any `as`-declared result
/// type.
#[derive(Default)]
pub struct MatchOutcome {
    pub args: Vec<Tree>,
    pub result_type: Option<Tree>,
}

/// Attempts to match `test` against `pattern`. On success, every `Name`
/// pattern encountered is bound in `local` and `outcome.args` carries the
/// bound values in encounter order; on failure `local` may still have
/// picked up bindings from sub-patterns matched before the failing one —
/// callers that retry another rule must use a fresh `local` scope per
/// candidate (see `eval::try_lookup`).
pub fn bind(
    evaluator: &Evaluator,
    pattern: &Tree,
    test: &Tree,
    test_ctx: &Context,
    local: &Scope,
    cache: &mut EvaluationCache,
    errors: &mut ErrorSink,
    outcome: &mut MatchOutcome,
) -> bool {
    match pattern.shape() {
        Shape::Integer(_) | Shape::Real(_) | Shape::Text(..) => {
            let value = force(evaluator, test_ctx, cache, errors, test);
            &value == pattern
        },

        Shape::Name(name) => match local.bound_local(name) {
            Some(existing) => {
                let existing_value = force(evaluator, test_ctx, cache, errors, &existing);
                let test_value = force(evaluator, test_ctx, cache, errors, test);
                existing_value == test_value
            },
            None => {
                let wrapped = closure::make_closure(test_ctx.scope(), test.clone());
                local.define_rule(pattern.clone(), wrapped.clone(), pattern.span().clone());
                outcome.args.push(wrapped);
                true
            },
        },

        Shape::Block(inner_pattern, delim) => match test.shape() {
            Shape::Block(inner_test, test_delim) if test_delim == delim => {
                bind(evaluator, inner_pattern, inner_test, test_ctx, local, cache, errors, outcome)
            },
            _ => bind(evaluator, inner_pattern, test, test_ctx, local, cache, errors, outcome),
        },

        Shape::Prefix(left, right) => match left.shape() {
            Shape::Name(name) => match test.shape() {
                Shape::Prefix(test_left, test_right) if test_left.is_name(name) => {
                    bind(evaluator, right, test_right, test_ctx, local, cache, errors, outcome)
                },
                _ => false,
            },
            _ => match test.shape() {
                Shape::Prefix(test_left, test_right) => {
                    bind(evaluator, left, test_left, test_ctx, local, cache, errors, outcome)
                        && bind(evaluator, right, test_right, test_ctx, local, cache, errors, outcome)
                },
                _ => false,
            },
        },

        Shape::Postfix(left, right) => match right.shape() {
            Shape::Name(name) => match test.shape() {
                Shape::Postfix(test_left, test_right) if test_right.is_name(name) => {
                    bind(evaluator, left, test_left, test_ctx, local, cache, errors, outcome)
                },
                _ => false,
            },
            _ => match test.shape() {
                Shape::Postfix(test_left, test_right) => {
                    bind(evaluator, left, test_left, test_ctx, local, cache, errors, outcome)
                        && bind(evaluator, right, test_right, test_ctx, local, cache, errors, outcome)
                },
                _ => false,
            },
        },

        Shape::Infix(op, left, right) => match op.as_str() {
            ":" => bind_typed(evaluator, pattern, left, right, test, test_ctx, local, cache, errors, outcome),
            "as" => bind_as(evaluator, left, right, test, test_ctx, local, cache, errors, outcome),
            "when" => bind_when(evaluator, left, right, test, test_ctx, local, cache, errors, outcome),
            _ => bind_infix(evaluator, op, left, right, test, test_ctx, local, cache, errors, outcome),
        },
    }
}

/// `x : tau` — evaluate `tau` as a type, type-check `test` against it, and
/// on success bind `x` to the checked/coerced value.
#[allow(clippy::too_many_arguments)]
fn bind_typed(
    evaluator: &Evaluator,
    pattern: &Tree,
    left: &Tree,
    type_expr: &Tree,
    test: &Tree,
    test_ctx: &Context,
    local: &Scope,
    cache: &mut EvaluationCache,
    errors: &mut ErrorSink,
    outcome: &mut MatchOutcome,
) -> bool {
    let name = match left.shape() {
        Shape::Name(name) => name.clone(),
        _ => {
            errors.push(Diagnostic::new(
                "invalid declaration: left of ':' must be a name",
                pattern.span().clone(),
                vec![left.clone()],
            ));
            return false;
        },
    };

    let ty = evaluator.evaluate(test_ctx.clone(), type_expr.clone(), errors);
    match typecheck::check_type(evaluator, test_ctx, test, &ty, cache, errors) {
        Some(checked) => {
            local.define_rule(Tree::name(name, left.span().clone()), checked.clone(), left.span().clone());
            outcome.args.push(checked);
            true
        },
        None => false,
    }
}

/// `pattern as tau` — record the declared result type, then recurse on
/// `pattern`. Fails if a result type was already declared.
#[allow(clippy::too_many_arguments)]
fn bind_as(
    evaluator: &Evaluator,
    left: &Tree,
    type_expr: &Tree,
    test: &Tree,
    test_ctx: &Context,
    local: &Scope,
    cache: &mut EvaluationCache,
    errors: &mut ErrorSink,
    outcome: &mut MatchOutcome,
) -> bool {
    if outcome.result_type.is_some() {
        errors.push(Diagnostic::new(
            "invalid declaration: duplicate 'as' result type",
            type_expr.span().clone(),
            vec![type_expr.clone()],
        ));
        return false;
    }

    let ty = evaluator.evaluate(test_ctx.clone(), type_expr.clone(), errors);
    outcome.result_type = Some(ty);
    bind(evaluator, left, test, test_ctx, local, cache, errors, outcome)
}

/// `pattern when guard` — bind `pattern`, then evaluate `guard` in the
/// binding scope so it sees the parameters just bound, not outer shadows.
#[allow(clippy::too_many_arguments)]
fn bind_when(
    evaluator: &Evaluator,
    left: &Tree,
    guard: &Tree,
    test: &Tree,
    test_ctx: &Context,
    local: &Scope,
    cache: &mut EvaluationCache,
    errors: &mut ErrorSink,
    outcome: &mut MatchOutcome,
) -> bool {
    if !bind(evaluator, left, test, test_ctx, local, cache, errors, outcome) {
        return false;
    }

    let guard_ctx = Context::new(local.clone());
    let guard_result = evaluator.evaluate(guard_ctx, guard.clone(), errors);
    match as_bool(&guard_result) {
        Some(value) => value,
        None => {
            errors.push(Diagnostic::new(
                "guard did not evaluate to a boolean",
                guard.span().clone(),
                vec![guard_result],
            ));
            false
        },
    }
}

/// Any other infix operator: `test` must be an infix with the same
/// operator (forcing `test` once if it isn't directly an infix), then
/// recurse on both sides.
#[allow(clippy::too_many_arguments)]
fn bind_infix(
    evaluator: &Evaluator,
    op: &str,
    left: &Tree,
    right: &Tree,
    test: &Tree,
    test_ctx: &Context,
    local: &Scope,
    cache: &mut EvaluationCache,
    errors: &mut ErrorSink,
    outcome: &mut MatchOutcome,
) -> bool {
    let direct = match test.shape() {
        Shape::Infix(test_op, test_left, test_right) if test_op == op => {
            Some((test_left.clone(), test_right.clone()))
        },
        Shape::Infix(..) => None,
        _ => {
            let forced = force(evaluator, test_ctx, cache, errors, test);
            match forced.shape() {
                Shape::Infix(test_op, test_left, test_right) if test_op == op => {
                    Some((test_left.clone(), test_right.clone()))
                },
                _ => None,
            }
        },
    };

    match direct {
        Some((test_left, test_right)) => {
            bind(evaluator, left, &test_left, test_ctx, local, cache, errors, outcome)
                && bind(evaluator, right, &test_right, test_ctx, local, cache, errors, outcome)
        },
        None => false,
    }
}

/// The canonical boolean encoding: the bare names `true`/`false`, as
/// produced by the built-in comparison opcodes (see `builtins::compare`).
pub fn as_bool(tree: &Tree) -> Option<bool> {
    match tree.shape() {
        Shape::Name(name) if name == "true" => Some(true),
        Shape::Name(name) if name == "false" => Some(false),
        _ => None,
    }
}
