use std::rc::Rc;

use crate::cache::EvaluationCache;
use crate::error::ErrorSink;
use crate::eval::{force, Evaluator};
use crate::scope::Context;
use crate::tree::{Shape, Tree};
use crate::typecheck::{TypeCheckOpcode, TypeRegistry};

pub fn register(registry: &mut TypeRegistry) {
    registry.register(Rc::new(IntegerCheck));
    registry.register(Rc::new(RealCheck));
    registry.register(Rc::new(TextCheck));
    registry.register(Rc::new(NameCheck));
    registry.register(Rc::new(BlockCheck));
    registry.register(Rc::new(ValueCheck));
}

#[derive(Debug)]
struct IntegerCheck;
impl TypeCheckOpcode for IntegerCheck {
    fn op_id(&self) -> &str {
        "integer"
    }

    fn check(
        &self,
        evaluator: &Evaluator,
        ctx: &Context,
        value: &Tree,
        cache: &mut EvaluationCache,
        errors: &mut ErrorSink,
    ) -> Option<Tree> {
        let forced = force(evaluator, ctx, cache, errors, value);
        match forced.shape() {
            Shape::Integer(_) => Some(forced),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct RealCheck;
impl TypeCheckOpcode for RealCheck {
    fn op_id(&self) -> &str {
        "real"
    }

    fn check(
        &self,
        evaluator: &Evaluator,
        ctx: &Context,
        value: &Tree,
        cache: &mut EvaluationCache,
        errors: &mut ErrorSink,
    ) -> Option<Tree> {
        let forced = force(evaluator, ctx, cache, errors, value);
        match forced.shape() {
            Shape::Real(_) => Some(forced.clone()),
            // an integer is a fixed point of `as real` too: coerce.
            Shape::Integer(i) => Some(Tree::real(*i as f64, forced.span().clone())),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct TextCheck;
impl TypeCheckOpcode for TextCheck {
    fn op_id(&self) -> &str {
        "text"
    }

    fn check(
        &self,
        evaluator: &Evaluator,
        ctx: &Context,
        value: &Tree,
        cache: &mut EvaluationCache,
        errors: &mut ErrorSink,
    ) -> Option<Tree> {
        let forced = force(evaluator, ctx, cache, errors, value);
        match forced.shape() {
            Shape::Text(..) => Some(forced),
            _ => None,
        }
    }
}

/// Checks the raw syntactic shape of the test tree, *without* forcing its
/// evaluation — a pattern variable's name is only itself before a rule
/// rewrites it.
#[derive(Debug)]
struct NameCheck;
impl TypeCheckOpcode for NameCheck {
    fn op_id(&self) -> &str {
        "name"
    }

    fn check(
        &self,
        _evaluator: &Evaluator,
        _ctx: &Context,
        value: &Tree,
        _cache: &mut EvaluationCache,
        _errors: &mut ErrorSink,
    ) -> Option<Tree> {
        match value.shape() {
            Shape::Name(_) => Some(value.clone()),
            _ => None,
        }
    }
}

/// Checks raw syntactic shape, same rationale as `NameCheck`.
#[derive(Debug)]
struct BlockCheck;
impl TypeCheckOpcode for BlockCheck {
    fn op_id(&self) -> &str {
        "block"
    }

    fn check(
        &self,
        _evaluator: &Evaluator,
        _ctx: &Context,
        value: &Tree,
        _cache: &mut EvaluationCache,
        _errors: &mut ErrorSink,
    ) -> Option<Tree> {
        match value.shape() {
            Shape::Block(..) => Some(value.clone()),
            _ => None,
        }
    }
}

/// The universal type from spec.md §4.1's special case: forces evaluation
/// of the test tree and always accepts the result.
#[derive(Debug)]
struct ValueCheck;
impl TypeCheckOpcode for ValueCheck {
    fn op_id(&self) -> &str {
        "value"
    }

    fn check(
        &self,
        evaluator: &Evaluator,
        ctx: &Context,
        value: &Tree,
        cache: &mut EvaluationCache,
        errors: &mut ErrorSink,
    ) -> Option<Tree> {
        Some(force(evaluator, ctx, cache, errors, value))
    }
}
