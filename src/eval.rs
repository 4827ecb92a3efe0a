//! The instruction loop: the main rewrite loop described in spec.md §4.3.
//! Trampolined so that sequences, blocks, `.`-scoped references, and rule
//! (including lambda) application never grow the host stack — only forced
//! sub-evaluations triggered from inside the pattern binder or the type
//! checker recurse into [`Evaluator::evaluate`] again, and that recursion
//! is what the depth bound in §4.3 actually measures.
//!
//! Grounded on the trampolined-loop design note (spec.md §9) and this
//! repository's own `vm::exec` dispatch shape: one `match` per syntactic
//! case, driven from a `loop` rather than by recursive descent.

use std::cell::Cell;
use std::rc::Rc;

use crate::binder::{self, MatchOutcome};
use crate::builtins;
use crate::cache::EvaluationCache;
use crate::closure;
use crate::error::{Diagnostic, ErrorSink};
use crate::opcode::{Frame, Opcode, OpcodeRegistry};
use crate::scope::{Context, Scope};
use crate::source::Span;
use crate::tree::{Shape, Tree};
use crate::typecheck::TypeRegistry;

/// The two values spec.md §6 says reach the core: the stack-depth limit,
/// and a verbosity flag gating diagnostic tracing. Tracing itself is
/// `eprintln!`-based, matching this repository's own ad hoc debug prints
/// (`construct::rule::Rule::bind`'s `print!("lookup! ...")`) rather than a
/// logging framework the teacher never reached for.
#[derive(Debug, Clone, Copy)]
pub struct EvalConfig {
    pub max_depth: usize,
    pub verbose: bool,
}

impl Default for EvalConfig {
    fn default() -> EvalConfig {
        EvalConfig { max_depth: 4096, verbose: false }
    }
}

/// Invoked once per top-level `evaluate` return (spec.md §6); the core
/// makes no assumption about what it does beyond "may reclaim unreachable
/// trees." The actual GC is external (spec.md §1 Non-goals); this trait is
/// the seam an embedder hangs a collector off of.
pub trait SafePoint {
    fn after_top_level(&self);
}

/// The safe-point an embedder hasn't wired up yet. Ships as the default so
/// tests and simple embeddings don't need their own no-op.
pub struct NullSafePoint;

impl SafePoint for NullSafePoint {
    fn after_top_level(&self) {}
}

const EVALUATION_ERROR: &str = "<evaluation-error>";

/// The fatal sentinel a depth-exceeded evaluation returns. Once produced,
/// every further lookup in the same top-level `evaluate` call short-circuits
/// to it (spec.md §7).
pub fn evaluation_error(span: Span) -> Tree {
    Tree::name(EVALUATION_ERROR, span)
}

pub fn is_evaluation_error(tree: &Tree) -> bool {
    tree.is_name(EVALUATION_ERROR)
}

/// The driver-facing evaluator state: the opcode/type registries (process-
/// wide, read-only once built) plus the per-top-level-call depth counter
/// and error sentinel (spec.md §9 "thread the error state through the
/// evaluator's per-call record rather than as a global, if multiple
/// evaluators may coexist").
pub struct Evaluator {
    registry: OpcodeRegistry,
    type_registry: TypeRegistry,
    config: EvalConfig,
    depth: Cell<usize>,
    errored: Cell<bool>,
}

impl Evaluator {
    pub fn new(registry: OpcodeRegistry, type_registry: TypeRegistry, config: EvalConfig) -> Evaluator {
        Evaluator { registry, type_registry, config, depth: Cell::new(0), errored: Cell::new(false) }
    }

    /// An evaluator carrying the standard arithmetic/comparison opcodes and
    /// the primitive type checks (spec.md §4 ambient "Opcode registry
    /// contents") — enough to run the scenarios in spec.md §8 without an
    /// embedder supplying its own registry.
    pub fn with_standard_library(config: EvalConfig) -> Evaluator {
        Evaluator::new(builtins::standard_opcodes(), builtins::standard_types(), config)
    }

    pub fn registry(&self) -> &OpcodeRegistry {
        &self.registry
    }

    pub fn type_registry(&self) -> &TypeRegistry {
        &self.type_registry
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// `evaluate(scope, tree) -> tree` (spec.md §6): the main entry point.
    /// Preprocesses top-level declarations from `tree` into `scope`, runs
    /// the instruction loop on whatever instructions remain, then invokes
    /// the safe-point hook. Always returns a tree — the reduced result, or
    /// the `evaluation-error` sentinel.
    pub fn evaluate_top(
        &self,
        scope: &Scope,
        tree: Tree,
        errors: &mut ErrorSink,
        safepoint: &dyn SafePoint,
    ) -> Tree {
        self.depth.set(0);
        self.errored.set(false);

        let result = match preprocess(scope, &tree) {
            Some(remaining) => self.evaluate(Context::new(scope.clone()), remaining, errors),
            None => tree,
        };

        safepoint.after_top_level();
        result
    }

    /// A recursive evaluator invocation: runs the trampolined instruction
    /// loop to a fixed point in `ctx`. Used both as the top-level driver's
    /// workhorse and as the "force evaluate this subtree" primitive the
    /// pattern binder and type checker call — every call here increments
    /// the depth counter (spec.md §4.3's "monotonic depth counter across
    /// recursive evaluator invocations"), which is why plain trampolined
    /// rule recursion (e.g. `fact`) never exhausts it, but a pattern that
    /// must force-evaluate arbitrarily deep arguments will.
    pub fn evaluate(&self, ctx: Context, what: Tree, errors: &mut ErrorSink) -> Tree {
        if self.errored.get() {
            return evaluation_error(what.span().clone());
        }

        let depth = self.depth.get() + 1;
        if depth > self.config.max_depth {
            self.errored.set(true);
            errors.push(Diagnostic::new(
                "evaluation depth exceeded",
                what.span().clone(),
                vec![what.clone()],
            ));
            return evaluation_error(what.span().clone());
        }
        self.depth.set(depth);

        let result = self.run_loop(ctx, what, errors);

        self.depth.set(depth - 1);
        result
    }

    fn run_loop(&self, mut ctx: Context, mut what: Tree, errors: &mut ErrorSink) -> Tree {
        let entry_scope = ctx.scope().clone();
        let mut result: Option<Tree> = None;

        loop {
            if self.errored.get() {
                return evaluation_error(what.span().clone());
            }
            if self.config.verbose {
                eprintln!("eval: {:?}", what);
            }

            match self.try_lookup(&ctx, &what, errors) {
                Some(RuleEffect::SelfValue) => return self.finish(&ctx, &entry_scope, what),
                Some(RuleEffect::Value(value)) => return self.finish(&ctx, &entry_scope, value),
                Some(RuleEffect::Continue(scope, body)) => {
                    ctx.enter(scope);
                    what = body;
                    continue;
                },
                None => {},
            }

            match what.shape().clone() {
                Shape::Integer(_) | Shape::Real(_) | Shape::Text(..) => {
                    return self.finish(&ctx, &entry_scope, what);
                },

                Shape::Name(name) => {
                    errors.push(Diagnostic::new(
                        format!("no matching name: {}", name),
                        what.span().clone(),
                        vec![what.clone()],
                    ));
                    return self.finish(&ctx, &entry_scope, what);
                },

                Shape::Block(child, _delim) => {
                    let parent = ctx.scope().clone();
                    let child_scope = ctx.push_scope();
                    let remaining = preprocess(&child_scope, &child);

                    if child_scope.is_empty() {
                        ctx.enter(parent);
                    }

                    match remaining {
                        Some(next) => {
                            what = next;
                            continue;
                        },
                        None => return self.finish(&ctx, &entry_scope, what),
                    }
                },

                Shape::Prefix(left, right) => {
                    if let Some((scope, inner)) = closure::unwrap_closure(&what) {
                        ctx.enter(scope);
                        what = inner;
                        continue;
                    }

                    if let Shape::Name(name) = left.shape() {
                        if name == "type" || name == "extern" || name == "data" {
                            return self.finish(&ctx, &entry_scope, what.clone());
                        }
                    }

                    if let Some((param, body)) = left.as_rule() {
                        let local = Scope::child(ctx.scope());
                        let mut cache = EvaluationCache::new();
                        let mut outcome = MatchOutcome::default();

                        if binder::bind(self, param, &right, &ctx, &local, &mut cache, errors, &mut outcome) {
                            ctx.enter(local);
                            what = body.clone();
                            continue;
                        } else {
                            errors.push(Diagnostic::new(
                                "no prefix matches",
                                what.span().clone(),
                                vec![what.clone()],
                            ));
                            return self.finish(&ctx, &entry_scope, what);
                        }
                    }

                    let mut left_ctx = ctx.clone();
                    left_ctx.push_scope();
                    let new_left = self.evaluate(left_ctx, left.clone(), errors);

                    if new_left != left {
                        let new_right = self.evaluate(ctx.clone(), right.clone(), errors);
                        what = Tree::prefix(new_left, new_right, what.span().clone());
                        continue;
                    } else {
                        errors.push(Diagnostic::new(
                            "no prefix matches",
                            what.span().clone(),
                            vec![what.clone()],
                        ));
                        return self.finish(&ctx, &entry_scope, what);
                    }
                },

                Shape::Postfix(..) => {
                    errors.push(Diagnostic::new("no postfix matches", what.span().clone(), vec![what.clone()]));
                    return self.finish(&ctx, &entry_scope, what);
                },

                Shape::Infix(op, left, right) => match op.as_str() {
                    ";" | "\n" => {
                        let left_value = self.evaluate(ctx.clone(), left, errors);
                        if !is_trivial(&left_value) {
                            result = Some(left_value);
                        }
                        what = right;
                        continue;
                    },

                    "->" => {
                        return self.finish(&ctx, &entry_scope, result.take().unwrap_or_else(self_sentinel));
                    },

                    "as" => {
                        let mut cache = EvaluationCache::new();
                        match crate::typecheck::check_type(self, &ctx, &left, &right, &mut cache, errors) {
                            Some(value) => return self.finish(&ctx, &entry_scope, value),
                            None => {
                                errors.push(Diagnostic::new(
                                    "value did not satisfy declared type",
                                    what.span().clone(),
                                    vec![left.clone(), right.clone()],
                                ));
                                return self.finish(&ctx, &entry_scope, left);
                            },
                        }
                    },

                    "." => {
                        let left_value = self.evaluate(ctx.clone(), left, errors);
                        if let Some((scope, _inner)) = closure::unwrap_closure(&left_value) {
                            ctx.enter(scope);
                        }
                        what = right;
                        continue;
                    },

                    _ => {
                        errors.push(Diagnostic::new("no infix matches", what.span().clone(), vec![what.clone()]));
                        return self.finish(&ctx, &entry_scope, what);
                    },
                },
            }
        }
    }

    /// Result enclosure (spec.md §4.3 step 3): if evaluation left the
    /// context somewhere other than where it started, wrap the result in a
    /// closure capturing that context. This is the mechanism by which an
    /// inner scope survives its syntactic lifetime (scenario 6: `M.x`).
    fn finish(&self, ctx: &Context, entry_scope: &Scope, value: Tree) -> Tree {
        if ctx.scope() == entry_scope {
            value
        } else {
            closure::make_closure(ctx.scope(), value)
        }
    }

    /// Tries every rule visible from `ctx`'s scope, innermost first. On a
    /// match, diagnostics pushed by failed earlier candidates are retracted
    /// (spec.md §4.3 "errors accumulated during failed trial matches are
    /// cleared").
    fn try_lookup(&self, ctx: &Context, what: &Tree, errors: &mut ErrorSink) -> Option<RuleEffect> {
        let start_len = errors.len();
        let scope = ctx.scope().clone();

        let found = scope.lookup(|decl_scope, rule| {
            let (pattern, body) = rule.as_rule().expect("rule table holds only Infix(\"->\", ...) rules");

            // A rule whose own pattern is a bare name binds unconditionally
            // once tried (see `binder::bind`'s `Shape::Name` arm — it's a
            // capture, not an equality test). Nested inside a larger pattern
            // that's fine: the enclosing shape already narrowed `test` to
            // this parameter's position. But tried here, as a whole-pattern
            // candidate against an arbitrary `what`, that same permissiveness
            // would let any bare-name declaration swallow any other
            // expression evaluated in its scope (e.g. `M -> {...}` matching
            // the entire `M.x` before the `.`-operator ever splits it).
            // Restrict whole-pattern bare names to actual references.
            if let Shape::Name(name) = pattern.shape() {
                if !what.is_name(name) {
                    return None;
                }
            }

            let local = Scope::child(decl_scope);
            let mut cache = EvaluationCache::new();
            let mut outcome = MatchOutcome::default();

            if !binder::bind(self, pattern, what, ctx, &local, &mut cache, errors, &mut outcome) {
                return None;
            }

            if is_self_sentinel(body) {
                return Some(RuleEffect::SelfValue);
            }

            if let Some(op) = resolve_opcode(&self.registry, body) {
                let frame = Frame::new(outcome.args.clone(), body.clone(), Context::new(local.clone()));
                return match op.run(&frame) {
                    Some(value) => Some(RuleEffect::Value(value)),
                    None => Some(RuleEffect::Value(evaluation_error(body.span().clone()))),
                };
            }

            Some(RuleEffect::Continue(local.clone(), body.clone()))
        });

        if found.is_some() {
            errors.truncate(start_len);
        }
        found
    }
}

enum RuleEffect {
    SelfValue,
    Value(Tree),
    Continue(Scope, Tree),
}

/// The bare name `self`, used as a rule body to mean "return the input
/// tree unchanged" without evaluating anything. Open question in spec.md
/// §9: we compare the rule's *body* against this sentinel (pre-closure),
/// not the mis-transcribed `decl->right` the source literally checks.
fn self_sentinel() -> Tree {
    Tree::name("self", Span::empty())
}

fn is_self_sentinel(body: &Tree) -> bool {
    body.is_name("self")
}

/// Resolves a rule body's opcode, consulting the attachment cache first
/// (spec.md §4.4). A body only ever names an opcode via the literal shape
/// `Prefix(Name("opcode"), Name(opid))`.
fn resolve_opcode(registry: &OpcodeRegistry, body: &Tree) -> Option<Rc<dyn Opcode>> {
    if let Some(cached) = body.opcode_attachment() {
        return Some(cached);
    }

    if let Shape::Prefix(head, tail) = body.shape() {
        if head.is_name("opcode") {
            if let Shape::Name(opid) = tail.shape() {
                if let Some(op) = registry.find(opid) {
                    body.set_opcode_attachment(Rc::clone(&op));
                    return Some(op);
                }
            }
        }
    }

    None
}

/// Before evaluating a block or sequence, every `Infix("->", p, b)` found
/// at its top level is moved into `scope`'s rule table (spec.md §4.2).
/// Returns the remaining non-declaration tree, or `None` if the whole
/// thing was declarations.
fn preprocess(scope: &Scope, tree: &Tree) -> Option<Tree> {
    match tree.shape() {
        Shape::Infix(op, left, right) if op == ";" || op == "\n" => {
            let left_remaining = preprocess(scope, left);
            let right_remaining = preprocess(scope, right);
            match (left_remaining, right_remaining) {
                (Some(a), Some(b)) => Some(Tree::infix(op.clone(), a, b, tree.span().clone())),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            }
        },
        Shape::Infix(op, _, _) if op == "->" => {
            scope.define(tree.clone());
            None
        },
        _ => Some(tree.clone()),
    }
}

/// A sequence step's result is "non-trivial" if it's worth keeping as the
/// running `result` — i.e. it wasn't itself a bare declaration fallout
/// (the `self` sentinel) with nothing else to show.
fn is_trivial(tree: &Tree) -> bool {
    is_self_sentinel(tree)
}

/// The evaluation cache's "force evaluate, memoized within one rule-match
/// attempt" primitive (spec.md §4.1), shared by the pattern binder and the
/// type checker.
pub fn force(
    evaluator: &Evaluator,
    ctx: &Context,
    cache: &mut EvaluationCache,
    errors: &mut ErrorSink,
    tree: &Tree,
) -> Tree {
    if let Some(hit) = cache.get(tree) {
        return hit;
    }
    let reduced = evaluator.evaluate(ctx.clone(), tree.clone(), errors);
    cache.insert(tree, reduced.clone());
    reduced
}

/// `define(scope, pattern -> body)` (spec.md §6): the primitive way to
/// seed rules before evaluation.
pub fn define(scope: &Scope, pattern: Tree, body: Tree, span: Span) {
    scope.define_rule(pattern, body, span);
}
