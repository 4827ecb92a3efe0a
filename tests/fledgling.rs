//! End-to-end scenario tests, one per spec.md §8 "Concrete scenarios."
//! Grounded on this repository's own `tests/fledgling.rs` snippet-outcome
//! table, adapted from "run a parsed snippet file" to "build a tree by hand
//! and evaluate it" since no parser ships with this crate.

use std::rc::Rc;

use twig::error::ErrorSink;
use twig::eval::{is_evaluation_error, EvalConfig, Evaluator, NullSafePoint};
use twig::scope::Scope;
use twig::source::{Source, Span};
use twig::tree::{Delim, Tree};

fn span() -> Span {
    Span::empty()
}

fn run(scope: &Scope, evaluator: &Evaluator, tree: Tree) -> (Tree, ErrorSink) {
    let mut errors = ErrorSink::new();
    let result = evaluator.evaluate_top(scope, tree, &mut errors, &NullSafePoint);
    (result, errors)
}

/// Scenario 1: arithmetic via opcodes. `X:integer + Y:integer -> opcode Add`,
/// `2 + 3` -> `5`.
#[test]
fn scenario_arithmetic_via_opcodes() {
    let scope = Scope::root();
    let evaluator = Evaluator::with_standard_library(EvalConfig::default());
    twig::builtins::define_arithmetic(&scope, span());

    let expr = Tree::infix("+", Tree::integer(2, span()), Tree::integer(3, span()), span());
    let (result, errors) = run(&scope, &evaluator, expr);

    assert_eq!(result, Tree::integer(5, span()));
    assert!(errors.is_empty());
}

/// Scenario 2: recursion with a guard.
/// `fact 0 -> 1`; `fact N:integer when N > 0 -> N * fact (N - 1)`.
/// `fact 5` -> `120`.
#[test]
fn scenario_recursion_with_guard() {
    let scope = Scope::root();
    let evaluator = Evaluator::with_standard_library(EvalConfig::default());
    twig::builtins::define_arithmetic(&scope, span());

    // fact 0 -> 1
    scope.define_rule(
        Tree::prefix(Tree::name("fact", span()), Tree::integer(0, span()), span()),
        Tree::integer(1, span()),
        span(),
    );

    // fact N:integer when N > 0 -> N * fact (N - 1)
    let n = Tree::name("N", span());
    let typed_n = Tree::infix(":", n.clone(), Tree::name("integer", span()), span());
    let guard = Tree::infix(">", n.clone(), Tree::integer(0, span()), span());
    let pattern = Tree::infix(
        "when",
        Tree::prefix(Tree::name("fact", span()), typed_n, span()),
        guard,
        span(),
    );
    let recurse_arg = twig::builtins::paren(
        Tree::infix("-", n.clone(), Tree::integer(1, span()), span()),
        span(),
    );
    let body = Tree::infix(
        "*",
        n,
        Tree::prefix(Tree::name("fact", span()), recurse_arg, span()),
        span(),
    );
    scope.define_rule(pattern, body, span());

    let expr = Tree::prefix(Tree::name("fact", span()), Tree::integer(5, span()), span());
    let (result, errors) = run(&scope, &evaluator, expr);

    assert_eq!(result, Tree::integer(120, span()));
    assert!(errors.is_empty());
}

/// Scenario 3: lambda application, no rules declared.
/// `(X -> X + 1) 41` -> `42`.
#[test]
fn scenario_lambda_application() {
    let scope = Scope::root();
    let evaluator = Evaluator::with_standard_library(EvalConfig::default());
    twig::builtins::define_arithmetic(&scope, span());

    let lambda = Tree::rule(
        Tree::name("X", span()),
        Tree::infix("+", Tree::name("X", span()), Tree::integer(1, span()), span()),
        span(),
    );
    // no parens here: the fast path in eval.rs only recognizes a lambda
    // literal when the callee *is* the `->` infix directly, not a block
    // wrapping one (a block wrapping a top-level `->` is instead hoisted
    // as a declaration by `preprocess`).
    let expr = Tree::prefix(lambda, Tree::integer(41, span()), span());

    let (result, errors) = run(&scope, &evaluator, expr);

    assert_eq!(result, Tree::integer(42, span()));
    assert!(errors.is_empty());
}

/// Scenario 4: non-linear patterns enforce equality.
/// `X + X -> 2 * X`; `2 * X:integer -> opcode Double`. `7 + 7` -> `14`;
/// `7 + 8` -> `7 + 8` (no match, returned unevaluated).
#[test]
fn scenario_non_linear_pattern() {
    let scope = Scope::root();
    let evaluator = Evaluator::with_standard_library(EvalConfig::default());

    // X + X -> 2 * X
    let x = Tree::name("X", span());
    scope.define_rule(
        Tree::infix("+", x.clone(), x.clone(), span()),
        Tree::infix("*", Tree::integer(2, span()), x.clone(), span()),
        span(),
    );

    // 2 * X:integer -> opcode Double: the literal 2 is matched, not
    // captured, so the opcode's sole positional argument is the bound,
    // type-checked X. (Typed so the binder forces X to an actual integer
    // before Double runs, rather than handing it an unforced closure.)
    let typed_x = Tree::infix(":", x, Tree::name("integer", span()), span());
    scope.define_rule(
        Tree::infix("*", Tree::integer(2, span()), typed_x, span()),
        twig::builtins::opcode_body("Double", span()),
        span(),
    );

    let matching = Tree::infix("+", Tree::integer(7, span()), Tree::integer(7, span()), span());
    let (result, errors) = run(&scope, &evaluator, matching);
    assert_eq!(result, Tree::integer(14, span()));
    assert!(errors.is_empty());

    let mismatching = Tree::infix("+", Tree::integer(7, span()), Tree::integer(8, span()), span());
    let (result, _errors) = run(&scope, &evaluator, mismatching.clone());
    assert_eq!(result, mismatching);
}

/// Scenario 5: type-shape check.
/// `pair X:integer Y:integer -> opcode MkPair`.
/// `pair 1 2 as type (pair integer integer)` -> the reconstructed pair;
/// `pair 1 "x" as type (pair integer integer)` -> type failure, original
/// value returned.
#[test]
fn scenario_type_shape_check() {
    let scope = Scope::root();
    let mut registry = twig::opcode::OpcodeRegistry::new();
    registry.register(Rc::new(MkPair));
    let evaluator = Evaluator::new(registry, twig::builtins::standard_types(), EvalConfig::default());

    // pair X:integer Y:integer -> opcode MkPair
    let xi = Tree::infix(":", Tree::name("X", span()), Tree::name("integer", span()), span());
    let yi = Tree::infix(":", Tree::name("Y", span()), Tree::name("integer", span()), span());
    let pattern = Tree::prefix(
        Tree::prefix(Tree::name("pair", span()), xi, span()),
        yi,
        span(),
    );
    scope.define_rule(pattern, twig::builtins::opcode_body("MkPair", span()), span());

    let shape = Tree::prefix(
        Tree::name("type", span()),
        twig::builtins::paren(
            Tree::prefix(
                Tree::prefix(Tree::name("pair", span()), Tree::name("integer", span()), span()),
                Tree::name("integer", span()),
                span(),
            ),
            span(),
        ),
        span(),
    );

    let good_pair = Tree::prefix(
        Tree::prefix(Tree::name("pair", span()), Tree::integer(1, span()), span()),
        Tree::integer(2, span()),
        span(),
    );
    let good_expr = Tree::infix("as", good_pair, shape.clone(), span());
    let (result, _errors) = run(&scope, &evaluator, good_expr);
    // per spec.md §4.5, the reconstructed value comes back wrapped in a
    // closure over the expansion scope.
    let (captured_scope, reconstructed) = twig::closure::unwrap_fully(result);
    assert!(captured_scope.is_some());
    assert_eq!(
        reconstructed,
        Tree::prefix(
            Tree::prefix(Tree::name("pair", span()), Tree::integer(1, span()), span()),
            Tree::integer(2, span()),
            span(),
        )
    );

    let bad_pair = Tree::prefix(
        Tree::prefix(Tree::name("pair", span()), Tree::integer(1, span()), span()),
        Tree::text("x", '"', '"', span()),
        span(),
    );
    let bad_expr = Tree::infix("as", bad_pair.clone(), shape, span());
    let (result, errors) = run(&scope, &evaluator, bad_expr);
    assert_eq!(result, bad_pair);
    assert!(!errors.is_empty());
}

#[derive(Debug)]
struct MkPair;
impl twig::opcode::Opcode for MkPair {
    fn op_id(&self) -> &str {
        "MkPair"
    }

    fn run(&self, frame: &twig::opcode::Frame) -> Option<Tree> {
        let x = frame.arg(0)?.clone();
        let y = frame.arg(1)?.clone();
        let span = frame.body().span().clone();
        Some(Tree::prefix(
            Tree::prefix(Tree::name("pair", span.clone()), x, span.clone()),
            y,
            span,
        ))
    }
}

/// Scenario 6: scoped reference. `M -> { x -> 10; y -> 20 }`.
/// `M.x` -> `10`; `M.y` -> `20`.
#[test]
fn scenario_scoped_reference() {
    let scope = Scope::root();
    let evaluator = Evaluator::with_standard_library(EvalConfig::default());

    let inner = Tree::infix(
        ";",
        Tree::rule(Tree::name("x", span()), Tree::integer(10, span()), span()),
        Tree::rule(Tree::name("y", span()), Tree::integer(20, span()), span()),
        span(),
    );
    let block = Tree::block(inner, Delim::Brace, span());
    scope.define_rule(Tree::name("M", span()), block, span());

    let get_x = Tree::infix(".", Tree::name("M", span()), Tree::name("x", span()), span());
    let (result, errors) = run(&scope, &evaluator, get_x);
    assert_eq!(result, Tree::integer(10, span()));
    assert!(errors.is_empty());

    let get_y = Tree::infix(".", Tree::name("M", span()), Tree::name("y", span()), span());
    let (result, errors) = run(&scope, &evaluator, get_y);
    assert_eq!(result, Tree::integer(20, span()));
    assert!(errors.is_empty());
}

/// Argument-evaluation-at-most-once: `twice X -> X + X`, opcode `counter`
/// increments a shared cell every call; `twice counter` must invoke it
/// exactly once.
#[test]
fn scenario_argument_evaluated_at_most_once() {
    use std::cell::Cell;

    thread_local! {
        static CALLS: Cell<u32> = Cell::new(0);
    }

    #[derive(Debug)]
    struct Counter;
    impl twig::opcode::Opcode for Counter {
        fn op_id(&self) -> &str {
            "Counter"
        }

        fn run(&self, frame: &twig::opcode::Frame) -> Option<Tree> {
            CALLS.with(|c| c.set(c.get() + 1));
            Some(Tree::integer(1, frame.body().span().clone()))
        }
    }

    let scope = Scope::root();
    let mut registry = twig::builtins::standard_opcodes();
    registry.register(Rc::new(Counter));
    let evaluator = Evaluator::new(registry, twig::builtins::standard_types(), EvalConfig::default());
    twig::builtins::define_arithmetic(&scope, span());

    // twice X -> X + X
    let x = Tree::name("X", span());
    scope.define_rule(
        Tree::prefix(Tree::name("twice", span()), x.clone(), span()),
        Tree::infix("+", x.clone(), x, span()),
        span(),
    );
    // counter -> opcode Counter
    scope.define_rule(Tree::name("counter", span()), twig::builtins::opcode_body("Counter", span()), span());

    let expr = Tree::prefix(Tree::name("twice", span()), Tree::name("counter", span()), span());
    let (result, errors) = run(&scope, &evaluator, expr);

    assert_eq!(result, Tree::integer(2, span()));
    assert!(errors.is_empty());
    CALLS.with(|c| assert_eq!(c.get(), 1));
}

/// A literal is a fixed point of evaluation when no rule overrides it.
#[test]
fn literal_is_a_fixed_point() {
    let scope = Scope::root();
    let evaluator = Evaluator::with_standard_library(EvalConfig::default());

    let value = Tree::integer(7, span());
    let (result, _errors) = run(&scope, &evaluator, value.clone());
    assert_eq!(result, value);
}

/// Declarations at the top level of a block are moved into the block's own
/// scope before any instruction in that block runs.
#[test]
fn declarations_move_to_block_scope_before_running() {
    let scope = Scope::root();
    let evaluator = Evaluator::with_standard_library(EvalConfig::default());

    let inner = Tree::infix(
        ";",
        Tree::rule(Tree::name("answer", span()), Tree::integer(42, span()), span()),
        Tree::name("answer", span()),
        span(),
    );
    let block = Tree::block(inner, Delim::Brace, span());

    let (result, errors) = run(&scope, &evaluator, block);
    assert_eq!(result, Tree::integer(42, span()));
    assert!(errors.is_empty());
    // the outer scope never saw the declaration.
    assert_eq!(scope.bound("answer"), None);
}

/// Deeply left-recursive rules trip the depth bound and surface the
/// evaluation-error sentinel rather than overflowing the host stack.
#[test]
fn depth_bound_triggers_on_runaway_recursion() {
    let scope = Scope::root();
    let evaluator = Evaluator::with_standard_library(EvalConfig { max_depth: 50, verbose: false });

    // loop -> loop + 1, forces an ever-deeper evaluation of its own argument
    // pattern since `+` requires both sides typed as integer.
    scope.define_rule(
        Tree::name("loop", span()),
        Tree::infix("+", Tree::name("loop", span()), Tree::integer(1, span()), span()),
        span(),
    );
    twig::builtins::define_arithmetic(&scope, span());

    let (result, errors) = run(&scope, &evaluator, Tree::name("loop", span()));
    assert!(is_evaluation_error(&result));
    assert!(!errors.is_empty());
}

/// Sanity check on the crate's own `Source`/`Span` plumbing, used for
/// non-empty spans in a would-be renderer.
#[test]
fn span_points_at_the_right_line() {
    let source = Rc::new(Source::source("one\ntwo\nthree"));
    let point = Span::point(&source, 4);
    assert_eq!(format!("{}", point), "./source:2");
}
