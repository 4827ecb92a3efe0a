//! # Twig
//!
//! Twig is a tree-walking evaluator for a small homoiconic, rewrite-rule
//! language: every program is a uniform eight-variant [`tree::Tree`], and
//! evaluation proceeds by repeatedly matching the tree under consideration
//! against rewrite rules declared in a chain of lexical [`scope::Scope`]s.
//! There are no statements distinct from expressions, no separate type
//! system phase, and no bytecode — the evaluator *is* the semantics.
//!
//! This crate is the core only: pattern-binding ([`binder`]), the
//! recursive rewrite loop ([`eval`]), closure capture across scopes
//! ([`closure`]), opcode dispatch ([`opcode`]), and the type-check/
//! type-shape mechanism ([`typecheck`]). Parsing source text into trees,
//! the garbage collector's safe-point protocol, error-message rendering,
//! and the opcode registry's *contents* beyond a small built-in set
//! ([`builtins`]) are an embedder's job; this crate exposes the narrow
//! seams they plug into ([`eval::SafePoint`], [`error::ErrorSink`],
//! [`opcode::OpcodeRegistry`]).
//!
//! ## Building trees without a parser
//!
//! No lexer or parser ships with this crate. Instead [`tree::Tree`] exposes
//! builder functions so embedders (and this crate's own tests) can build
//! programs directly:
//!
//! ```
//! use twig::source::Span;
//! use twig::scope::Scope;
//! use twig::eval::{EvalConfig, Evaluator, NullSafePoint};
//! use twig::error::ErrorSink;
//! use twig::tree::Tree;
//!
//! let scope = Scope::root();
//! let evaluator = Evaluator::with_standard_library(EvalConfig::default());
//! twig::builtins::define_arithmetic(&scope, Span::empty());
//!
//! // 2 + 3
//! let expr = Tree::infix("+", Tree::integer(2, Span::empty()), Tree::integer(3, Span::empty()), Span::empty());
//!
//! let mut errors = ErrorSink::new();
//! let result = evaluator.evaluate_top(&scope, expr, &mut errors, &NullSafePoint);
//! assert_eq!(result, Tree::integer(5, Span::empty()));
//! ```

pub mod binder;
pub mod builtins;
pub mod cache;
pub mod closure;
pub mod error;
pub mod eval;
pub mod opcode;
pub mod scope;
pub mod source;
pub mod tree;
pub mod typecheck;

pub use error::{Diagnostic, ErrorSink};
pub use eval::{define, evaluation_error, is_evaluation_error, EvalConfig, Evaluator, NullSafePoint, SafePoint};
pub use opcode::{Frame, Opcode, OpcodeRegistry};
pub use scope::{Context, Scope};
pub use source::{Source, Span, Spanned};
pub use tree::{Delim, Shape, Tree};
pub use typecheck::{TypeCheckOpcode, TypeRegistry};
