//! Scopes form a chain of rewrite-rule tables, navigated innermost-first.
//! Grounded on `construct::scope::Scope`'s parent-chain shape in the teacher
//! repo, generalized from "compiled locals only" to a general ordered rule
//! table per the core spec.

use std::cell::RefCell;
use std::rc::Rc;

use crate::tree::Tree;

struct ScopeData {
    parent: Option<Scope>,
    rules: RefCell<Vec<Tree>>,
}

/// An ordered rule table plus a parent link. Scopes are reference-counted
/// and shared: cloning a `Scope` is cheap and every clone sees the same
/// (append-only) rule table.
#[derive(Clone)]
pub struct Scope(Rc<ScopeData>);

impl Scope {
    pub fn root() -> Scope {
        Scope(Rc::new(ScopeData { parent: None, rules: RefCell::new(Vec::new()) }))
    }

    /// `push_scope(parent) -> scope`: an empty child scope.
    pub fn child(parent: &Scope) -> Scope {
        Scope(Rc::new(ScopeData { parent: Some(parent.clone()), rules: RefCell::new(Vec::new()) }))
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.rules.borrow().is_empty()
    }

    /// `define(scope, pattern, body)`: installs `Infix("->", pattern, body)`
    /// at the end of the rule table. A plain name binding (a pattern
    /// variable captured during a match) is installed the same way, with
    /// `pattern` a bare `Name` — a binding *is* a rule, per invariant 6
    /// ("a rule's pattern and body are both owned by the rule's declaring
    /// scope").
    pub fn define(&self, rule: Tree) {
        debug_assert!(rule.as_rule().is_some(), "define() requires an Infix(\"->\", ...) rule");
        self.0.rules.borrow_mut().push(rule);
    }

    pub fn define_rule(&self, pattern: Tree, body: Tree, span: crate::source::Span) {
        self.define(Tree::rule(pattern, body, span));
    }

    /// Iterates rules visible from `scope`, innermost first, within-scope
    /// in declaration order (earlier declarations shadow later ones),
    /// handing each candidate to `callback`. The first non-`None` result
    /// the callback produces becomes the lookup's result.
    pub fn lookup<T>(
        &self,
        mut callback: impl FnMut(&Scope, &Tree) -> Option<T>,
    ) -> Option<T> {
        let mut scope = self.clone();
        loop {
            for rule in scope.0.rules.borrow().iter() {
                if let Some(result) = callback(&scope, rule) {
                    return Some(result);
                }
            }
            match scope.parent().cloned() {
                Some(next) => scope = next,
                None => return None,
            }
        }
    }

    /// `bound(scope, name)`: a cheap direct lookup of a name binding,
    /// walking up the chain and returning the first (innermost, earliest
    /// declared) rule whose pattern is exactly that bare name.
    pub fn bound(&self, name: &str) -> Option<Tree> {
        self.lookup(|_scope, rule| match rule.as_rule() {
            Some((pattern, body)) if pattern.is_name(name) => Some(body.clone()),
            _ => None,
        })
    }

    /// Like `bound`, but consults only this scope's own rule table, never a
    /// parent. Used by the pattern binder's non-linear-name check: a match's
    /// local scope is itself a child of the declaring scope, so a plain
    /// `bound` lookup would see bindings left over from *previous* matches
    /// (or plain rule declarations) in that ancestry and wrongly treat a
    /// first-time capture as a repeat occurrence.
    pub fn bound_local(&self, name: &str) -> Option<Tree> {
        self.0.rules.borrow().iter().find_map(|rule| match rule.as_rule() {
            Some((pattern, body)) if pattern.is_name(name) => Some(body.clone()),
            _ => None,
        })
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Scope {}

/// A handle on a current scope: it can push a child scope and jump to an
/// arbitrary (e.g. captured) scope, without affecting other contexts that
/// share the same underlying scope chain.
#[derive(Clone, PartialEq, Eq)]
pub struct Context {
    current: Scope,
}

impl Context {
    pub fn new(scope: Scope) -> Context {
        Context { current: scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.current
    }

    /// Pushes a new empty child scope and makes it current.
    pub fn push_scope(&mut self) -> Scope {
        let child = Scope::child(&self.current);
        self.current = child.clone();
        child
    }

    /// Pops back to the given scope (typically this context's scope before
    /// a matching `push_scope`).
    pub fn pop_to(&mut self, scope: Scope) {
        self.current = scope;
    }

    /// Jumps to an arbitrary scope (e.g. a closure's captured scope, or the
    /// target of a `.` scoped reference). Not necessarily a child of the
    /// current scope.
    pub fn enter(&mut self, scope: Scope) {
        self.current = scope;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::Span;

    fn name_rule(name: &str, value: i64) -> Tree {
        Tree::rule(Tree::name(name, Span::empty()), Tree::integer(value, Span::empty()), Span::empty())
    }

    #[test]
    fn earlier_declarations_shadow_later_ones() {
        let scope = Scope::root();
        scope.define(name_rule("x", 1));
        scope.define(name_rule("x", 2));

        let mut seen = vec![];
        scope.lookup(|_, rule| {
            seen.push(rule.clone());
            None::<()>
        });

        assert_eq!(seen.len(), 2);
        assert_eq!(scope.bound("x"), Some(Tree::integer(1, Span::empty())));
    }

    #[test]
    fn innermost_scope_wins_across_chain() {
        let outer = Scope::root();
        outer.define(name_rule("x", 1));
        let inner = Scope::child(&outer);
        inner.define(name_rule("x", 2));

        assert_eq!(inner.bound("x"), Some(Tree::integer(2, Span::empty())));
        assert_eq!(outer.bound("x"), Some(Tree::integer(1, Span::empty())));
    }

    #[test]
    fn lookup_walks_up_to_parent_when_child_has_no_match() {
        let outer = Scope::root();
        outer.define(name_rule("y", 42));
        let inner = Scope::child(&outer);

        assert_eq!(inner.bound("y"), Some(Tree::integer(42, Span::empty())));
    }

    #[test]
    fn child_is_empty_until_defined() {
        let parent = Scope::root();
        let child = Scope::child(&parent);
        assert!(child.is_empty());
        child.define(name_rule("z", 0));
        assert!(!child.is_empty());
    }

    #[test]
    fn scope_parent_never_changes() {
        let parent = Scope::root();
        let child = Scope::child(&parent);
        assert!(child.parent().is_some());
        assert_eq!(child.parent(), Some(&parent));
    }
}
