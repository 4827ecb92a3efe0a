//! The per-rule-match-attempt evaluation cache: a map from sub-expression
//! identity to its already-reduced form, enforcing at-most-once evaluation
//! within one outer rule-match attempt (invariant 5). Grounded on the
//! fresh-`HashMap`-per-expansion shape of `Rule::bind`/`Rule::expand`'s
//! `Bindings`/`Mangles` maps in the teacher repo, keyed here by tree
//! pointer identity instead of by symbol.

use std::collections::HashMap;

use crate::tree::Tree;

#[derive(Default)]
pub struct EvaluationCache {
    entries: HashMap<usize, Tree>,
}

impl EvaluationCache {
    pub fn new() -> EvaluationCache {
        EvaluationCache { entries: HashMap::new() }
    }

    /// Returns the cached reduction of `key` if one exists.
    pub fn get(&self, key: &Tree) -> Option<Tree> {
        self.entries.get(&key.identity()).cloned()
    }

    pub fn insert(&mut self, key: &Tree, value: Tree) {
        self.entries.insert(key.identity(), value);
    }

    /// Looks up `key`; on a miss, evaluates it with `reduce` and stores the
    /// result before returning it.
    pub fn get_or_insert_with(&mut self, key: &Tree, reduce: impl FnOnce() -> Tree) -> Tree {
        if let Some(hit) = self.get(key) {
            return hit;
        }
        let reduced = reduce();
        self.insert(key, reduced.clone());
        reduced
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::Span;

    #[test]
    fn miss_returns_none() {
        let cache = EvaluationCache::new();
        let key = Tree::name("x", Span::empty());
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn insert_then_get_hits_on_the_same_tree() {
        let mut cache = EvaluationCache::new();
        let key = Tree::name("x", Span::empty());
        let value = Tree::integer(10, Span::empty());
        cache.insert(&key, value.clone());
        assert_eq!(cache.get(&key), Some(value));
    }

    #[test]
    fn structurally_equal_but_distinct_trees_do_not_share_a_cache_entry() {
        let mut cache = EvaluationCache::new();
        let a = Tree::name("x", Span::empty());
        let b = Tree::name("x", Span::empty());
        cache.insert(&a, Tree::integer(1, Span::empty()));
        assert_eq!(cache.get(&b), None);
    }

    #[test]
    fn get_or_insert_with_only_reduces_once() {
        let mut cache = EvaluationCache::new();
        let key = Tree::name("x", Span::empty());
        let mut calls = 0;

        let first = cache.get_or_insert_with(&key, || {
            calls += 1;
            Tree::integer(7, Span::empty())
        });
        let second = cache.get_or_insert_with(&key, || {
            calls += 1;
            Tree::integer(99, Span::empty())
        });

        assert_eq!(first, Tree::integer(7, Span::empty()));
        assert_eq!(second, Tree::integer(7, Span::empty()));
        assert_eq!(calls, 1);
    }
}
