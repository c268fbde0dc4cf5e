//! Keyed dependency index with a ready queue.
//!
//! [`DepIndex`] tracks which items wait on which prerequisites and releases
//! an item once every prerequisite it declared has been popped. Edges may
//! reference prerequisites that have not been registered yet; the edge
//! connects when the prerequisite is later `put`. The executor keys this
//! structure by `(job id, phase)` pairs, but the index itself is generic
//! over any keyed item.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use crate::error::OpError;

/// Forward/reverse dependency graph plus a FIFO ready queue.
///
/// `F` extracts the key under which an item is registered. Items are
/// released in the order they become ready: items put with no outstanding
/// prerequisites enqueue immediately, the rest enqueue the moment their
/// last prerequisite is popped.
#[derive(Debug)]
pub struct DepIndex<K, T, F>
where
    K: Eq + Hash + Clone,
    T: Clone,
    F: Fn(&T) -> K,
{
    key_of: F,
    /// Registered items that have not been popped yet.
    values: HashMap<K, T>,
    /// Unresolved prerequisites per item.
    forward: HashMap<K, Vec<K>>,
    /// Full prerequisite list per item, in declaration order.
    declared: HashMap<K, Vec<K>>,
    /// Items waiting on a key.
    reverse: HashMap<K, Vec<K>>,
    /// Items already popped, kept so dependents can read them. Cleared for
    /// a key when that key is put again.
    resolved: HashMap<K, T>,
    ready: VecDeque<K>,
}

impl<K, T, F> DepIndex<K, T, F>
where
    K: Eq + Hash + Clone,
    T: Clone,
    F: Fn(&T) -> K,
{
    /// Creates an empty index with the given key extractor.
    pub fn new(key_of: F) -> Self {
        Self {
            key_of,
            values: HashMap::new(),
            forward: HashMap::new(),
            declared: HashMap::new(),
            reverse: HashMap::new(),
            resolved: HashMap::new(),
            ready: VecDeque::new(),
        }
    }

    /// Registers `item` with zero or more prerequisite keys.
    ///
    /// Prerequisites that were already popped count as satisfied.
    /// Re-putting a previously popped key starts it fresh.
    pub fn put(&mut self, item: T, deps: Vec<K>) {
        let key = (self.key_of)(&item);
        self.resolved.remove(&key);

        let mut outstanding = Vec::new();
        for dep in &deps {
            if self.resolved.contains_key(dep) || outstanding.contains(dep) {
                continue;
            }
            outstanding.push(dep.clone());
            let waiters = self.reverse.entry(dep.clone()).or_default();
            if !waiters.contains(&key) {
                waiters.push(key.clone());
            }
        }

        self.declared.insert(key.clone(), deps);
        self.values.insert(key.clone(), item);
        if outstanding.is_empty() {
            self.ready.push_back(key);
        } else {
            self.forward.insert(key, outstanding);
        }
    }

    /// Dequeues the next ready item together with the resolved items of its
    /// declared prerequisites, in declaration order.
    ///
    /// Popping an item resolves it: waiters whose last unresolved
    /// prerequisite it was become ready, in the order they are released.
    pub fn pop(&mut self) -> Result<(T, Vec<T>), OpError> {
        let key = self.ready.pop_front().ok_or(OpError::QueueEmpty)?;
        let item = self
            .values
            .remove(&key)
            .expect("ready queue out of sync with value store");

        let declared = self.declared.remove(&key).unwrap_or_default();
        let dep_items = declared
            .iter()
            .map(|dep| {
                self.resolved
                    .get(dep)
                    .cloned()
                    .expect("popped item had an unresolved prerequisite")
            })
            .collect();

        self.resolved.insert(key.clone(), item.clone());
        for waiter in self.reverse.remove(&key).unwrap_or_default() {
            if let Some(outstanding) = self.forward.get_mut(&waiter) {
                outstanding.retain(|dep| *dep != key);
                if outstanding.is_empty() {
                    self.forward.remove(&waiter);
                    self.ready.push_back(waiter);
                }
            }
        }

        Ok((item, dep_items))
    }

    /// Dequeues the next ready item, or `None` if nothing is ready.
    pub fn try_pop(&mut self) -> Option<(T, Vec<T>)> {
        self.pop().ok()
    }

    /// Number of items currently ready.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Number of registered items that have not been popped yet.
    pub fn pending_len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing is ready to pop.
    pub fn is_idle(&self) -> bool {
        self.ready.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> DepIndex<char, char, impl Fn(&char) -> char> {
        DepIndex::new(|c: &char| *c)
    }

    #[test]
    fn test_pop_fails_when_nothing_is_ready() {
        let mut deps = index();
        assert!(matches!(deps.pop(), Err(OpError::QueueEmpty)));

        deps.put('a', vec!['b']);
        // 'a' waits on an unregistered prerequisite, 'b' is not ready yet.
        assert!(matches!(deps.pop(), Err(OpError::QueueEmpty)));
    }

    #[test]
    fn test_put_with_no_deps_is_ready_immediately() {
        let mut deps = index();
        deps.put('a', vec![]);
        assert_eq!(deps.ready_len(), 1);
        let (item, dep_items) = deps.pop().unwrap();
        assert_eq!(item, 'a');
        assert!(dep_items.is_empty());
    }

    #[test]
    fn test_release_order_and_dependency_items() {
        let mut deps = index();
        deps.put('a', vec!['b', 'c', 'd', 'e']);
        deps.put('e', vec!['f']);
        assert!(deps.is_idle());

        deps.put('b', vec![]);
        deps.put('c', vec![]);
        deps.put('d', vec![]);

        assert_eq!(deps.pop().unwrap(), ('b', vec![]));
        assert_eq!(deps.pop().unwrap(), ('c', vec![]));
        assert_eq!(deps.pop().unwrap(), ('d', vec![]));
        assert!(deps.is_idle());

        deps.put('f', vec![]);
        assert_eq!(deps.pop().unwrap(), ('f', vec![]));
        assert_eq!(deps.pop().unwrap(), ('e', vec!['f']));
        assert_eq!(deps.pop().unwrap(), ('a', vec!['b', 'c', 'd', 'e']));
        assert_eq!(deps.pending_len(), 0);
    }

    #[test]
    fn test_repput_after_pop_starts_fresh() {
        let mut deps = index();
        deps.put('a', vec![]);
        assert_eq!(deps.pop().unwrap(), ('a', vec![]));

        deps.put('a', vec![]);
        assert_eq!(deps.pop().unwrap(), ('a', vec![]));
    }

    #[test]
    fn test_prerequisite_resolved_before_dependent_is_put() {
        let mut deps = index();
        deps.put('b', vec![]);
        deps.pop().unwrap();

        // 'b' was already popped, so the edge counts as satisfied and 'a'
        // still receives the resolved item.
        deps.put('a', vec!['b']);
        assert_eq!(deps.pop().unwrap(), ('a', vec!['b']));
    }

    #[test]
    fn test_duplicate_declared_prerequisites() {
        let mut deps = index();
        deps.put('a', vec!['b', 'b']);
        deps.put('b', vec![]);
        assert_eq!(deps.pop().unwrap(), ('b', vec![]));
        assert_eq!(deps.pop().unwrap(), ('a', vec!['b', 'b']));
    }

    #[test]
    fn test_stalled_graph_stays_idle() {
        let mut deps = index();
        deps.put('a', vec!['b']);
        deps.put('b', vec!['a']);
        assert!(deps.is_idle());
        assert_eq!(deps.pending_len(), 2);
    }
}
