//! Key → position indexes over a node list, built on first lookup.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::OnceLock;

pub(crate) struct LazyIndex<K> {
    map: OnceLock<HashMap<K, usize>>,
}

impl<K> Default for LazyIndex<K> {
    fn default() -> LazyIndex<K> {
        LazyIndex { map: OnceLock::new() }
    }
}

impl<K: Hash + Eq> LazyIndex<K> {
    /// Looks `key` up, building the index from `keys` the first time. When
    /// keys repeat (enum value aliases) the first position wins.
    pub fn find<Q, I>(&self, key: &Q, keys: impl FnOnce() -> I) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        I: IntoIterator<Item = K>,
    {
        let map = self.map.get_or_init(|| {
            let mut map = HashMap::new();
            for (i, k) in keys().into_iter().enumerate() {
                map.entry(k).or_insert(i);
            }
            map
        });
        map.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_wins() {
        let index: LazyIndex<i32> = LazyIndex::default();
        let numbers = [0, 1, 1, 2];
        assert_eq!(index.find(&1, || numbers), Some(1));
        assert_eq!(index.find(&2, || -> [i32; 0] { unreachable!() }), Some(3));
        assert_eq!(index.find(&5, || -> [i32; 0] { unreachable!() }), None);
    }

    #[test]
    fn borrowed_keys() {
        let index: LazyIndex<String> = LazyIndex::default();
        let names = ["a", "b"];
        assert_eq!(index.find("b", || names.iter().map(|s| s.to_string())), Some(1));
    }
}
