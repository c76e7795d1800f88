//! fieldmap is the map of key, value pairs that sits inside each
//! `metric::FieldRecord`. Think of it as a specialized hashmap. Unlike a
//! hashmap, iteration follows insertion order so that encoders which turn
//! fields into tags produce the same line every time.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::hash::Hash;
use std::slice::Iter;

/// The fieldmap key, value collection. Behaves similarly to
/// `std::collections::HashMap` but with a specialized implementation for fast
/// searching over a small collection. Keys are unique; the position of a key
/// is fixed by its first insertion.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMap<K, V>
where
    K: Hash,
{
    inner: Vec<(K, V)>,
}

impl<K, V> FieldMap<K, V>
where
    K: Eq + Hash,
{
    /// Create a `fieldmap::Iter`.
    pub fn iter(&self) -> Iter<(K, V)> {
        self.inner.iter()
    }

    fn position<Q: ?Sized>(&self, key: &Q) -> Option<usize>
    where
        K: ::std::borrow::Borrow<Q>,
        Q: Eq,
    {
        self.inner.iter().position(|&(ref k, _)| k.borrow() == key)
    }

    /// Get a value from the fieldmap, if it exists.
    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
    where
        K: ::std::borrow::Borrow<Q>,
        Q: Eq,
    {
        self.position(key).map(|idx| &self.inner[idx].1)
    }

    /// Determine if the fieldmap is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Merge two fieldmaps
    ///
    /// This method will insert the key / values of `other` whose keys do not
    /// already exist in self. Existing values are never overwritten. This is
    /// the information-preserving partner to `insert`.
    pub fn merge(&mut self, other: &FieldMap<K, V>)
    where
        K: Clone,
        V: Clone,
    {
        for &(ref key, ref val) in &other.inner {
            self.insert_if_missing(key.clone(), val.clone());
        }
    }

    /// Insert a key / value into self if and only if the key is absent.
    ///
    /// Returns true if the value was inserted.
    pub fn insert_if_missing(&mut self, key: K, val: V) -> bool {
        if self.position(&key).is_some() {
            false
        } else {
            self.inner.push((key, val));
            true
        }
    }

    /// Insert a key / value into self
    ///
    /// This method will return the value previously stored under the given key,
    /// if there was such a value. A replaced key keeps its original position.
    pub fn insert(&mut self, key: K, val: V) -> Option<V> {
        match self.position(&key) {
            Some(idx) => Some(::std::mem::replace(&mut self.inner[idx].1, val)),
            None => {
                self.inner.push((key, val));
                None
            }
        }
    }

    /// Return the length of the fieldmap. This is the total number of key /
    /// values stored in the map.
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> Default for FieldMap<K, V>
where
    K: Hash,
{
    fn default() -> FieldMap<K, V> {
        FieldMap {
            inner: Vec::with_capacity(8),
        }
    }
}

impl<K, V> Serialize for FieldMap<K, V>
where
    K: Hash + Serialize,
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.inner.len()))?;
        for &(ref k, ref v) in &self.inner {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::{QuickCheck, TestResult};

    #[test]
    fn insertion_order_is_iteration_order() {
        let mut map: FieldMap<String, u8> = FieldMap::default();
        map.insert("zeta".into(), 0);
        map.insert("alpha".into(), 1);
        map.insert("mu".into(), 2);

        let keys: Vec<&str> = map.iter().map(|&(ref k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mu"]);
    }

    #[test]
    fn replacing_insert_keeps_position() {
        let mut map: FieldMap<String, u8> = FieldMap::default();
        map.insert("a".into(), 0);
        map.insert("b".into(), 1);
        assert_eq!(Some(0), map.insert("a".into(), 10));

        let pairs: Vec<(String, u8)> = map.iter().cloned().collect();
        assert_eq!(pairs, vec![("a".to_string(), 10), ("b".to_string(), 1)]);
    }

    #[test]
    fn insert_if_missing_never_overwrites() {
        let mut map: FieldMap<String, u8> = FieldMap::default();
        assert!(map.insert_if_missing("a".into(), 0));
        assert!(!map.insert_if_missing("a".into(), 1));
        assert_eq!(Some(&0), map.get("a"));
    }

    #[test]
    fn keys_are_unique() {
        fn inner(pairs: Vec<(String, u8)>) -> TestResult {
            let mut map: FieldMap<String, u8> = FieldMap::default();
            for &(ref k, v) in &pairs {
                map.insert(k.clone(), v);
            }
            let mut seen = Vec::new();
            for &(ref k, _) in map.iter() {
                if seen.contains(k) {
                    return TestResult::failed();
                }
                seen.push(k.clone());
            }
            // last write wins
            for &(ref k, _) in &pairs {
                let last = pairs.iter().rev().find(|&&(ref pk, _)| pk == k).map(|p| p.1);
                if map.get(k).cloned() != last {
                    return TestResult::failed();
                }
            }
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(1000)
            .max_tests(10000)
            .quickcheck(inner as fn(Vec<(String, u8)>) -> TestResult);
    }
}
