use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::hash_table::HashPolicy;
use crate::hash_table::HashTable;
use crate::hash_table::Insert;
use crate::hash_table::ProbeStats;
use crate::hash_table::TableError;
use crate::hash_table::alloc_failed;

/// The default hasher builder, backed by `foldhash`.
#[cfg(feature = "foldhash")]
pub type DefaultHashBuilder = foldhash::fast::RandomState;

/// A key-value map over the quadratic-probing [`HashTable`].
///
/// `HashMap<K, V, S>` stores pairs where keys implement `Hash + Eq` and uses
/// a configurable hasher builder `S`. It layers the conventional replacing
/// `insert` on top of the table's non-clobbering one, and panics on
/// allocation failure; the `try_` variants propagate [`TableError`] instead.
#[derive(Clone)]
pub struct HashMap<K, V, S> {
    table: HashTable<K, V, HashPolicy<S>>,
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug + Hash + Eq,
    V: Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates an empty map. Allocates nothing until the first insertion.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "foldhash")]
    /// # {
    /// use quad_hash::HashMap;
    /// use quad_hash::hash_map::DefaultHashBuilder;
    ///
    /// let map: HashMap<u64, u64, DefaultHashBuilder> = HashMap::new();
    /// assert!(map.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty map that can hold `capacity` entries without
    /// rehashing.
    ///
    /// # Panics
    ///
    /// Panics if the allocation fails.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use quad_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut map = HashMap::with_hasher(SimpleHasher);
    /// map.insert("key", "value");
    /// assert_eq!(map.get(&"key"), Some(&"value"));
    /// ```
    pub const fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::with_policy(HashPolicy::new(hash_builder)),
        }
    }

    /// Creates an empty map with the given hasher builder that can hold
    /// `capacity` entries without rehashing.
    ///
    /// # Panics
    ///
    /// Panics if the allocation fails.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let mut map = Self::with_hasher(hash_builder);
        if map.table.reserve(capacity).is_err() {
            alloc_failed();
        }
        map
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of entries the map can hold before rehashing.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the hasher builder.
    pub fn hasher(&self) -> &S {
        self.table.policy().hasher()
    }

    /// Removes all entries while keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Ensures the map can hold `additional` more entries without rehashing.
    ///
    /// # Panics
    ///
    /// Panics if the allocation fails.
    pub fn reserve(&mut self, additional: usize) {
        if self.table.reserve(additional).is_err() {
            alloc_failed();
        }
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TableError> {
        self.table.reserve(additional)
    }

    /// Inserts a key-value pair, returning the previous value if the key was
    /// already present.
    ///
    /// # Panics
    ///
    /// Panics if growing the map fails to allocate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "foldhash")]
    /// # {
    /// use quad_hash::HashMap;
    /// use quad_hash::hash_map::DefaultHashBuilder;
    ///
    /// let mut map: HashMap<u64, &str, DefaultHashBuilder> = HashMap::new();
    /// assert_eq!(map.insert(1, "one"), None);
    /// assert_eq!(map.insert(1, "uno"), Some("one"));
    /// assert_eq!(map.get(&1), Some(&"uno"));
    /// # }
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(previous) => previous,
            Err(_) => alloc_failed(),
        }
    }

    /// Fallible version of [`insert`](Self::insert).
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        match self.table.insert(key, value)? {
            Insert::Fresh(_) | Insert::Revived(_) => Ok(None),
            Insert::Existing { index, value, .. } => Ok(self.table.replace_value(index, value)),
        }
    }

    /// Returns a reference to the value for a key.
    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.table.find(key)?;
        self.table.value_at(index)
    }

    /// Returns a mutable reference to the value for a key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.table.find(key)?;
        self.table.value_at_mut(index)
    }

    /// Returns the stored key-value pair for a key.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let index = self.table.find(key)?;
        self.table.entry_at(index)
    }

    /// Returns `true` if the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.contains(key)
    }

    /// Removes a key, returning its value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "foldhash")]
    /// # {
    /// use quad_hash::HashMap;
    /// use quad_hash::hash_map::DefaultHashBuilder;
    ///
    /// let mut map: HashMap<u64, &str, DefaultHashBuilder> = HashMap::new();
    /// map.insert(1, "one");
    /// assert_eq!(map.remove(&1), Some("one"));
    /// assert_eq!(map.remove(&1), None);
    /// # }
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key, returning the stored key-value pair.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let index = self.table.find(key)?;
        self.table.remove(index)
    }

    /// Returns an iterator over the entries.
    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<'_, K, V, S> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> Values<'_, K, V, S> {
        Values { inner: self.iter() }
    }

    /// Computes probe-sequence statistics for the underlying table.
    pub fn probe_stats(&self) -> ProbeStats {
        self.table.probe_stats()
    }
}

/// An iterator over the entries of a [`HashMap`].
pub struct Iter<'a, K, V, S> {
    inner: crate::hash_table::Iter<'a, K, V, HashPolicy<S>>,
}

impl<'a, K, V, S> Iterator for Iter<'a, K, V, S> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// An iterator over the keys of a [`HashMap`].
pub struct Keys<'a, K, V, S> {
    inner: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Iterator for Keys<'a, K, V, S> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

/// An iterator over the values of a [`HashMap`].
pub struct Values<'a, K, V, S> {
    inner: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Iterator for Values<'a, K, V, S> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone)]
    struct SipHashBuilder {
        k0: u64,
        k1: u64,
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    fn map<K: Hash + Eq, V>() -> HashMap<K, V, SipHashBuilder> {
        HashMap::new()
    }

    #[test]
    fn insert_get_remove() {
        let mut map = map();
        assert_eq!(map.insert(5u64, 10u64), None);
        assert_eq!(map.get(&5), Some(&10));
        assert_eq!(map.get(&123), None);
        assert!(map.contains_key(&5));

        assert_eq!(map.insert(5, 20), Some(10));
        assert_eq!(map.get(&5), Some(&20));
        assert_eq!(map.len(), 1);

        assert_eq!(map.remove(&5), Some(20));
        assert_eq!(map.remove(&5), None);
        assert!(map.is_empty());
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut map = map();
        map.insert("counter".to_string(), 0u64);
        *map.get_mut(&"counter".to_string()).unwrap() += 5;
        assert_eq!(map.get(&"counter".to_string()), Some(&5));
        assert_eq!(map.get_mut(&"missing".to_string()), None);
    }

    #[test]
    fn remove_entry_returns_stored_key() {
        let mut map = map();
        map.insert("key".to_string(), 1u64);
        assert_eq!(map.remove_entry(&"key".to_string()), Some(("key".to_string(), 1)));
        assert_eq!(map.remove_entry(&"key".to_string()), None);
    }

    #[test]
    fn many_entries_survive_growth() {
        let mut map = map();
        for i in 0..1000u64 {
            map.insert(i, i * 10);
        }
        assert_eq!(map.len(), 1000);
        for i in 0..1000u64 {
            assert_eq!(map.get(&i), Some(&(i * 10)));
        }
    }

    #[test]
    fn with_capacity_does_not_rehash_early() {
        let mut map: HashMap<u64, u64, SipHashBuilder> =
            HashMap::with_capacity_and_hasher(100, SipHashBuilder::default());
        assert!(map.capacity() >= 100);
        for i in 0..100u64 {
            map.insert(i, i);
        }
        assert_eq!(map.len(), 100);
    }

    #[test]
    fn iterators_cover_all_entries() {
        let mut map = map();
        for i in 0..100u64 {
            map.insert(i, i * 2);
        }

        let mut pairs: Vec<(u64, u64)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        pairs.sort_unstable();
        assert_eq!(pairs.len(), 100);
        for (i, (k, v)) in pairs.into_iter().enumerate() {
            assert_eq!(k, i as u64);
            assert_eq!(v, k * 2);
        }

        let key_sum: u64 = map.keys().sum();
        let value_sum: u64 = map.values().sum();
        assert_eq!(key_sum, 4950);
        assert_eq!(value_sum, 9900);
    }

    #[test]
    fn clear_empties_the_map() {
        let mut map = map();
        for i in 0..50u64 {
            map.insert(i, i.to_string());
        }
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.get(&7), None);
        map.insert(7, "again".to_string());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn extend_and_from_iterator() {
        let map: HashMap<u64, u64, SipHashBuilder> = (0..100u64).map(|i| (i, i + 1)).collect();
        assert_eq!(map.len(), 100);
        assert_eq!(map.get(&42), Some(&43));

        let mut map = map;
        map.extend((100..200u64).map(|i| (i, i + 1)));
        assert_eq!(map.len(), 200);
        assert_eq!(map.get(&150), Some(&151));
    }

    #[test]
    fn clone_is_independent() {
        let mut map = map();
        for i in 0..100u64 {
            map.insert(i, i.to_string());
        }
        let snapshot = map.clone();
        map.clear();
        assert_eq!(snapshot.len(), 100);
        assert_eq!(snapshot.get(&99), Some(&"99".to_string()));
    }

    #[test]
    fn debug_formats_as_map() {
        let mut map: HashMap<u64, u64, SipHashBuilder> = map();
        map.insert(1, 2);
        let formatted = alloc::format!("{map:?}");
        assert_eq!(formatted, "{1: 2}");
    }

    #[test]
    fn string_keys_and_values() {
        let mut map = map();
        for i in 0..100 {
            map.insert(i.to_string(), alloc::vec![i; 4]);
        }
        for i in 0..100 {
            assert_eq!(map.get(&i.to_string()).map(Vec::len), Some(4));
        }
        for i in (0..100).step_by(3) {
            assert!(map.remove(&i.to_string()).is_some());
        }
        assert_eq!(map.len(), 100 - 34);
    }

    #[test]
    fn probe_stats_are_exposed() {
        let mut map = map();
        for i in 0..1000u64 {
            map.insert(i, i);
        }
        let stats = map.probe_stats();
        assert!(stats.max_probes >= 1);
        assert!(stats.avg_probes >= 1.0);
    }

    #[test]
    fn try_insert_reports_success() {
        let mut map = map();
        assert_eq!(map.try_insert(1u64, 1u64), Ok(None));
        assert_eq!(map.try_insert(1, 2), Ok(Some(1)));
        assert_eq!(map.get(&1), Some(&2));
    }

    #[cfg(feature = "foldhash")]
    #[test]
    fn default_hasher_builder_works() {
        let mut map: HashMap<u64, u64, DefaultHashBuilder> = HashMap::new();
        map.insert(1, 2);
        assert_eq!(map.get(&1), Some(&2));
    }
}
