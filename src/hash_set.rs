use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::hash_table::HashPolicy;
use crate::hash_table::HashTable;
use crate::hash_table::ProbeStats;
use crate::hash_table::TableError;
use crate::hash_table::alloc_failed;

/// A set over the quadratic-probing [`HashTable`].
///
/// `HashSet<T, S>` stores values implementing `Hash + Eq` and uses a
/// configurable hasher builder `S`. It instantiates the table with `()`
/// values, so only the elements themselves occupy slot storage.
#[derive(Clone)]
pub struct HashSet<T, S> {
    table: HashTable<T, (), HashPolicy<S>>,
}

impl<T, S> PartialEq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S> Eq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S> Debug for HashSet<T, S>
where
    T: Debug + Hash + Eq,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> Default for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates an empty set. Allocates nothing until the first insertion.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "foldhash")]
    /// # {
    /// use quad_hash::HashSet;
    /// use quad_hash::hash_map::DefaultHashBuilder;
    ///
    /// let set: HashSet<u64, DefaultHashBuilder> = HashSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty set that can hold `capacity` elements without
    /// rehashing.
    ///
    /// # Panics
    ///
    /// Panics if the allocation fails.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates an empty set with the given hasher builder.
    pub const fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::with_policy(HashPolicy::new(hash_builder)),
        }
    }

    /// Creates an empty set with the given hasher builder that can hold
    /// `capacity` elements without rehashing.
    ///
    /// # Panics
    ///
    /// Panics if the allocation fails.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let mut set = Self::with_hasher(hash_builder);
        if set.table.reserve(capacity).is_err() {
            alloc_failed();
        }
        set
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set holds no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of elements the set can hold before rehashing.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the hasher builder.
    pub fn hasher(&self) -> &S {
        self.table.policy().hasher()
    }

    /// Removes all elements while keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Ensures the set can hold `additional` more elements without
    /// rehashing.
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

    /// Adds a value, returning `true` if it was not already present.
    ///
    /// An already-present value is left untouched; the new one is dropped.
    ///
    /// # Panics
    ///
    /// Panics if growing the set fails to allocate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "foldhash")]
    /// # {
    /// use quad_hash::HashSet;
    /// use quad_hash::hash_map::DefaultHashBuilder;
    ///
    /// let mut set: HashSet<u64, DefaultHashBuilder> = HashSet::new();
    /// assert!(set.insert(7));
    /// assert!(!set.insert(7));
    /// assert!(set.contains(&7));
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        match self.try_insert(value) {
            Ok(fresh) => fresh,
            Err(_) => alloc_failed(),
        }
    }

    /// Fallible version of [`insert`](Self::insert).
    pub fn try_insert(&mut self, value: T) -> Result<bool, TableError> {
        Ok(self.table.insert(value, ())?.is_new())
    }

    /// Returns `true` if the value is present.
    pub fn contains(&self, value: &T) -> bool {
        self.table.contains(value)
    }

    /// Returns a reference to the stored value equal to the given one.
    pub fn get(&self, value: &T) -> Option<&T> {
        let index = self.table.find(value)?;
        self.table.key_at(index)
    }

    /// Removes a value, returning `true` if it was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Removes a value, returning the stored one.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let index = self.table.find(value)?;
        self.table.remove(index).map(|(stored, ())| stored)
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> Iter<'_, T, S> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Computes probe-sequence statistics for the underlying table.
    pub fn probe_stats(&self) -> ProbeStats {
        self.table.probe_stats()
    }
}

/// An iterator over the elements of a [`HashSet`].
pub struct Iter<'a, T, S> {
    inner: crate::hash_table::Iter<'a, T, (), HashPolicy<S>>,
}

impl<'a, T, S> Iterator for Iter<'a, T, S> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(value, _)| value)
    }
}

impl<T, S> Extend<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::with_hasher(S::default());
        set.extend(iter);
        set
    }
}
