use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::mem::MaybeUninit;

/// Upper bound of the fill factor before an insert triggers maintenance.
const LOAD_FACTOR: f64 = 0.77;

/// Smallest non-zero bucket count. Growth always produces powers of two so
/// the probe sequence retains its full-cycle property.
const MIN_BUCKETS: usize = 4;

/// Packed flag word with every 2-bit slot field set to `empty`.
const ALL_EMPTY: u32 = 0xAAAA_AAAA;

#[inline(always)]
fn growth_threshold(buckets: usize) -> usize {
    (buckets as f64 * LOAD_FACTOR + 0.5) as usize
}

#[inline(always)]
fn round_buckets(requested: usize) -> usize {
    requested.next_power_of_two().max(MIN_BUCKETS)
}

#[cold]
#[inline(never)]
pub(crate) fn alloc_failed() -> ! {
    panic!("hash table allocation failed");
}

/// Errors reported by the fallible table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// Growing or rehashing the table could not allocate memory. The table
    /// is left in its previous, valid state.
    AllocationFailure,
    /// A resize request was too small to hold the current number of live
    /// entries under the load factor. Nothing was mutated.
    CapacityRejected,
}

impl core::fmt::Display for TableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TableError::AllocationFailure => f.write_str("hash table allocation failed"),
            TableError::CapacityRejected => {
                f.write_str("requested capacity is too small for the current entries")
            }
        }
    }
}

impl core::error::Error for TableError {}

/// Hashing and equality, injected as a capability instead of being inferred
/// from the key type.
///
/// The table consults the policy during lookup, insertion, and rehashing, so
/// `hash` must be a pure function of the key and `eq` must agree with it
/// (equal keys hash identically) for the table to behave.
pub trait KeyPolicy<K> {
    /// Hashes a key.
    fn hash(&self, key: &K) -> u64;

    /// Compares a stored key against a candidate.
    fn eq(&self, stored: &K, candidate: &K) -> bool;
}

/// A [`KeyPolicy`] adapter over any [`BuildHasher`], using the key type's
/// `Hash` and `Eq` implementations.
#[derive(Debug, Clone, Default)]
pub struct HashPolicy<S> {
    build: S,
}

impl<S> HashPolicy<S> {
    /// Wraps a hasher builder as a key policy.
    pub const fn new(build: S) -> Self {
        Self { build }
    }

    /// Returns the wrapped hasher builder.
    pub fn hasher(&self) -> &S {
        &self.build
    }
}

impl<K, S> KeyPolicy<K> for HashPolicy<S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.build.hash_one(key)
    }

    #[inline]
    fn eq(&self, stored: &K, candidate: &K) -> bool {
        stored == candidate
    }
}

/// Outcome of [`HashTable::insert`].
///
/// On [`Insert::Existing`] the stored key and value are left untouched and
/// the rejected pair is handed back; overwriting the stored value is a
/// separate, explicit step via [`HashTable::replace_value`].
#[derive(Debug, PartialEq, Eq)]
pub enum Insert<K, V> {
    /// The key claimed a slot that had never held an entry.
    Fresh(usize),
    /// The key reused a tombstoned slot.
    Revived(usize),
    /// The key was already present.
    Existing {
        /// Slot index of the stored entry.
        index: usize,
        /// The key that was not inserted.
        key: K,
        /// The value that was not inserted.
        value: V,
    },
}

impl<K, V> Insert<K, V> {
    /// Returns the slot index the key resolved to.
    pub fn index(&self) -> usize {
        match self {
            Insert::Fresh(index) | Insert::Revived(index) => *index,
            Insert::Existing { index, .. } => *index,
        }
    }

    /// Returns `true` unless the key was already present.
    pub fn is_new(&self) -> bool {
        !matches!(self, Insert::Existing { .. })
    }
}

/// Probe-sequence statistics over the live entries of a table.
///
/// Produced by [`HashTable::probe_stats`]; purely diagnostic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeStats {
    /// Longest probe sequence needed to find any live entry.
    pub max_probes: usize,
    /// Mean probe-sequence length across live entries.
    pub avg_probes: f64,
    /// Population variance of the probe-sequence lengths.
    pub variance: f64,
}

/// Maintenance decision when an insert crosses the growth threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Maintenance {
    /// Rehash at the same bucket count, reclaiming tombstones.
    Purge,
    /// Double the bucket count.
    Grow,
}

/// Tombstones dominating the live entries mean the table can reclaim space
/// instead of growing.
#[inline]
fn maintenance_for(buckets: usize, live: usize) -> Maintenance {
    if buckets > live << 1 {
        Maintenance::Purge
    } else {
        Maintenance::Grow
    }
}

/// Per-slot state, packed 2 bits per slot into `u32` words (16 slots per
/// word). Bit 1 of a field marks the slot empty, bit 0 marks it tombstoned;
/// both clear means the slot is live.
#[derive(Clone)]
struct FlagStore {
    words: Vec<u32>,
}

impl FlagStore {
    const fn new() -> Self {
        Self { words: Vec::new() }
    }

    fn word_count(buckets: usize) -> usize {
        (buckets >> 4) + 1
    }

    fn try_with_buckets(buckets: usize) -> Result<Self, TableError> {
        let count = Self::word_count(buckets);
        let mut words = Vec::new();
        words
            .try_reserve_exact(count)
            .map_err(|_| TableError::AllocationFailure)?;
        words.resize(count, ALL_EMPTY);
        Ok(Self { words })
    }

    /// Marks every slot empty again without touching the allocation.
    fn reset(&mut self) {
        self.words.fill(ALL_EMPTY);
    }

    #[inline(always)]
    fn shift(index: usize) -> u32 {
        ((index & 0xF) << 1) as u32
    }

    #[inline(always)]
    fn bits(&self, index: usize) -> u32 {
        (self.words[index >> 4] >> Self::shift(index)) & 3
    }

    #[inline(always)]
    fn is_empty_slot(&self, index: usize) -> bool {
        self.bits(index) & 2 != 0
    }

    #[inline(always)]
    fn is_tombstone(&self, index: usize) -> bool {
        self.bits(index) & 1 != 0
    }

    #[inline(always)]
    fn is_live(&self, index: usize) -> bool {
        self.bits(index) == 0
    }

    #[inline(always)]
    fn set_live(&mut self, index: usize) {
        self.words[index >> 4] &= !(3u32 << Self::shift(index));
    }

    #[inline(always)]
    fn set_tombstone(&mut self, index: usize) {
        self.words[index >> 4] |= 1u32 << Self::shift(index);
    }
}

/// An owned buffer of possibly-uninitialized slots.
///
/// Growth reserves exactly and then extends, so a failed grow leaves the
/// previous contents untouched. Which slots are initialized is tracked
/// externally by the [`FlagStore`]: live means initialized.
struct RawBuf<T> {
    slots: Vec<MaybeUninit<T>>,
}

impl<T> RawBuf<T> {
    const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    fn grow(&mut self, new_len: usize) -> Result<(), TableError> {
        debug_assert!(new_len >= self.slots.len());
        self.slots
            .try_reserve_exact(new_len - self.slots.len())
            .map_err(|_| TableError::AllocationFailure)?;
        self.slots.resize_with(new_len, MaybeUninit::uninit);
        Ok(())
    }

    fn shrink(&mut self, new_len: usize) {
        self.slots.truncate(new_len);
        self.slots.shrink_to_fit();
    }

    /// Writes a slot without reading or dropping its previous contents.
    #[inline(always)]
    fn put(&mut self, index: usize, value: T) {
        self.slots[index].write(value);
    }

    /// # Safety
    ///
    /// The slot at `index` must be initialized.
    #[inline(always)]
    unsafe fn get(&self, index: usize) -> &T {
        // SAFETY: The caller guarantees the slot is initialized.
        unsafe { self.slots[index].assume_init_ref() }
    }

    /// # Safety
    ///
    /// The slot at `index` must be initialized.
    #[inline(always)]
    unsafe fn get_mut(&mut self, index: usize) -> &mut T {
        // SAFETY: The caller guarantees the slot is initialized.
        unsafe { self.slots[index].assume_init_mut() }
    }

    /// Moves the contents out, leaving the slot uninitialized.
    ///
    /// # Safety
    ///
    /// The slot at `index` must be initialized, and the caller must stop
    /// treating it as initialized afterwards.
    #[inline(always)]
    unsafe fn take(&mut self, index: usize) -> T {
        // SAFETY: The caller guarantees the slot is initialized.
        unsafe { self.slots[index].assume_init_read() }
    }

    /// Swaps the slot contents with the value in hand.
    ///
    /// # Safety
    ///
    /// The slot at `index` must be initialized.
    #[inline(always)]
    unsafe fn swap(&mut self, index: usize, hand: &mut T) {
        // SAFETY: The caller guarantees the slot is initialized.
        unsafe { core::mem::swap(self.slots[index].assume_init_mut(), hand) }
    }

    /// # Safety
    ///
    /// The slot at `index` must be initialized, and the caller must stop
    /// treating it as initialized afterwards.
    #[inline(always)]
    unsafe fn drop_at(&mut self, index: usize) {
        // SAFETY: The caller guarantees the slot is initialized.
        unsafe { self.slots[index].assume_init_drop() }
    }
}

/// Quadratic probe sequence over a power-of-two bucket count.
///
/// Starts at `hash & mask` and advances by triangular increments (`+1`,
/// `+2`, `+3`, ...), which visits every slot of a power-of-two table exactly
/// once before repeating.
struct ProbeSeq {
    index: usize,
    step: usize,
    mask: usize,
}

impl ProbeSeq {
    #[inline(always)]
    fn new(hash: u64, mask: usize) -> Self {
        Self {
            index: hash as usize & mask,
            step: 0,
            mask,
        }
    }

    #[inline(always)]
    fn current(&self) -> usize {
        self.index
    }

    #[inline(always)]
    fn advance(&mut self) -> usize {
        self.step += 1;
        self.index = self.index.wrapping_add(self.step) & self.mask;
        self.index
    }
}

/// An open-addressing hash table with quadratic probing and lazy tombstone
/// deletion.
///
/// `HashTable<K, V, P>` stores keys and values in parallel slot arrays and
/// addresses entries by slot index. Hashing and equality come from the
/// injected [`KeyPolicy`]; set semantics use `V = ()`.
///
/// Slot indices returned by [`find`](Self::find) and
/// [`insert`](Self::insert) stay valid across deletions and non-growing
/// insertions, but are invalidated by any operation that rehashes: an insert
/// that crosses the growth threshold, or an explicit
/// [`resize`](Self::resize).
///
/// A new table owns no storage at all; the first insertion materializes the
/// minimum bucket count.
///
/// ## Example
///
/// ```rust
/// # #[cfg(feature = "foldhash")]
/// # {
/// use quad_hash::hash_map::DefaultHashBuilder;
/// use quad_hash::hash_table::HashPolicy;
/// use quad_hash::hash_table::HashTable;
///
/// let policy: HashPolicy<DefaultHashBuilder> = HashPolicy::default();
/// let mut table: HashTable<&str, u32, _> = HashTable::with_policy(policy);
///
/// let index = table.insert("alice", 36).unwrap().index();
/// assert_eq!(table.value_at(index), Some(&36));
/// assert_eq!(table.find(&"alice"), Some(index));
/// assert_eq!(table.find(&"bob"), None);
///
/// assert_eq!(table.remove(index), Some(("alice", 36)));
/// assert!(table.is_empty());
/// # }
/// ```
pub struct HashTable<K, V, P> {
    buckets: usize,
    live: usize,
    occupied: usize,
    threshold: usize,
    flags: FlagStore,
    keys: RawBuf<K>,
    values: RawBuf<V>,
    policy: P,
}

impl<K, V, P> Debug for HashTable<K, V, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("len", &self.live)
            .field("occupied", &self.occupied)
            .field("buckets", &self.buckets)
            .finish_non_exhaustive()
    }
}

impl<K, V, P> HashTable<K, V, P> {
    /// Creates an empty table with the given policy. Allocates nothing.
    pub const fn with_policy(policy: P) -> Self {
        Self {
            buckets: 0,
            live: 0,
            occupied: 0,
            threshold: 0,
            flags: FlagStore::new(),
            keys: RawBuf::new(),
            values: RawBuf::new(),
            policy,
        }
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the table holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the total slot count: zero, or a power of two of at least 4.
    pub fn bucket_count(&self) -> usize {
        self.buckets
    }

    /// Returns the number of entries the table can hold before an insert
    /// triggers maintenance.
    pub fn capacity(&self) -> usize {
        self.threshold
    }

    /// Returns the injected key policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Returns `true` if `index` denotes a live slot.
    pub fn is_live(&self, index: usize) -> bool {
        index < self.buckets && self.flags.is_live(index)
    }

    /// Returns the key stored in a live slot.
    pub fn key_at(&self, index: usize) -> Option<&K> {
        if self.is_live(index) {
            // SAFETY: Live slots always hold an initialized key.
            Some(unsafe { self.keys.get(index) })
        } else {
            None
        }
    }

    /// Returns the value stored in a live slot.
    pub fn value_at(&self, index: usize) -> Option<&V> {
        if self.is_live(index) {
            // SAFETY: Live slots always hold an initialized value.
            Some(unsafe { self.values.get(index) })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the value stored in a live slot.
    pub fn value_at_mut(&mut self, index: usize) -> Option<&mut V> {
        if self.is_live(index) {
            // SAFETY: Live slots always hold an initialized value.
            Some(unsafe { self.values.get_mut(index) })
        } else {
            None
        }
    }

    /// Returns the key-value pair stored in a live slot.
    pub fn entry_at(&self, index: usize) -> Option<(&K, &V)> {
        if self.is_live(index) {
            // SAFETY: Live slots always hold initialized storage.
            Some(unsafe { (self.keys.get(index), self.values.get(index)) })
        } else {
            None
        }
    }

    /// Overwrites the value of a live slot, returning the previous value.
    ///
    /// This is the explicit second step after an insert reported
    /// [`Insert::Existing`] and the caller wants update semantics.
    pub fn replace_value(&mut self, index: usize, value: V) -> Option<V> {
        if self.is_live(index) {
            // SAFETY: Live slots always hold an initialized value.
            Some(core::mem::replace(
                unsafe { self.values.get_mut(index) },
                value,
            ))
        } else {
            None
        }
    }

    /// Tombstones a live slot and returns its entry.
    ///
    /// Deletion only flips flag state; the slot's storage is reclaimed
    /// lazily by a later rehash. Passing an index that is out of range,
    /// empty, or already tombstoned is a no-op returning `None`, and never
    /// corrupts the counts.
    pub fn remove(&mut self, index: usize) -> Option<(K, V)> {
        if !self.is_live(index) {
            return None;
        }
        // SAFETY: The slot is live, so both buffers are initialized there.
        // Tombstoning it below transfers ownership to the caller.
        let entry = unsafe { (self.keys.take(index), self.values.take(index)) };
        self.flags.set_tombstone(index);
        self.live -= 1;
        Some(entry)
    }

    /// Removes all entries while keeping the allocated buckets.
    pub fn clear(&mut self) {
        self.drop_live();
        self.flags.reset();
        self.live = 0;
        self.occupied = 0;
    }

    /// Returns a restartable iterator over the live slot indices, in storage
    /// order.
    pub fn indices(&self) -> Indices<'_> {
        Indices {
            flags: &self.flags,
            buckets: self.buckets,
            index: 0,
        }
    }

    /// Returns an iterator over the live entries, in storage order.
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter {
            table: self,
            index: 0,
        }
    }

    fn drop_live(&mut self) {
        if !(core::mem::needs_drop::<K>() || core::mem::needs_drop::<V>()) || self.live == 0 {
            return;
        }
        for index in 0..self.buckets {
            if self.flags.is_live(index) {
                // SAFETY: Live slots hold initialized storage; the caller
                // resets or discards the flags immediately afterwards.
                unsafe {
                    self.keys.drop_at(index);
                    self.values.drop_at(index);
                }
            }
        }
    }
}

impl<K, V, P> HashTable<K, V, P>
where
    P: KeyPolicy<K>,
{
    /// Looks up a key, returning its live slot index.
    ///
    /// Probing stops at the first empty slot (the key is absent), at a live
    /// slot holding an equal key, or after a defensive full probe cycle. A
    /// table that has never allocated reports every key absent without
    /// touching storage. Lookup never mutates the table.
    pub fn find(&self, key: &K) -> Option<usize> {
        if self.buckets == 0 {
            return None;
        }
        let mask = self.buckets - 1;
        let mut probe = ProbeSeq::new(self.policy.hash(key), mask);
        let start = probe.current();
        loop {
            let i = probe.current();
            if self.flags.is_empty_slot(i) {
                return None;
            }
            if !self.flags.is_tombstone(i) {
                // SAFETY: The slot is live, so the key is initialized.
                if self.policy.eq(unsafe { self.keys.get(i) }, key) {
                    return Some(i);
                }
            }
            if probe.advance() == start {
                return None;
            }
        }
    }

    /// Returns `true` if the key is present.
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts a key, reporting how its slot was claimed.
    ///
    /// If the occupied-slot count has reached the growth threshold the table
    /// is rehashed first: at the same bucket count when tombstones outnumber
    /// live entries two to one, otherwise at double the bucket count. A
    /// failed rehash aborts the insertion with the table unchanged.
    ///
    /// When the key is already present the stored entry is left untouched
    /// and the rejected pair is handed back inside [`Insert::Existing`];
    /// callers wanting update semantics follow up with
    /// [`replace_value`](Self::replace_value). Tombstoned slots seen on the
    /// probe path are reused in preference to the terminating empty slot.
    pub fn insert(&mut self, key: K, value: V) -> Result<Insert<K, V>, TableError> {
        if self.occupied >= self.threshold {
            match maintenance_for(self.buckets, self.live) {
                Maintenance::Purge => self.rehash(self.buckets - 1)?,
                Maintenance::Grow => self.rehash(self.buckets + 1)?,
            }
        }

        let mask = self.buckets - 1;
        let hash = self.policy.hash(&key);
        let mut probe = ProbeSeq::new(hash, mask);
        let start = probe.current();

        let target = if self.flags.is_empty_slot(start) {
            start
        } else {
            // Track the first tombstone on the probe path; it is preferred
            // over the empty slot that terminates the scan.
            let mut site: Option<usize> = None;
            loop {
                let i = probe.current();
                if self.flags.is_empty_slot(i) {
                    break site.unwrap_or(i);
                }
                if self.flags.is_tombstone(i) {
                    if site.is_none() {
                        site = Some(i);
                    }
                } else {
                    // SAFETY: The slot is live, so the key is initialized.
                    if self.policy.eq(unsafe { self.keys.get(i) }, &key) {
                        break i;
                    }
                }
                if probe.advance() == start {
                    // A full cycle means no empty slot and no match. The
                    // load factor keeps empty slots around, so a tombstone
                    // must have been seen on the way.
                    match site {
                        Some(site) => break site,
                        None => unreachable!("probe cycle found no usable slot"),
                    }
                }
            }
        };

        if self.flags.is_empty_slot(target) {
            self.keys.put(target, key);
            self.values.put(target, value);
            self.flags.set_live(target);
            self.live += 1;
            self.occupied += 1;
            Ok(Insert::Fresh(target))
        } else if self.flags.is_tombstone(target) {
            self.keys.put(target, key);
            self.values.put(target, value);
            self.flags.set_live(target);
            self.live += 1;
            Ok(Insert::Revived(target))
        } else {
            Ok(Insert::Existing {
                index: target,
                key,
                value,
            })
        }
    }

    /// Resizes the table to hold at least `new_buckets` slots, rounded up to
    /// a power of two with a floor of 4.
    ///
    /// Requesting the current bucket count (or anything that rounds to it)
    /// rehashes in place, purging tombstones. A request too small for the
    /// current live count fails with [`TableError::CapacityRejected`] and a
    /// failed allocation with [`TableError::AllocationFailure`]; in both
    /// cases the table is unchanged.
    pub fn resize(&mut self, new_buckets: usize) -> Result<(), TableError> {
        self.rehash(new_buckets)
    }

    /// Ensures the table can hold `additional` more entries without another
    /// rehash.
    pub fn reserve(&mut self, additional: usize) -> Result<(), TableError> {
        let required = self.live.saturating_add(additional);
        if required <= self.threshold {
            return Ok(());
        }
        self.rehash((required as f64 / LOAD_FACTOR) as usize + 1)
    }

    /// Redistributes every live entry into a table of `requested` buckets
    /// (rounded), using displacement swaps so only the flag array is
    /// allocated anew.
    ///
    /// One entry is held in hand at a time: its slot under the new layout is
    /// probed against the new flag array, and if that slot still holds an
    /// unprocessed live entry of the old layout the two are swapped,
    /// continuing the chain until the hand lands on a slot the new flags
    /// mark empty.
    fn rehash(&mut self, requested: usize) -> Result<(), TableError> {
        let new_buckets = round_buckets(requested);
        if self.live >= growth_threshold(new_buckets) {
            return Err(TableError::CapacityRejected);
        }

        let mut new_flags = FlagStore::try_with_buckets(new_buckets)?;
        if self.buckets < new_buckets {
            // Both buffers must succeed before any entry moves. A failure
            // on the second grow leaves the first with spare capacity only;
            // the table still owns all of its previous contents.
            self.keys.grow(new_buckets)?;
            self.values.grow(new_buckets)?;
        }

        let new_mask = new_buckets - 1;
        for j in 0..self.buckets {
            if !self.flags.is_live(j) {
                continue;
            }
            // SAFETY: Slot `j` is live; tombstoning it below records that
            // its storage has been moved out.
            let mut key = unsafe { self.keys.take(j) };
            let mut value = unsafe { self.values.take(j) };
            self.flags.set_tombstone(j);
            loop {
                let mut probe = ProbeSeq::new(self.policy.hash(&key), new_mask);
                let mut i = probe.current();
                while !new_flags.is_empty_slot(i) {
                    i = probe.advance();
                }
                new_flags.set_live(i);
                if i < self.buckets && self.flags.is_live(i) {
                    // The landing slot still holds an unprocessed entry of
                    // the old layout; displace it into the hand and keep
                    // going.
                    // SAFETY: Slot `i` is live in the old flags, so both
                    // buffers are initialized there.
                    unsafe {
                        self.keys.swap(i, &mut key);
                        self.values.swap(i, &mut value);
                    }
                    self.flags.set_tombstone(i);
                } else {
                    self.keys.put(i, key);
                    self.values.put(i, value);
                    break;
                }
            }
        }

        if self.buckets > new_buckets {
            self.keys.shrink(new_buckets);
            self.values.shrink(new_buckets);
        }
        self.flags = new_flags;
        self.buckets = new_buckets;
        self.occupied = self.live;
        self.threshold = growth_threshold(new_buckets);
        Ok(())
    }

    /// Computes probe-sequence statistics across all live entries.
    ///
    /// Each entry's probe distance is recomputed from scratch: the key is
    /// re-hashed and the probe sequence re-walked until the entry is
    /// reached. Costs O(n) times the average probe length; never mutates
    /// the table.
    pub fn probe_stats(&self) -> ProbeStats {
        let mut stats = ProbeStats {
            max_probes: 0,
            avg_probes: 0.0,
            variance: 0.0,
        };
        if self.live == 0 {
            return stats;
        }

        let mask = self.buckets - 1;
        let mut filled = 0usize;
        let mut sum = 0.0f64;
        let mut sum_squares = 0.0f64;
        for index in 0..self.buckets {
            if !self.flags.is_live(index) {
                continue;
            }
            // SAFETY: The slot is live, so the key is initialized.
            let key = unsafe { self.keys.get(index) };
            let mut probe = ProbeSeq::new(self.policy.hash(key), mask);
            let mut probes = 1usize;
            loop {
                let pos = probe.current();
                if self.flags.is_empty_slot(pos) {
                    break;
                }
                if !self.flags.is_tombstone(pos) {
                    // SAFETY: The probed slot is live, so its key is
                    // initialized.
                    if self.policy.eq(unsafe { self.keys.get(pos) }, key) {
                        break;
                    }
                }
                probe.advance();
                probes += 1;
            }
            let p = probes as f64;
            sum += p;
            sum_squares += p * p;
            stats.max_probes = stats.max_probes.max(probes);
            filled += 1;
        }

        let mean = sum / filled as f64;
        stats.avg_probes = mean;
        stats.variance = sum_squares / filled as f64 - mean * mean;
        stats
    }
}

impl<K, V, P> Drop for HashTable<K, V, P> {
    fn drop(&mut self) {
        self.drop_live();
    }
}

impl<K, V, P> Clone for HashTable<K, V, P>
where
    K: Clone,
    V: Clone,
    P: Clone,
{
    fn clone(&self) -> Self {
        let mut keys = RawBuf::new();
        let mut values = RawBuf::new();
        if keys.grow(self.buckets).is_err() || values.grow(self.buckets).is_err() {
            alloc_failed();
        }
        for index in 0..self.buckets {
            if self.flags.is_live(index) {
                // SAFETY: Live slots hold initialized storage in `self`;
                // the cloned flag store marks the same slots live.
                unsafe {
                    keys.put(index, self.keys.get(index).clone());
                    values.put(index, self.values.get(index).clone());
                }
            }
        }
        Self {
            buckets: self.buckets,
            live: self.live,
            occupied: self.occupied,
            threshold: self.threshold,
            flags: self.flags.clone(),
            keys,
            values,
            policy: self.policy.clone(),
        }
    }
}

/// A lazy iterator over the live slot indices of a table, in storage order.
pub struct Indices<'a> {
    flags: &'a FlagStore,
    buckets: usize,
    index: usize,
}

impl Iterator for Indices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.buckets {
            let index = self.index;
            self.index += 1;
            if self.flags.is_live(index) {
                return Some(index);
            }
        }
        None
    }
}

/// An iterator over the live entries of a table, in storage order.
pub struct Iter<'a, K, V, P> {
    table: &'a HashTable<K, V, P>,
    index: usize,
}

impl<'a, K, V, P> Iterator for Iter<'a, K, V, P> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.table.buckets {
            let index = self.index;
            self.index += 1;
            if self.table.flags.is_live(index) {
                // SAFETY: Live slots hold initialized storage.
                return Some(unsafe {
                    (self.table.keys.get(index), self.table.values.get(index))
                });
            }
        }
        None
    }
}
