#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// A key-value map over the quadratic-probing table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard map interface with configurable hashers.
pub mod hash_map;

pub mod hash_table;

/// A set over the quadratic-probing table.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use hash_table::Insert;
pub use hash_table::KeyPolicy;
pub use hash_table::ProbeStats;
pub use hash_table::TableError;
