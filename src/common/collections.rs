//! Hashing collections used throughout the crate. Nothing here is keyed by
//! untrusted input, so the non-siphash maps are fine.

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;
