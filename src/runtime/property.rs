//! Property table
//!
//! Objects store their members in a chained hash table over a property
//! vector. Deleted slots are threaded onto a free list and reused by later
//! inserts, so iteration follows slot order: insertion order until the
//! first delete, after which a new key may land in an earlier slot.

use std::fmt;

use ahash::RandomState;

/// A property in a table
#[derive(Debug, Clone)]
pub struct Property<V> {
    /// Property name
    pub key: String,
    /// Stored value
    pub value: V,
    /// Next index in the hash chain or free list (0 = end)
    hash_next: u32,
    deleted: bool,
}

impl<V> Property<V> {
    #[inline]
    fn new(key: String, value: V, hash_next: u32) -> Self {
        Property {
            key,
            value,
            hash_next,
            deleted: false,
        }
    }
}

/// Property table structure
///
/// Layout:
/// - hash_table[hash_size]: 1-based indices into properties (0 = end of chain)
/// - properties[]: entries in slot order, deleted ones kept as tombstones
#[derive(Clone)]
pub struct PropertyTable<V> {
    /// Number of active properties
    prop_count: u32,
    /// Hash table mask (size - 1)
    hash_mask: u32,
    properties: Vec<Property<V>>,
    hash_table: Vec<u32>,
    /// First free slot in properties (1-based, 0 = none)
    first_free: u32,
    hasher: RandomState,
}

impl<V: Copy> PropertyTable<V> {
    const MIN_HASH_SIZE: usize = 4;

    const MAX_LOAD_FACTOR: f64 = 0.75;

    /// Create a new empty property table
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a property table with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        let hash_size = capacity.next_power_of_two().max(Self::MIN_HASH_SIZE);
        PropertyTable {
            prop_count: 0,
            hash_mask: (hash_size - 1) as u32,
            properties: Vec::with_capacity(capacity),
            hash_table: vec![0; hash_size],
            first_free: 0,
            hasher: RandomState::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.prop_count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prop_count == 0
    }

    #[inline]
    fn bucket(&self, key: &str) -> usize {
        (self.hasher.hash_one(key) as u32 & self.hash_mask) as usize
    }

    /// Find a property by key, returning its slot index
    fn find(&self, key: &str) -> Option<usize> {
        if self.prop_count == 0 {
            return None;
        }

        let mut idx = self.hash_table[self.bucket(key)];
        while idx != 0 {
            let prop_idx = (idx - 1) as usize;
            let prop = &self.properties[prop_idx];
            if prop.key == key {
                return Some(prop_idx);
            }
            idx = prop.hash_next;
        }
        None
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Option<V> {
        self.find(key).map(|idx| self.properties[idx].value)
    }

    #[inline]
    pub fn has(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Insert or update a property
    ///
    /// Returns the value that was displaced, if the key already existed.
    pub fn set(&mut self, key: &str, value: V) -> Option<V> {
        if let Some(idx) = self.find(key) {
            return Some(std::mem::replace(&mut self.properties[idx].value, value));
        }

        let load = (self.prop_count + 1) as f64 / (self.hash_mask + 1) as f64;
        if load > Self::MAX_LOAD_FACTOR {
            self.resize();
        }

        let bucket = self.bucket(key);
        let prop = Property::new(key.to_string(), value, self.hash_table[bucket]);

        let prop_idx = if self.first_free != 0 {
            let idx = (self.first_free - 1) as usize;
            self.first_free = self.properties[idx].hash_next;
            self.properties[idx] = prop;
            idx
        } else {
            self.properties.push(prop);
            self.properties.len() - 1
        };

        self.hash_table[bucket] = (prop_idx + 1) as u32;
        self.prop_count += 1;
        None
    }

    /// Delete a property by key
    ///
    /// Returns the removed value, if the key existed.
    pub fn delete(&mut self, key: &str) -> Option<V> {
        if self.prop_count == 0 {
            return None;
        }

        let bucket = self.bucket(key);
        let mut prev_idx: Option<usize> = None;
        let mut idx = self.hash_table[bucket];

        while idx != 0 {
            let prop_idx = (idx - 1) as usize;
            let prop = &self.properties[prop_idx];

            if prop.key == key {
                let next = prop.hash_next;
                match prev_idx {
                    Some(prev) => self.properties[prev].hash_next = next,
                    None => self.hash_table[bucket] = next,
                }

                let prop = &mut self.properties[prop_idx];
                prop.deleted = true;
                prop.key.clear();
                prop.hash_next = self.first_free;
                self.first_free = idx;

                self.prop_count -= 1;
                return Some(prop.value);
            }

            prev_idx = Some(prop_idx);
            idx = prop.hash_next;
        }

        None
    }

    /// Double the hash table and rechain every live entry
    fn resize(&mut self) {
        let new_size = ((self.hash_mask + 1) * 2) as usize;
        self.hash_mask = (new_size - 1) as u32;
        self.hash_table = vec![0; new_size];

        for i in 0..self.properties.len() {
            if self.properties[i].deleted {
                continue;
            }
            let bucket = self.bucket(&self.properties[i].key);
            self.properties[i].hash_next = self.hash_table[bucket];
            self.hash_table[bucket] = (i + 1) as u32;
        }
    }

    /// Iterate over live properties in slot order
    pub fn iter(&self) -> impl Iterator<Item = (&str, V)> + '_ {
        self.properties
            .iter()
            .filter(|p| !p.deleted)
            .map(|p| (p.key.as_str(), p.value))
    }

    /// Iterate over live keys
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Iterate over live values
    pub fn values(&self) -> impl Iterator<Item = V> + '_ {
        self.iter().map(|(_, value)| value)
    }
}

impl<V: Copy + fmt::Debug> fmt::Debug for PropertyTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: Copy> Default for PropertyTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table() {
        let table: PropertyTable<u32> = PropertyTable::new();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert!(table.get("a").is_none());
    }

    #[test]
    fn test_set_get() {
        let mut table = PropertyTable::new();

        assert_eq!(table.set("answer", 42u32), None);
        assert!(!table.is_empty());
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("answer"), Some(42));
    }

    #[test]
    fn test_update_returns_displaced() {
        let mut table = PropertyTable::new();

        table.set("x", 10u32);
        assert_eq!(table.set("x", 20), Some(10));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("x"), Some(20));
    }

    #[test]
    fn test_delete() {
        let mut table = PropertyTable::new();

        table.set("x", 10u32);
        assert!(table.has("x"));

        assert_eq!(table.delete("x"), Some(10));
        assert!(!table.has("x"));
        assert!(table.is_empty());

        assert_eq!(table.delete("x"), None);
    }

    #[test]
    fn test_empty_string_key() {
        let mut table = PropertyTable::new();

        table.set("", 1u32);
        assert_eq!(table.get(""), Some(1));
        assert_eq!(table.delete(""), Some(1));
        assert_eq!(table.get(""), None);
    }

    #[test]
    fn test_resize() {
        let mut table = PropertyTable::with_capacity(4);

        for i in 0..100u32 {
            table.set(&format!("key{i}"), i * 2);
        }
        assert_eq!(table.len(), 100);

        for i in 0..100u32 {
            assert_eq!(table.get(&format!("key{i}")), Some(i * 2));
        }
    }

    #[test]
    fn test_delete_and_reuse() {
        let mut table = PropertyTable::new();

        table.set("a", 1u32);
        table.set("b", 2);
        table.set("c", 3);

        table.delete("b");
        assert_eq!(table.len(), 2);

        table.set("d", 4);
        assert_eq!(table.len(), 3);

        assert!(table.has("a"));
        assert!(!table.has("b"));
        assert!(table.has("c"));
        assert!(table.has("d"));

        // "d" took the slot "b" vacated
        let keys: Vec<_> = table.keys().collect();
        assert_eq!(keys, vec!["a", "d", "c"]);
    }

    #[test]
    fn test_insertion_order() {
        let mut table = PropertyTable::new();

        table.set("z", 1u32);
        table.set("y", 2);
        table.set("x", 3);

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![("z", 1), ("y", 2), ("x", 3)]);
        assert_eq!(table.values().sum::<u32>(), 6);
    }
}
