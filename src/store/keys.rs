//! Allow-list of valid access codes.

use std::sync::Mutex;

use super::{slot, Slot};
use crate::types::{Key, Result};

/// Default number of codes the allow-list holds.
pub const MAX_VALID_KEYS: usize = 5;

/// Bounded, ordered set of valid codes.
///
/// Codes occupy a prefix of the slots in insertion order; removing a code
/// shifts the following ones left. The lock is held only for the in-memory
/// operation and never across an `.await`.
#[derive(Debug)]
pub struct KeyStore {
    slots: Mutex<Vec<Key>>,
    capacity: usize,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_VALID_KEYS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Add a code at the first free slot.
    ///
    /// Returns the 1-based slot it landed in, or `None` when the code was
    /// already present or the store is full.
    pub fn insert(&self, key: &Key) -> Result<Option<Slot>> {
        let mut slots = self.slots.lock()?;
        if slots.contains(key) || slots.len() >= self.capacity {
            return Ok(None);
        }
        slots.push(key.clone());
        Ok(Some(slot(slots.len() - 1)))
    }

    /// Remove a code, shifting later codes down one slot.
    ///
    /// Returns the 1-based slot it occupied, or `None` if it was absent.
    pub fn remove(&self, key: &Key) -> Result<Option<Slot>> {
        let mut slots = self.slots.lock()?;
        let Some(index) = slots.iter().position(|k| k == key) else {
            return Ok(None);
        };
        slots.remove(index);
        Ok(Some(slot(index)))
    }

    pub fn contains(&self, key: &Key) -> Result<bool> {
        Ok(self.slots.lock()?.contains(key))
    }

    /// Codes in slot order.
    pub fn snapshot(&self) -> Result<Vec<Key>> {
        Ok(self.slots.lock()?.clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.slots.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl KeyStore {
    /// Leave the lock poisoned, as if a holder had panicked.
    pub(crate) fn poison(&self) {
        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _guard = self.slots.lock();
                    panic!("allow-list holder died");
                })
                .join();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Error;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn key(s: &str) -> Key {
        Key::parse(s).unwrap()
    }

    fn codes(store: &KeyStore) -> Vec<String> {
        store
            .snapshot()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_insert_returns_one_based_slot() {
        let store = KeyStore::new();
        assert_eq!(store.insert(&key("1111")).unwrap().map(Slot::get), Some(1));
        assert_eq!(store.insert(&key("2222")).unwrap().map(Slot::get), Some(2));
        assert_eq!(codes(&store), vec!["1111", "2222"]);
    }

    #[test]
    fn test_insert_duplicate_is_noop() {
        let store = KeyStore::new();
        store.insert(&key("1111")).unwrap();
        store.insert(&key("2222")).unwrap();

        assert_eq!(store.insert(&key("1111")).unwrap(), None);
        assert_eq!(codes(&store), vec!["1111", "2222"]);
    }

    #[test]
    fn test_round_trip() {
        let store = KeyStore::new();
        store.insert(&key("ABCD")).unwrap();
        assert!(store.contains(&key("ABCD")).unwrap());

        assert_eq!(store.remove(&key("ABCD")).unwrap().map(Slot::get), Some(1));
        assert!(!store.contains(&key("ABCD")).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_capacity() {
        let store = KeyStore::new();
        for (i, code) in ["0001", "0002", "0003", "0004", "0005"].iter().enumerate() {
            assert_eq!(store.insert(&key(code)).unwrap().map(Slot::get), Some(i + 1));
        }

        assert_eq!(store.insert(&key("0006")).unwrap(), None);
        assert_eq!(codes(&store), vec!["0001", "0002", "0003", "0004", "0005"]);
    }

    #[test]
    fn test_remove_shifts_left() {
        let store = KeyStore::new();
        for code in ["0001", "0002", "0003", "0004"] {
            store.insert(&key(code)).unwrap();
        }

        assert_eq!(store.remove(&key("0002")).unwrap().map(Slot::get), Some(2));
        assert_eq!(codes(&store), vec!["0001", "0003", "0004"]);

        // Freed slot is reused at the end, not in the hole.
        assert_eq!(store.insert(&key("0009")).unwrap().map(Slot::get), Some(4));
        assert_eq!(codes(&store), vec!["0001", "0003", "0004", "0009"]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let store = KeyStore::new();
        store.insert(&key("0001")).unwrap();
        assert_eq!(store.remove(&key("9999")).unwrap(), None);
        assert_eq!(codes(&store), vec!["0001"]);
    }

    #[test]
    fn test_poisoned_lock_is_error() {
        let store = KeyStore::new();
        store.poison();

        assert!(matches!(store.insert(&key("1234")), Err(Error::Lock(_))));
        assert!(matches!(store.remove(&key("1234")), Err(Error::Lock(_))));
        assert!(matches!(store.contains(&key("1234")), Err(Error::Lock(_))));
    }

    #[test]
    fn test_concurrent_mutations_stay_bounded() {
        let store = Arc::new(KeyStore::new());
        let handles: Vec<_> = (0..16)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let k = key(&format!("{:04}", (t * 7 + i) % 12));
                        match i % 3 {
                            0 => {
                                store.insert(&k).unwrap();
                            }
                            1 => {
                                store.remove(&k).unwrap();
                            }
                            _ => {
                                store.contains(&k).unwrap();
                            }
                        }
                        let snapshot = store.snapshot().unwrap();
                        assert!(snapshot.len() <= MAX_VALID_KEYS);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.len() <= MAX_VALID_KEYS);
        let mut deduped = snapshot.clone();
        deduped.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        deduped.dedup();
        assert_eq!(deduped.len(), snapshot.len());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..8).prop_map(Op::Insert),
            (0u8..8).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn prop_store_matches_model(ops in proptest::collection::vec(op(), 0..64)) {
            let store = KeyStore::new();
            let mut model: Vec<String> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(n) => {
                        let code = format!("{:04}", n);
                        let result = store.insert(&key(&code)).unwrap();
                        if model.contains(&code) || model.len() == MAX_VALID_KEYS {
                            prop_assert_eq!(result, None);
                        } else {
                            model.push(code);
                            prop_assert_eq!(result.map(Slot::get), Some(model.len()));
                        }
                    }
                    Op::Remove(n) => {
                        let code = format!("{:04}", n);
                        let result = store.remove(&key(&code)).unwrap();
                        match model.iter().position(|c| *c == code) {
                            Some(i) => {
                                model.remove(i);
                                prop_assert_eq!(result.map(Slot::get), Some(i + 1));
                            }
                            None => prop_assert_eq!(result, None),
                        }
                    }
                }
                prop_assert_eq!(codes(&store), model.clone());
            }
        }
    }
}
