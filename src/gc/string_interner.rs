// String interner - every string is interned so that value cells with the
// same byte sequence are reference-equal. The map holds weak claims only:
// the sweep phase removes entries for unmarked strings.

use ahash::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

use super::object_pool::{Arena, GcString, StringId};

pub struct StringInterner {
    /// Content hash -> candidate ids. Collisions resolved by byte compare.
    map: HashMap<u64, Vec<StringId>, RandomState>,

    hashbuilder: RandomState,
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(256, RandomState::new()),
            hashbuilder: RandomState::new(),
        }
    }

    #[inline(always)]
    pub fn hash_str(&self, s: &str) -> u64 {
        let mut hasher = self.hashbuilder.build_hasher();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Look up an already-interned string by content.
    pub fn find(&self, hash: u64, s: &str, strings: &Arena<GcString>) -> Option<StringId> {
        let candidates = self.map.get(&hash)?;
        for &id in candidates {
            if let Some(obj) = strings.get(id.0) {
                if obj.data.as_str() == s {
                    return Some(id);
                }
            }
        }
        None
    }

    pub fn insert(&mut self, hash: u64, id: StringId) {
        self.map.entry(hash).or_default().push(id);
    }

    /// Called by the sweep phase for each string about to be freed.
    pub fn remove_dead(&mut self, hash: u64, id: StringId) {
        if let Some(ids) = self.map.get_mut(&hash) {
            ids.retain(|&i| i != id);
            if ids.is_empty() {
                self.map.remove(&hash);
            }
        }
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
