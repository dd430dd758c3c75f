// Hybrid table: array part for consecutive integer keys starting at 1,
// hash part for everything else. The reported length is the array part
// length only.

use super::LuaValue;
use ahash::RandomState;
use std::collections::HashMap;

pub struct LuaTable {
    /// Values for integer keys 1..=array.len()
    array: Vec<LuaValue>,

    /// All other non-nil keys
    hash: HashMap<LuaValue, LuaValue, RandomState>,
}

impl LuaTable {
    pub fn new() -> Self {
        Self {
            array: Vec::new(),
            hash: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Index into the array part, if the key is an integer in range for it.
    /// Returns a 1-based index; `array.len() + 1` is the append position.
    #[inline]
    fn array_index(&self, key: &LuaValue) -> Option<usize> {
        let n = key.as_number()?;
        if n < 1.0 || n.floor() != n || !n.is_finite() {
            return None;
        }
        let idx = n as usize;
        if idx <= self.array.len() + 1 {
            Some(idx)
        } else {
            None
        }
    }

    pub fn get(&self, key: &LuaValue) -> LuaValue {
        if let Some(idx) = self.array_index(key) {
            if idx <= self.array.len() {
                return self.array[idx - 1];
            }
            return LuaValue::nil();
        }
        self.hash.get(key).copied().unwrap_or_else(LuaValue::nil)
    }

    /// Setting a key to nil removes it. Appending at `len + 1` migrates any
    /// hash-part successors back into the array part.
    pub fn set(&mut self, key: LuaValue, value: LuaValue) {
        if let Some(idx) = self.array_index(&key) {
            if idx <= self.array.len() {
                self.array[idx - 1] = value;
                if value.is_nil() && idx == self.array.len() {
                    self.shrink_array();
                }
            } else if !value.is_nil() {
                self.array.push(value);
                self.migrate_from_hash();
            }
            return;
        }

        if value.is_nil() {
            self.hash.remove(&key);
        } else {
            self.hash.insert(key, value);
        }
    }

    /// Drop trailing nils left by removals at the array tail.
    fn shrink_array(&mut self) {
        while let Some(last) = self.array.last() {
            if last.is_nil() {
                self.array.pop();
            } else {
                break;
            }
        }
    }

    /// Pull keys len+1, len+2, ... out of the hash part after an append.
    fn migrate_from_hash(&mut self) {
        loop {
            let next_key = LuaValue::number((self.array.len() + 1) as f64);
            match self.hash.remove(&next_key) {
                Some(v) => self.array.push(v),
                None => break,
            }
        }
    }

    /// Length as reported by the `#` operator: the array part only.
    #[inline]
    pub fn array_len(&self) -> usize {
        self.array.len()
    }

    pub fn hash_len(&self) -> usize {
        self.hash.len()
    }

    /// Iterate every live entry, array part first. Used by the GC mark phase.
    pub fn for_each_entry(&self, mut f: impl FnMut(&LuaValue, &LuaValue)) {
        for (i, v) in self.array.iter().enumerate() {
            if !v.is_nil() {
                let key = LuaValue::number((i + 1) as f64);
                f(&key, v);
            }
        }
        for (k, v) in self.hash.iter() {
            f(k, v);
        }
    }
}

impl Default for LuaTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_append_and_len() {
        let mut t = LuaTable::new();
        t.set(LuaValue::number(1.0), LuaValue::number(10.0));
        t.set(LuaValue::number(2.0), LuaValue::number(20.0));
        assert_eq!(t.array_len(), 2);
        assert_eq!(t.get(&LuaValue::number(1.0)), LuaValue::number(10.0));
    }

    #[test]
    fn test_hash_keys_do_not_count_toward_len() {
        let mut t = LuaTable::new();
        t.set(LuaValue::number(1.0), LuaValue::boolean(true));
        t.set(LuaValue::number(10.0), LuaValue::boolean(true));
        assert_eq!(t.array_len(), 1);
        assert_eq!(t.get(&LuaValue::number(10.0)), LuaValue::boolean(true));
    }

    #[test]
    fn test_nil_removes_key() {
        let mut t = LuaTable::new();
        t.set(LuaValue::boolean(true), LuaValue::number(1.0));
        t.set(LuaValue::boolean(true), LuaValue::nil());
        assert!(t.get(&LuaValue::boolean(true)).is_nil());
        assert_eq!(t.hash_len(), 0);
    }

    #[test]
    fn test_hash_migration_into_array() {
        let mut t = LuaTable::new();
        t.set(LuaValue::number(2.0), LuaValue::number(2.0));
        t.set(LuaValue::number(3.0), LuaValue::number(3.0));
        assert_eq!(t.array_len(), 0);
        t.set(LuaValue::number(1.0), LuaValue::number(1.0));
        assert_eq!(t.array_len(), 3);
    }

    #[test]
    fn test_tail_removal_shrinks_array() {
        let mut t = LuaTable::new();
        t.set(LuaValue::number(1.0), LuaValue::number(1.0));
        t.set(LuaValue::number(2.0), LuaValue::number(2.0));
        t.set(LuaValue::number(2.0), LuaValue::nil());
        assert_eq!(t.array_len(), 1);
    }
}
