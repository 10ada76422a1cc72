//! Keyed Data
//!
//! A value stored together with the identity of the inputs it was computed
//! from. When the inputs change, the value is invalidated.

use crate::id::{CapturedId, IdInterface};

/// A cached value tagged with the identity of its inputs.
pub struct KeyedData<T> {
    key: CapturedId,
    value: Option<T>,
}

impl<T> Default for KeyedData<T> {
    fn default() -> Self {
        Self {
            key: CapturedId::default(),
            value: None,
        }
    }
}

impl<T> KeyedData<T> {
    /// Make `key` the current key. Returns `false` (and drops the value) if
    /// it differs from the previous one.
    pub fn refresh_key(&mut self, key: &dyn IdInterface) -> bool {
        if self.key.matches(key) {
            true
        } else {
            self.key.capture(key);
            self.value = None;
            false
        }
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Drop the value but keep the key.
    pub fn invalidate(&mut self) {
        self.value = None;
    }

    pub fn key(&self) -> &CapturedId {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::make_id;

    #[test]
    fn changing_the_key_drops_the_value() {
        let mut data = KeyedData::default();
        assert!(!data.refresh_key(&make_id(1)));
        data.set("one");
        assert!(data.refresh_key(&make_id(1)));
        assert_eq!(data.get(), Some(&"one"));

        assert!(!data.refresh_key(&make_id(2)));
        assert!(!data.is_valid());
    }
}
