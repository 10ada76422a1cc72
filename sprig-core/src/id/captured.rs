//! Captured identities.

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::Equivalent;

use super::IdInterface;

/// An owned copy of the most recently observed identity.
#[derive(Default)]
pub struct CapturedId {
    id: Option<Box<dyn IdInterface>>,
}

impl CapturedId {
    pub fn new(id: &dyn IdInterface) -> Self {
        Self {
            id: Some(id.clone_id()),
        }
    }

    pub fn capture(&mut self, id: &dyn IdInterface) {
        self.id = Some(id.clone_id());
    }

    /// Whether an identity has been captured and equals `id`.
    pub fn matches(&self, id: &dyn IdInterface) -> bool {
        self.id.as_deref().map_or(false, |stored| stored.equals(id))
    }

    pub fn clear(&mut self) {
        self.id = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.id.is_some()
    }

    pub fn get(&self) -> Option<&dyn IdInterface> {
        self.id.as_deref()
    }
}

impl Clone for CapturedId {
    fn clone(&self) -> Self {
        Self {
            id: self.id.as_ref().map(|id| id.clone_id()),
        }
    }
}

impl fmt::Debug for CapturedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "CapturedId({})", &**id),
            None => write!(f, "CapturedId(<none>)"),
        }
    }
}

impl PartialEq for CapturedId {
    fn eq(&self, other: &Self) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a.equals(&**b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for CapturedId {}

impl Hash for CapturedId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.id {
            Some(id) => state.write_u64(id.hash_id()),
            None => state.write_u64(0),
        }
    }
}

/// A borrowed identity used to look up [`CapturedId`] keys without cloning.
///
/// Hashes exactly like the equivalent captured id.
#[derive(Clone, Copy)]
pub struct IdKey<'a>(pub &'a dyn IdInterface);

impl Hash for IdKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash_id())
    }
}

impl Equivalent<CapturedId> for IdKey<'_> {
    fn equivalent(&self, key: &CapturedId) -> bool {
        key.matches(self.0)
    }
}
