//! NamedResourceCache: at most one wrapper per remote resource name.
//!
//! Entries are created on first lookup and live as long as the cache.
//! There is no eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

type Factory<T> = Box<dyn Fn(&str) -> T + Send + Sync>;

pub struct NamedResourceCache<T> {
    entries: Mutex<HashMap<String, Arc<T>>>,
    factory: Factory<T>,
}

impl<T> NamedResourceCache<T> {
    pub fn new(factory: impl Fn(&str) -> T + Send + Sync + 'static) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            factory: Box::new(factory),
        }
    }

    /// Existing wrapper for `name`, or a newly built one. Never fetches.
    pub fn get(&self, name: &str) -> Arc<T> {
        // The lock is never held across an await, so a poisoned map is
        // still consistent.
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(name, "creating cached resource wrapper");
                Arc::new((self.factory)(name))
            })
            .clone()
    }
}

#[cfg(test)]
impl<T> NamedResourceCache<T> {
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
