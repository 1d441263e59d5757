use crate::types::IndexMap;
use parking_lot::Mutex;

/// Free-form diagnostic annotations attached to a node.
///
/// Anomaly tooling stores things like the creation context of the node here
/// and prints them when the node's backward step misbehaves. Entries keep
/// insertion order.
#[derive(Debug, Default)]
pub struct AnomalyMetadata {
    entries: Mutex<IndexMap<String, String>>,
}

impl AnomalyMetadata {
    /// Insert or overwrite `key`, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.lock().insert(key.into(), value.into())
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
