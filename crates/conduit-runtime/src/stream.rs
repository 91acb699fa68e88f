use std::collections::BTreeMap;

use serde_json::Value;

/// Host-owned ordered collections, keyed by item identity (the `id` field).
#[derive(Debug, Clone, Default)]
pub struct StreamStore {
    streams: BTreeMap<String, Vec<Value>>,
}

impl StreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, name: impl Into<String>, items: Vec<Value>) {
        let name = name.into();
        self.streams.insert(name.clone(), Vec::new());
        for item in items {
            self.insert(&name, item);
        }
    }

    /// Append `item`, or replace in place the item with the same identity.
    pub fn insert(&mut self, name: &str, item: Value) {
        let items = self.streams.entry(name.to_string()).or_default();
        let id = item.get("id").cloned();
        match id.and_then(|id| items.iter().position(|i| i.get("id") == Some(&id))) {
            Some(index) => items[index] = item,
            None => items.push(item),
        }
    }

    /// Remove the item whose identity is `id`. Returns whether one was removed.
    pub fn delete(&mut self, name: &str, id: &Value) -> bool {
        let Some(items) = self.streams.get_mut(name) else {
            return false;
        };
        let before = items.len();
        items.retain(|i| i.get("id") != Some(id));
        items.len() != before
    }

    pub fn items(&self, name: &str) -> &[Value] {
        self.streams.get(name).map_or(&[], Vec::as_slice)
    }
}
