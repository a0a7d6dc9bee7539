//! The minimal upstream configuration surface.
//!
//! The overlay consumes the underlying hierarchical configuration tree
//! through this interface only: full enumeration, indexer-style get/set,
//! and a single-fire change token that must be re-registered after every
//! delivery to keep observing changes.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Callback registered on a change token. Fires at most once.
pub type ChangeCallback = Box<dyn FnOnce() + Send>;

/// Hierarchical string key/value store with case-insensitive keys and
/// `:`-delimited sections.
pub trait ConfigSource: Send + Sync {
    /// Current key/value pairs, flattened. Section keys that carry no value
    /// of their own enumerate as `None`.
    fn entries(&self) -> Vec<(String, Option<String>)>;

    /// Value at `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Sets `key` to `value`.
    fn set(&self, key: &str, value: &str);

    /// Registers a single-fire change callback. After it fires, a new
    /// callback must be registered to observe further changes.
    fn on_change(&self, callback: ChangeCallback);
}

/// In-memory [`ConfigSource`].
///
/// Mutations do not fire change tokens on their own, matching stores whose
/// reload is driven by an external watcher; call
/// [`notify_changed`](Self::notify_changed) to deliver pending tokens the
/// way a file watcher would after an edit.
#[derive(Default)]
pub struct MemorySource {
    // lowercased key -> (original key, value)
    entries: Mutex<HashMap<String, (String, Option<String>)>>,
    watchers: Mutex<Vec<ChangeCallback>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a source from literal key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source = Self::new();
        {
            let mut entries = source.entries.lock();
            for (key, value) in pairs {
                let key = key.into();
                entries.insert(key.to_lowercase(), (key, Some(value.into())));
            }
        }
        source
    }

    /// Builds a source from a JSON document, flattening nested objects and
    /// arrays into `:`-delimited keys (`{"a":{"b":1}}` becomes `a:b = "1"`).
    /// Section keys enumerate with no value, array elements by index.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let source = Self::new();
        {
            let mut entries = source.entries.lock();
            flatten_json("", &value, &mut entries);
        }
        Ok(source)
    }

    /// Delivers every registered change token once, as an external watcher
    /// would after the backing data changed.
    pub fn notify_changed(&self) {
        let pending: Vec<ChangeCallback> = std::mem::take(&mut *self.watchers.lock());
        for callback in pending {
            callback();
        }
    }
}

impl ConfigSource for MemorySource {
    fn entries(&self) -> Vec<(String, Option<String>)> {
        self.entries.lock().values().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .get(&key.to_lowercase())
            .and_then(|(_, value)| value.clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.lock().insert(
            key.to_lowercase(),
            (key.to_string(), Some(value.to_string())),
        );
    }

    fn on_change(&self, callback: ChangeCallback) {
        self.watchers.lock().push(callback);
    }
}

fn flatten_json(
    prefix: &str,
    value: &serde_json::Value,
    out: &mut HashMap<String, (String, Option<String>)>,
) {
    match value {
        serde_json::Value::Object(map) => {
            if !prefix.is_empty() {
                out.insert(prefix.to_lowercase(), (prefix.to_string(), None));
            }
            for (key, child) in map {
                let child_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}:{key}")
                };
                flatten_json(&child_key, child, out);
            }
        }
        serde_json::Value::Array(items) => {
            if !prefix.is_empty() {
                out.insert(prefix.to_lowercase(), (prefix.to_string(), None));
            }
            for (index, child) in items.iter().enumerate() {
                flatten_json(&format!("{prefix}:{index}"), child, out);
            }
        }
        serde_json::Value::Null => {
            out.insert(prefix.to_lowercase(), (prefix.to_string(), None));
        }
        serde_json::Value::String(text) => {
            out.insert(prefix.to_lowercase(), (prefix.to_string(), Some(text.clone())));
        }
        other => {
            out.insert(
                prefix.to_lowercase(),
                (prefix.to_string(), Some(other.to_string())),
            );
        }
    }
}
