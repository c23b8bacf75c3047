//! In-process document store.
//!
//! Holds the whole tree as one JSON value and supports simple failure
//! injection, which makes it the test double for every engine. Clones share
//! the same tree.

use crate::{RemoteStore, StorageError, StorageResult};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

#[derive(Debug)]
struct MemoryState {
    root: Value,
    offline: bool,
    failing_reads: Vec<String>,
    failing_writes: Vec<String>,
    writes: Vec<String>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
            offline: false,
            failing_reads: Vec::new(),
            failing_writes: Vec::new(),
            writes: Vec::new(),
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn under(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn assign(root: &mut Value, path: &str, document: Value) {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = parts.split_last() else {
        *root = document;
        return;
    };

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        if document.is_null() {
            map.remove(*last);
        } else {
            map.insert(last.to_string(), document);
        }
    }
}

/// In-memory [`RemoteStore`].
///
/// # Example
///
/// ```
/// use fingerlink_storage::{MemoryStore, RemoteStore};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> fingerlink_storage::StorageResult<()> {
///     let store = MemoryStore::new();
///     store.put("indices_sensor/3", &json!({"usuario_id": "u"})).await?;
///
///     let index = store.get("indices_sensor").await?.unwrap();
///     assert!(index.get("3").is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a document without going through the async interface.
    pub fn seed(&self, path: &str, document: Value) {
        assign(&mut self.lock().root, path, document);
    }

    /// Current document at `path`.
    pub fn document(&self, path: &str) -> Option<Value> {
        lookup(&self.lock().root, path).cloned()
    }

    /// Make every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Fail reads of any path starting with `prefix`.
    pub fn fail_reads_under(&self, prefix: impl Into<String>) {
        self.lock().failing_reads.push(prefix.into());
    }

    /// Fail writes to any path starting with `prefix`.
    pub fn fail_writes_under(&self, prefix: impl Into<String>) {
        self.lock().failing_writes.push(prefix.into());
    }

    /// Paths written so far, oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }
}

impl RemoteStore for MemoryStore {
    async fn get(&self, path: &str) -> StorageResult<Option<Value>> {
        let state = self.lock();
        if state.offline || under(path, &state.failing_reads) {
            return Err(StorageError::unavailable(format!("read of {path} failed")));
        }
        trace!(path, "Memory store read");
        Ok(lookup(&state.root, path).filter(|v| !v.is_null()).cloned())
    }

    async fn put(&self, path: &str, document: &Value) -> StorageResult<()> {
        let mut state = self.lock();
        if state.offline || under(path, &state.failing_writes) {
            return Err(StorageError::unavailable(format!("write to {path} failed")));
        }
        trace!(path, "Memory store write");
        assign(&mut state.root, path, document.clone());
        state.writes.push(path.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_then_get_nested() {
        let store = MemoryStore::new();
        store
            .put("usuarios/u1", &json!({"nombre": "Ana"}))
            .await
            .unwrap();

        let user = store.get("usuarios/u1").await.unwrap().unwrap();
        assert_eq!(user["nombre"], "Ana");

        let all = store.get("usuarios").await.unwrap().unwrap();
        assert!(all.get("u1").is_some());
    }

    #[tokio::test]
    async fn test_missing_path_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("indices_sensor/9").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_null_removes() {
        let store = MemoryStore::new();
        store.seed("display", json!({"mensaje": "hola"}));
        store.put("display", &Value::Null).await.unwrap();
        assert_eq!(store.get("display").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryStore::new();
        store.fail_writes_under("indices_sensor");

        assert!(store.put("indices_sensor/1", &json!({})).await.is_err());
        assert!(store.put("usuarios/u", &json!({})).await.is_ok());
        assert_eq!(store.writes(), vec!["usuarios/u".to_string()]);

        store.set_offline(true);
        assert!(store.get("usuarios/u").await.is_err());
    }

    #[test]
    fn test_lookup_into_array() {
        let root = json!({"indices_sensor": [null, {"usuario_id": "a"}]});
        assert_eq!(
            lookup(&root, "indices_sensor/1/usuario_id"),
            Some(&json!("a"))
        );
    }
}
