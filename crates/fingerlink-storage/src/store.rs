#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use serde_json::Value;

/// Path-addressed JSON document store.
///
/// Paths are slash-separated (`usuarios/user_3_1700000000000`). Reading a
/// path that holds nothing yields `Ok(None)`; writing replaces the whole
/// subtree at that path.
///
/// # Implementation Note
///
/// This trait uses native async trait methods (Edition 2024), so it is used
/// through generics rather than `dyn`.
pub trait RemoteStore: Send + Sync {
    /// Fetch the document at `path`.
    async fn get(&self, path: &str) -> StorageResult<Option<Value>>;

    /// Replace the document at `path`.
    async fn put(&self, path: &str, document: &Value) -> StorageResult<()>;
}

impl<S: RemoteStore> RemoteStore for &S {
    async fn get(&self, path: &str) -> StorageResult<Option<Value>> {
        (**self).get(path).await
    }

    async fn put(&self, path: &str, document: &Value) -> StorageResult<()> {
        (**self).put(path, document).await
    }
}
