//! Realtime-database style REST store.
//!
//! Every path maps to `{base_url}/{path}.json`. `GET` returns the subtree or
//! `null`, `PUT` replaces it. An optional token goes in the `auth` query
//! parameter.

use crate::{RemoteStore, StorageError, StorageResult, StoreConfig};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

/// [`RemoteStore`] over HTTP.
#[derive(Debug, Clone)]
pub struct FirebaseStore {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl FirebaseStore {
    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` for an empty base URL and
    /// `StorageError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StoreConfig) -> StorageResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StorageError::Configuration(
                "remote store base URL is empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;
        debug!(base_url = %base_url, "Remote store client ready");

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    /// Full URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }
}

impl RemoteStore for FirebaseStore {
    async fn get(&self, path: &str) -> StorageResult<Option<Value>> {
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(path, status = status.as_u16(), "Remote read failed");
            return Err(StorageError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let document: Value = response.json().await?;
        debug!(path, found = !document.is_null(), "Remote read");
        Ok(Some(document).filter(|d| !d.is_null()))
    }

    async fn put(&self, path: &str, document: &Value) -> StorageResult<()> {
        let response = self
            .authorize(self.client.put(self.url(path)))
            .json(document)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(path, status = status.as_u16(), "Remote write failed");
            return Err(StorageError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(path, "Remote write");
        Ok(())
    }
}
