use std::time::Duration;

/// Configuration for the remote identity store.
///
/// # Example
///
/// ```
/// use fingerlink_storage::StoreConfig;
///
/// let config = StoreConfig::default()
///     .with_base_url("https://example-default-rtdb.firebaseio.com")
///     .with_auth_token("secret");
/// assert_eq!(config.auth_token.as_deref(), Some("secret"));
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database root URL, without trailing slash
    pub base_url: String,

    /// Optional token sent as the `auth` query parameter
    pub auth_token: Option<String>,

    /// Timeout for a single request
    pub request_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000".to_string(),
            auth_token: None,
            request_timeout: Duration::from_millis(10_000),
        }
    }
}

impl StoreConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
