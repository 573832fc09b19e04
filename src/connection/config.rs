use crate::core::{RaplError, Result};
use std::time::Duration;

/// HTTP connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Base URL every relative request URI is joined onto. Always ends with `/`.
    pub base_url: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Per-request timeout
    pub request_timeout: Option<Duration>,

    /// User agent sent with every request
    pub user_agent: String,

    /// Headers added to every request
    pub default_headers: Vec<(String, String)>,
}

impl ConnectionConfig {
    /// Create a new connection configuration for `base_url`
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            connect_timeout: Duration::from_secs(30),
            request_timeout: None,
            user_agent: format!("rapl/{}", env!("CARGO_PKG_VERSION")),
            default_headers: vec![("Accept".to_string(), "application/json".to_string())],
        }
    }

    /// Set connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Add a header sent with every request, replacing an earlier one of the same name
    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.default_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    /// Parse from a base URL
    ///
    /// Format: "http(s)://host[:port][/path]"
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = ConnectionConfig::from_url("https://api.example.com/v1")?;
    /// assert_eq!(config.base_url, "https://api.example.com/v1/");
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
            .ok_or_else(|| {
                RaplError::Configuration("URL must start with 'http://' or 'https://'".to_string())
            })?;

        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            return Err(RaplError::Configuration(format!("URL '{}' has no host", url)));
        }

        Ok(Self::new(url))
    }

    /// Join a relative request URI onto the base URL.
    pub fn join(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return uri.to_string();
        }
        format!("{}{}", self.base_url, uri.trim_start_matches('/'))
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
