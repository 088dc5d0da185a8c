//! Client and request configuration.

use sdata_content::MediaType;
use std::time::Duration;

/// How requests pick an HTTP proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxySetting {
    /// Use the proxies named by the environment (`HTTP_PROXY` and friends).
    #[default]
    System,
    /// Connect directly.
    Disabled,
    /// Send everything through this proxy URL.
    Url(String),
}

/// Configuration shared by requests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-exchange timeout.
    pub timeout: Duration,
    /// How many times a timed-out exchange is retried.
    pub timeout_retry_attempts: u32,
    /// User-Agent header value.
    pub user_agent: String,
    /// Content type used for request bodies written by the client helpers.
    pub format: MediaType,
    /// Media types sent in the `Accept` header, in order. Empty sends none.
    pub accept: Vec<MediaType>,
    /// `Accept-Language` header value.
    pub accept_language: Option<String>,
    /// Tunnel methods other than GET and POST through `X-HTTP-Method-Override`.
    pub use_http_method_override: bool,
    /// Proxy selection.
    pub proxy: ProxySetting,
    /// Accept gzip/deflate encoded responses.
    pub accept_compressed: bool,
    /// Whether to enable request/response tracing.
    pub enable_tracing: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            timeout_retry_attempts: 1,
            user_agent: crate::USER_AGENT.to_string(),
            format: MediaType::Json,
            accept: Vec::new(),
            accept_language: None,
            use_http_method_override: false,
            proxy: ProxySetting::System,
            accept_compressed: true,
            enable_tracing: true,
        }
    }
}

impl ClientConfig {
    /// Create a new client config builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// The `Accept` header value, if any media types are configured.
    pub fn accept_header(&self) -> Option<String> {
        if self.accept.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.accept.iter().map(MediaType::as_str).collect();
        Some(names.join(","))
    }
}

/// Builder for ClientConfig.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the per-exchange timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set how many times a timed-out exchange is retried.
    pub fn with_timeout_retry_attempts(mut self, attempts: u32) -> Self {
        self.config.timeout_retry_attempts = attempts;
        self
    }

    /// Never retry timed-out exchanges.
    pub fn without_timeout_retry(mut self) -> Self {
        self.config.timeout_retry_attempts = 0;
        self
    }

    /// Set custom User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the body format used by the client helpers.
    pub fn with_format(mut self, format: MediaType) -> Self {
        self.config.format = format;
        self
    }

    /// Add a media type to the `Accept` list.
    pub fn accept(mut self, media: MediaType) -> Self {
        self.config.accept.push(media);
        self
    }

    /// Set the `Accept-Language` header.
    pub fn with_accept_language(mut self, language: impl Into<String>) -> Self {
        self.config.accept_language = Some(language.into());
        self
    }

    /// Tunnel PUT, DELETE and friends through POST.
    pub fn with_http_method_override(mut self, enabled: bool) -> Self {
        self.config.use_http_method_override = enabled;
        self
    }

    /// Set the proxy selection.
    pub fn with_proxy(mut self, proxy: ProxySetting) -> Self {
        self.config.proxy = proxy;
        self
    }

    /// Accept or refuse compressed responses.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.config.accept_compressed = enabled;
        self
    }

    /// Enable or disable request/response tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.config.enable_tracing = enabled;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
