//! High-level SData client bound to one base address.

use std::sync::Arc;

use reqwest::cookie::Jar;
use sdata_content::{
    get_protocol_value, ContentMapper, MediaType, ProtocolObject, ProtocolProperty,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::file::AttachedFile;
use crate::request::{Credentials, HttpMethod, RequestContent, SDataRequest};
use crate::response::SDataResponse;
use crate::security::{selector, url as url_util};

/// Everything one call adds to the client's base address and defaults.
#[derive(Debug, Clone, Default)]
pub struct SDataParameters {
    /// Resource path relative to the base address, e.g. `accounts`.
    pub path: String,
    pub selector: Option<String>,
    pub method: HttpMethod,
    pub content: Option<RequestContent>,
    pub content_type: Option<MediaType>,
    pub etag: Option<String>,
    pub include: Vec<String>,
    pub select: Vec<String>,
    pub precedence: Option<u32>,
    /// Extra query pairs, appended as given.
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub files: Vec<AttachedFile>,
}

impl SDataParameters {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_content(mut self, content: RequestContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_content_type(mut self, media: MediaType) -> Self {
        self.content_type = Some(media);
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn include(mut self, path: impl Into<String>) -> Self {
        self.include.push(path.into());
        self
    }

    pub fn select(mut self, path: impl Into<String>) -> Self {
        self.select.push(path.into());
        self
    }

    pub fn with_precedence(mut self, precedence: u32) -> Self {
        self.precedence = Some(precedence);
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    pub fn with_file(mut self, file: AttachedFile) -> Self {
        self.files.push(file);
        self
    }
}

/// Client for one SData endpoint.
///
/// Every call builds a fresh [`SDataRequest`] from the client's settings;
/// the cookie jar is shared across them.
#[derive(Debug, Clone)]
pub struct SDataClient {
    base_uri: String,
    credentials: Option<Credentials>,
    config: ClientConfig,
    mapper: ContentMapper,
    cookies: Arc<Jar>,
}

impl SDataClient {
    /// Create a client for `base_uri`, e.g. `http://host/sdata/app/contract/-`.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            credentials: None,
            config: ClientConfig::default(),
            mapper: ContentMapper::default(),
            cookies: Arc::new(Jar::default()),
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_mapper(mut self, mapper: ContentMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn mapper(&self) -> &ContentMapper {
        &self.mapper
    }

    pub fn cookies(&self) -> &Arc<Jar> {
        &self.cookies
    }

    /// Build the request `params` describe without sending it.
    pub fn request(&self, params: SDataParameters) -> Result<SDataRequest> {
        let address = self.address(&params)?;

        let mut request = SDataRequest::new(address)
            .with_method(params.method)
            .with_config(self.config.clone())
            .with_mapper(self.mapper.clone())
            .with_cookies(Arc::clone(&self.cookies));

        if let Some(credentials) = &self.credentials {
            request = request.with_credentials(credentials.clone());
        }
        if let Some(selector) = params.selector {
            request = request.with_selector(selector);
        }
        if let Some(content) = params.content {
            request = request.with_request_content(content);
        }
        if let Some(media) = params.content_type {
            request = request.with_content_type(media);
        }
        if let Some(etag) = params.etag {
            request = request.with_etag(etag);
        }
        for (name, value) in params.form {
            request = request.with_form_field(name, value);
        }
        for file in params.files {
            request = request.with_file(file);
        }

        Ok(request)
    }

    fn address(&self, params: &SDataParameters) -> Result<String> {
        let joined = url_util::join_path(&self.base_uri, &params.path);
        let mut url = Url::parse(&joined)?;

        let include = selector::build_property_list(&params.include);
        let select = selector::build_property_list(&params.select);
        let has_query = include.is_some()
            || select.is_some()
            || params.precedence.is_some()
            || !params.query.is_empty();

        if has_query {
            let mut pairs = url.query_pairs_mut();
            if let Some(include) = &include {
                pairs.append_pair("include", include);
            }
            if let Some(select) = &select {
                pairs.append_pair("select", select);
            }
            if let Some(precedence) = params.precedence {
                pairs.append_pair("precedence", &precedence.to_string());
            }
            for (name, value) in &params.query {
                pairs.append_pair(name, value);
            }
        }

        Ok(url.into())
    }

    /// Execute a call. Statuses of 400 and above surface as
    /// [`ErrorKind::Status`] with the server's diagnoses.
    #[instrument(skip(self, params), fields(path = %params.path, method = %params.method))]
    pub async fn execute(&self, params: SDataParameters) -> Result<SDataResponse> {
        let request = self.request(params)?;
        if self.config.enable_tracing {
            debug!(uri = %request.uri(), "Executing SData call");
        }
        request.execute().await
    }

    /// Blocking form of [`execute`](Self::execute).
    pub fn execute_blocking(&self, params: SDataParameters) -> Result<SDataResponse> {
        self.request(params)?.execute_blocking()
    }

    /// Read the resource `key` from `path`.
    ///
    /// Returns `None` when the server answers without content.
    pub async fn get<T>(&self, key: &str, path: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + 'static,
    {
        if path.is_empty() {
            return Err(Error::new(ErrorKind::MissingParameter("path")));
        }
        if key.is_empty() {
            return Err(Error::new(ErrorKind::MissingParameter("key")));
        }

        let params = SDataParameters::new(path).with_selector(selector::format_constant(key));
        let response = self.execute(params).await?;
        response.content_as(&self.mapper)
    }

    /// Create `content` under `path`, returning what the server sends back.
    pub async fn post<T>(&self, content: &T, path: &str) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        if path.is_empty() {
            return Err(Error::new(ErrorKind::MissingParameter("path")));
        }

        let params = SDataParameters::new(path)
            .with_method(HttpMethod::Post)
            .with_content(RequestContent::from_typed(&self.mapper, content)?)
            .with_content_type(self.config.format);
        let response = self.execute(params).await?;
        response.content_as(&self.mapper)
    }

    /// Replace the resource `content` identifies. Its key selects the
    /// resource and its ETag, if any, becomes the precondition.
    pub async fn put<T>(&self, content: &T, path: &str) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + ProtocolObject,
    {
        let params = self
            .keyed(content, path, HttpMethod::Put)?
            .with_content(RequestContent::from_typed(&self.mapper, content)?)
            .with_content_type(self.config.format);
        let response = self.execute(params).await?;
        response.content_as(&self.mapper)
    }

    /// Delete the resource `content` identifies.
    pub async fn delete<T: ProtocolObject>(&self, content: &T, path: &str) -> Result<()> {
        let params = self.keyed(content, path, HttpMethod::Delete)?;
        self.execute(params).await.map(|_| ())
    }

    fn keyed<T: ProtocolObject>(
        &self,
        content: &T,
        path: &str,
        method: HttpMethod,
    ) -> Result<SDataParameters> {
        if path.is_empty() {
            return Err(Error::new(ErrorKind::MissingParameter("path")));
        }
        let key = get_protocol_value(content, ProtocolProperty::Key)
            .and_then(|k| k.to_text())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::new(ErrorKind::MissingParameter("key")))?;

        let mut params = SDataParameters::new(path)
            .with_method(method)
            .with_selector(selector::format_constant(&key));
        if let Some(etag) = get_protocol_value(content, ProtocolProperty::ETag)
            .and_then(|e| e.to_text())
            .filter(|e| !e.is_empty())
        {
            params = params.with_etag(etag);
        }
        Ok(params)
    }
}
