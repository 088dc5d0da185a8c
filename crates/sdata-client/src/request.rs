//! A single SData call: address, method, content and exchange options.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sdata_content::{ContentMapper, MediaType, Shape, Value};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::{ClientConfig, ProxySetting};
use crate::error::{Error, ErrorKind, Result};
use crate::file::AttachedFile;
use crate::state::{ExchangeState, Phase};

/// HTTP request method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit credentials sent with every exchange.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic {
        user_name: String,
        password: Option<String>,
    },
    Bearer(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { user_name, .. } => f
                .debug_struct("Basic")
                .field("user_name", user_name)
                .field("password", &"[REDACTED]")
                .finish(),
            Credentials::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
        }
    }
}

/// The payload of a request, mapped to the generic model up front.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContent {
    value: Value,
    shape: Shape,
    xml: bool,
}

impl RequestContent {
    /// Content already in the generic model.
    pub fn new(value: Value) -> Self {
        let shape = value.shape();
        Self {
            value,
            shape,
            xml: false,
        }
    }

    /// Map a typed value, remembering whether it was a dictionary, a
    /// sequence or a plain object.
    pub fn from_typed<T: Serialize + ?Sized>(mapper: &ContentMapper, content: &T) -> Result<Self> {
        Ok(Self {
            shape: mapper.classify(content),
            value: mapper.serialize(content)?,
            xml: false,
        })
    }

    /// Content written as a plain XML document.
    pub fn xml(value: Value) -> Self {
        Self {
            xml: true,
            ..Self::new(value)
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Value::from(text.into()))
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_xml(&self) -> bool {
        self.xml
    }

    /// The content type used when none is set explicitly. First match wins:
    /// dictionary, sequence, XML document, text, plain object.
    pub fn infer_media_type(&self) -> Result<MediaType> {
        match self.shape {
            Shape::Mapping => Ok(MediaType::AtomEntry),
            Shape::Sequence => Ok(MediaType::Atom),
            _ if self.xml => Ok(MediaType::Xml),
            Shape::Scalar if self.value.as_str().is_some() => Ok(MediaType::Text),
            Shape::Object => Ok(MediaType::AtomEntry),
            Shape::Scalar => Err(Error::new(ErrorKind::UnsupportedContentType(format!(
                "no content type for scalar content {:?}",
                self.value
            )))),
        }
    }
}

/// One SData call.
///
/// A request may be executed many times, but only once at a time: a second
/// [`execute`](Self::execute) while the first is in flight fails with
/// [`ErrorKind::InProgress`] and sends nothing.
pub struct SDataRequest {
    pub(crate) uri: String,
    pub(crate) method: HttpMethod,
    pub(crate) selector: Option<String>,
    pub(crate) content: Option<RequestContent>,
    pub(crate) content_type: Option<MediaType>,
    pub(crate) etag: Option<String>,
    pub(crate) form: Vec<(String, String)>,
    pub(crate) files: Vec<AttachedFile>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) user_name: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) cookies: Option<Arc<reqwest::cookie::Jar>>,
    pub(crate) mapper: ContentMapper,
    pub(crate) config: ClientConfig,
    pub(crate) state: ExchangeState,
    pub(crate) transport: Mutex<Option<CancellationToken>>,
}

impl fmt::Debug for SDataRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SDataRequest")
            .field("uri", &self.uri)
            .field("method", &self.method)
            .field("selector", &self.selector)
            .field("content_type", &self.content_type)
            .field("etag", &self.etag)
            .field("form", &self.form.len())
            .field("files", &self.files.len())
            .field("credentials", &self.credentials)
            .field("user_name", &self.user_name)
            .field("phase", &self.state.phase())
            .finish_non_exhaustive()
    }
}

impl SDataRequest {
    /// A GET for `uri` with the default configuration.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            method: HttpMethod::Get,
            selector: None,
            content: None,
            content_type: None,
            etag: None,
            form: Vec::new(),
            files: Vec::new(),
            credentials: None,
            user_name: None,
            password: None,
            cookies: None,
            mapper: ContentMapper::default(),
            config: ClientConfig::default(),
            state: ExchangeState::default(),
            transport: Mutex::new(None),
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Selector substituted into the last path segment, e.g. `'A1'`.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Map `content` with this request's mapper and send it as the body.
    pub fn with_content<T: Serialize + ?Sized>(mut self, content: &T) -> Result<Self> {
        self.content = Some(RequestContent::from_typed(&self.mapper, content)?);
        Ok(self)
    }

    pub fn with_request_content(mut self, content: RequestContent) -> Self {
        self.content = Some(content);
        self
    }

    /// Send the body with this content type instead of inferring one.
    pub fn with_content_type(mut self, media: MediaType) -> Self {
        self.content_type = Some(media);
        self
    }

    /// `If-None-Match` on GET, `If-Match` otherwise.
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Add a form field. Field names compare without regard to ASCII case; a
    /// repeated name replaces the earlier value.
    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.form.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(slot) => slot.1 = value,
            None => self.form.push((name, value)),
        }
        self
    }

    pub fn with_file(mut self, file: AttachedFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Basic credentials used when no explicit [`Credentials`] are set.
    pub fn with_user(mut self, user_name: impl Into<String>, password: Option<String>) -> Self {
        self.user_name = Some(user_name.into());
        self.password = password;
        self
    }

    pub fn with_cookies(mut self, jar: Arc<reqwest::cookie::Jar>) -> Self {
        self.cookies = Some(jar);
        self
    }

    /// Mapper used by [`with_content`](Self::with_content). Set it first.
    pub fn with_mapper(mut self, mapper: ContentMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_timeout_retry_attempts(mut self, attempts: u32) -> Self {
        self.config.timeout_retry_attempts = attempts;
        self
    }

    pub fn with_accept(mut self, accept: Vec<MediaType>) -> Self {
        self.config.accept = accept;
        self
    }

    pub fn with_accept_language(mut self, language: impl Into<String>) -> Self {
        self.config.accept_language = Some(language.into());
        self
    }

    pub fn with_http_method_override(mut self, enabled: bool) -> Self {
        self.config.use_http_method_override = enabled;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxySetting) -> Self {
        self.config.proxy = proxy;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    pub fn content(&self) -> Option<&RequestContent> {
        self.content.as_ref()
    }

    pub fn content_type(&self) -> Option<MediaType> {
        self.content_type
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn form(&self) -> &[(String, String)] {
        &self.form
    }

    pub fn files(&self) -> &[AttachedFile] {
        &self.files
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn mapper(&self) -> &ContentMapper {
        &self.mapper
    }

    /// Where the request is in its lifecycle.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// True when a body will be sent: content, form fields or files.
    pub fn has_content(&self) -> bool {
        self.content.is_some() || !self.form.is_empty() || !self.files.is_empty()
    }

    /// True when the body is multipart.
    pub fn is_multipart(&self) -> bool {
        !self.form.is_empty() || !self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdata_content::Resource;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Account {
        name: String,
    }

    #[test]
    fn test_request_builder() {
        let req = SDataRequest::new("http://example.com/sdata/app/-/accounts")
            .with_method(HttpMethod::Put)
            .with_selector("'A1'")
            .with_etag("e1")
            .with_form_field("Name", "one")
            .with_form_field("name", "two")
            .with_timeout_retry_attempts(3);

        assert_eq!(req.method(), HttpMethod::Put);
        assert_eq!(req.selector(), Some("'A1'"));
        assert_eq!(req.etag(), Some("e1"));
        assert_eq!(req.form(), &[("Name".to_string(), "two".to_string())]);
        assert_eq!(req.config().timeout_retry_attempts, 3);
        assert!(req.has_content());
        assert!(req.is_multipart());
        assert_eq!(req.phase(), Phase::Idle);
    }

    #[test]
    fn test_inferred_content_types() {
        let mapper = ContentMapper::default();

        let mut dict = BTreeMap::new();
        dict.insert("a", 1);
        let content = RequestContent::from_typed(&mapper, &dict).unwrap();
        assert_eq!(content.infer_media_type().unwrap(), MediaType::AtomEntry);

        let content = RequestContent::from_typed(&mapper, &vec![1, 2]).unwrap();
        assert_eq!(content.infer_media_type().unwrap(), MediaType::Atom);

        let content = RequestContent::xml(Value::from(Resource::new().field("a", 1i64)));
        assert_eq!(content.infer_media_type().unwrap(), MediaType::Xml);

        let content = RequestContent::from_typed(&mapper, "hello").unwrap();
        assert_eq!(content.infer_media_type().unwrap(), MediaType::Text);

        let account = Account { name: "Acme".into() };
        let content = RequestContent::from_typed(&mapper, &account).unwrap();
        assert_eq!(content.shape(), Shape::Object);
        assert_eq!(content.infer_media_type().unwrap(), MediaType::AtomEntry);

        let content = RequestContent::from_typed(&mapper, &42).unwrap();
        let err = content.infer_media_type().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedContentType(_)));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let basic = Credentials::Basic {
            user_name: "admin".into(),
            password: Some("hunter2".into()),
        };
        let debug = format!("{basic:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));

        let bearer = format!("{:?}", Credentials::Bearer("secret-token".into()));
        assert!(!bearer.contains("secret-token"));
    }

    #[test]
    fn test_without_content() {
        let req = SDataRequest::new("http://example.com");
        assert!(!req.has_content());
        assert!(!req.is_multipart());
        assert_eq!(req.method(), HttpMethod::Get);
    }
}
