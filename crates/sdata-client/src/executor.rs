//! Running a request: one logical call over as many exchanges as redirects
//! and timeout retries need.

use std::sync::{Arc, MutexGuard, PoisonError};

use bytes::Bytes;
use reqwest::header::{
    HeaderMap, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH, LOCATION,
};
use sdata_content::codec::handler;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::ProxySetting;
use crate::error::{Error, ErrorKind, Result};
use crate::multipart::{MimePart, MultipartWriter};
use crate::request::{Credentials, HttpMethod, SDataRequest};
use crate::response::{status_error, SDataResponse};
use crate::retry::TimeoutRetry;

const METHOD_OVERRIDE: &str = "X-HTTP-Method-Override";

/// An encoded request body and the `Content-Type` it travels under.
#[derive(Debug, Clone)]
pub(crate) struct EncodedBody {
    pub(crate) content_type: String,
    pub(crate) bytes: Bytes,
}

/// What came back from one physical exchange.
struct Exchange {
    status: reqwest::StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

enum Failure {
    Transport(reqwest::Error),
    Cancelled,
}

/// Clears the cancellation slot when execution ends, however it ends.
struct TransportSlot<'a>(&'a SDataRequest);

impl Drop for TransportSlot<'_> {
    fn drop(&mut self) {
        *self.0.transport_slot() = None;
    }
}

impl SDataRequest {
    fn transport_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute the request.
    ///
    /// Fails with [`ErrorKind::InProgress`] without sending anything when
    /// this request is already executing.
    #[instrument(skip(self), fields(method = %self.method, uri = %self.uri))]
    pub async fn execute(&self) -> Result<SDataResponse> {
        let _running = self
            .state
            .try_begin()
            .ok_or_else(|| Error::new(ErrorKind::InProgress))?;

        let token = CancellationToken::new();
        *self.transport_slot() = Some(token.clone());
        let _slot = TransportSlot(self);
        if self.state.phase() == crate::state::Phase::Aborted {
            token.cancel();
        }

        self.run(&token).await
    }

    /// Execute the request on the calling thread.
    ///
    /// Drives [`execute`](Self::execute) on a current-thread runtime, so it
    /// must not be called from inside an async context.
    pub fn execute_blocking(&self) -> Result<SDataResponse> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;
        runtime.block_on(self.execute())
    }

    /// Cancel the exchange in flight, which then fails with
    /// [`ErrorKind::Cancelled`]. Does nothing unless the request is running.
    pub fn abort(&self) {
        if self.state.abort() {
            if let Some(token) = self.transport_slot().as_ref() {
                token.cancel();
            }
            if self.config.enable_tracing {
                debug!(uri = %self.uri, "Request aborted");
            }
        }
    }

    async fn run(&self, token: &CancellationToken) -> Result<SDataResponse> {
        let client = self.build_client()?;
        let body = if self.has_content() {
            Some(self.encode_body()?)
        } else {
            None
        };

        let mut target = self.first_target()?;
        let mut redirect_location: Option<String> = None;
        let mut retry = TimeoutRetry::new(self.config.timeout_retry_attempts);

        loop {
            retry.begin_attempt();
            if self.config.enable_tracing {
                debug!(
                    method = %self.method,
                    url = %target,
                    attempt = retry.attempts(),
                    "Sending request"
                );
            }

            let exchange = match self.exchange(&client, &target, body.as_ref(), token).await {
                Ok(exchange) => exchange,
                Err(Failure::Cancelled) => return Err(Error::new(ErrorKind::Cancelled)),
                Err(Failure::Transport(err)) if err.is_timeout() => {
                    if retry.try_consume() {
                        if self.config.enable_tracing {
                            warn!(
                                attempt = retry.attempts(),
                                remaining = retry.remaining(),
                                "Request timed out, retrying"
                            );
                        }
                        continue;
                    }
                    return Err(Error::with_source(
                        ErrorKind::TimeoutRetriesExhausted {
                            attempts: retry.attempts(),
                        },
                        err,
                    ));
                }
                Err(Failure::Transport(err)) => return Err(err.into()),
            };

            let status = exchange.status.as_u16();
            if matches!(status, 302 | 307) {
                let location = header(&exchange.headers, LOCATION).ok_or_else(|| {
                    Error::new(ErrorKind::Transport(format!(
                        "{status} redirect without a Location header"
                    )))
                })?;
                let next = target.join(&location)?;
                if self.config.enable_tracing {
                    debug!(status, location = %next, "Following redirect");
                }
                redirect_location = Some(next.to_string());
                target = next;
                continue;
            }

            let content_type = header(&exchange.headers, CONTENT_TYPE);
            if self.config.enable_tracing {
                let content_length = exchange.body.len();
                if exchange.status.is_success() {
                    debug!(status, content_length, "Response received");
                } else {
                    info!(status, content_length, "Non-success response");
                }
            }

            if status >= 400 {
                return Err(status_error(
                    status,
                    exchange.status.canonical_reason(),
                    content_type.as_deref(),
                    &exchange.body,
                ));
            }

            return SDataResponse::from_parts(
                status,
                content_type,
                header(&exchange.headers, ETAG),
                header(&exchange.headers, LOCATION),
                redirect_location,
                exchange.body,
            );
        }
    }

    async fn exchange(
        &self,
        client: &reqwest::Client,
        target: &Url,
        body: Option<&EncodedBody>,
        token: &CancellationToken,
    ) -> std::result::Result<Exchange, Failure> {
        let request = self.build_exchange(client, target, body);
        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Failure::Cancelled),
            sent = request.send() => sent.map_err(Failure::Transport)?,
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Failure::Cancelled),
            read = response.bytes() => read.map_err(Failure::Transport)?,
        };

        Ok(Exchange {
            status,
            headers,
            body,
        })
    }

    fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(&self.config.user_agent)
            .gzip(self.config.accept_compressed)
            .deflate(self.config.accept_compressed);

        builder = match &self.config.proxy {
            ProxySetting::System => builder,
            ProxySetting::Disabled => builder.no_proxy(),
            ProxySetting::Url(url) => builder.proxy(reqwest::Proxy::all(url.as_str())?),
        };

        if let Some(jar) = &self.cookies {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))
    }

    /// The address of the first exchange, selector included. Redirect
    /// targets are used as given.
    fn first_target(&self) -> Result<Url> {
        let mut url = Url::parse(&self.uri)?;
        if let Some(selector) = &self.selector {
            let path = url.path().to_string();
            let (prefix, segment) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
            let bare = match segment.find('(') {
                Some(open) if segment.ends_with(')') => &segment[..open],
                _ => segment,
            };
            url.set_path(&format!("{prefix}/{bare}({selector})"));
        }
        Ok(url)
    }

    fn build_exchange(
        &self,
        client: &reqwest::Client,
        target: &Url,
        body: Option<&EncodedBody>,
    ) -> reqwest::RequestBuilder {
        let overridden = self.config.use_http_method_override
            && !matches!(self.method, HttpMethod::Get | HttpMethod::Post);
        let method = if overridden {
            reqwest::Method::POST
        } else {
            self.method.to_reqwest()
        };

        let mut req = client
            .request(method, target.clone())
            .timeout(self.config.timeout);

        if overridden {
            req = req.header(METHOD_OVERRIDE, self.method.as_str());
        }
        if let Some(accept) = self.config.accept_header() {
            req = req.header(ACCEPT, accept);
        }
        if let Some(language) = &self.config.accept_language {
            req = req.header(ACCEPT_LANGUAGE, language.as_str());
        }

        req = match &self.credentials {
            Some(Credentials::Basic {
                user_name,
                password,
            }) => req.basic_auth(user_name, password.as_deref()),
            Some(Credentials::Bearer(token)) => req.bearer_auth(token),
            None if self.user_name.is_some() || self.password.is_some() => req.basic_auth(
                self.user_name.as_deref().unwrap_or_default(),
                self.password.as_deref(),
            ),
            None => req,
        };

        if let Some(etag) = &self.etag {
            let name = if self.method == HttpMethod::Get {
                IF_NONE_MATCH
            } else {
                IF_MATCH
            };
            req = req.header(name, etag.as_str());
        }

        if let Some(body) = body {
            req = req
                .header(CONTENT_TYPE, body.content_type.as_str())
                .body(body.bytes.clone());
        }

        req
    }

    /// Encode content, form fields and files into the request body.
    pub(crate) fn encode_body(&self) -> Result<EncodedBody> {
        let media = match (&self.content, self.content_type) {
            (_, Some(media)) => Some(media),
            (Some(content), None) => Some(content.infer_media_type()?),
            (None, None) => None,
        };

        let mut primary = None;
        if let (Some(content), Some(media)) = (&self.content, media) {
            let codec = handler(media)
                .ok_or_else(|| Error::new(ErrorKind::UnsupportedContentType(media.to_string())))?;
            let mut out = Vec::new();
            let wire_type = codec.write_to(content.value(), &mut out)?;
            primary = Some((wire_type, out));
        }

        if !self.is_multipart() {
            let (content_type, bytes) = primary.ok_or_else(|| {
                Error::new(ErrorKind::MissingParameter("content"))
            })?;
            return Ok(EncodedBody {
                content_type: content_type.to_string(),
                bytes: Bytes::from(bytes),
            });
        }

        let mut writer = MultipartWriter::new();
        if let Some((content_type, bytes)) = primary {
            writer.add(MimePart::new(bytes).with_content_type(content_type));
        }
        for (name, value) in &self.form {
            writer.add(
                MimePart::new(value.clone().into_bytes())
                    .with_content_type("text/plain")
                    .with_transfer_encoding("binary")
                    .with_disposition(format!("inline; name={name}")),
            );
        }
        for file in &self.files {
            writer.add(file.to_part());
        }

        let kind = if self.files.is_empty() {
            "form-data"
        } else {
            "related"
        };
        let content_type = format!("multipart/{kind}; boundary={}", writer.boundary());
        Ok(EncodedBody {
            content_type,
            bytes: Bytes::from(writer.finish()),
        })
    }
}

fn header(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
