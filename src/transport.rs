use std::{fmt, future::Future, pin::Pin, time::Duration};

use reqwest::header::{HeaderName, HeaderValue};

use crate::{request::Body, Request, Response, TransportError};

/// Future returned by [`Transport::send`].
#[cfg(not(target_arch = "wasm32"))]
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Response, TransportError>> + Send + 'a>>;

/// Future returned by [`Transport::send`].
///
/// Browser fetch futures are not `Send`, so neither is this one on WASM.
#[cfg(target_arch = "wasm32")]
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Response, TransportError>> + 'a>>;

/// Issues one physical HTTP request and buffers the whole response.
///
/// Implementations must not retry; the dispatcher owns retry decisions.
pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, request: &'a Request) -> TransportFuture<'a>;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReqwestTransport {
    /// Builds a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    /// Wraps an existing client, e.g. one with custom TLS or proxy settings.
    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    fn build(&self, request: &Request) -> Result<reqwest::RequestBuilder, TransportError> {
        let url = reqwest::Url::parse(request.url()).map_err(|err| {
            TransportError::invalid_request(format!("invalid url '{}': {err}", request.url()))
        })?;

        // On WASM, reqwest uses AbortController for the timeout.
        let mut builder = self
            .http
            .request(request.method().clone(), url)
            .timeout(self.timeout);

        for (name, value) in request.header_list() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                TransportError::invalid_request(format!("invalid header name '{name}': {err}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| {
                TransportError::invalid_request(format!("invalid value for header '{name}': {err}"))
            })?;
            builder = builder.header(name, value);
        }

        Ok(match request.body() {
            Some(Body::Json(value)) => builder.body(value.to_string()),
            Some(Body::Bytes(bytes)) => builder.body(bytes.clone()),
            None => builder,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(&'a self, request: &'a Request) -> TransportFuture<'a> {
        Box::pin(async move {
            let response = self.build(request)?.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok(Response::new(status, headers, body.to_vec()))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ReqwestTransport;
    use crate::{Request, Transport};

    #[tokio::test]
    async fn malformed_url_is_not_retryable() {
        let transport = ReqwestTransport::new(Duration::from_secs(1));
        let request = Request::get("not a url");
        let err = transport.send(&request).await.expect_err("must fail");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn malformed_header_is_not_retryable() {
        let transport = ReqwestTransport::new(Duration::from_secs(1));
        let request = Request::get("http://127.0.0.1:9/").header("bad header", "x");
        let err = transport.send(&request).await.expect_err("must fail");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("bad header"));
    }
}
