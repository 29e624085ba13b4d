use std::time::Duration;

use reqwest::Method;
use serde_json::Value as JsonValue;

use crate::{Credentials, Dispatcher, Request, Response, Result, RetryPolicy, ServiceError};

/// Response header naming the status URL of an accepted long-running job.
pub const OPERATION_LOCATION: &str = "operation-location";

/// A named logical client of one downstream endpoint.
///
/// Operations issued through the same name are spaced by the dispatcher's
/// cooldown registry, including across clones and across separate
/// `ServiceClient` values that share a name and a dispatcher.
#[derive(Clone, Debug)]
pub struct ServiceClient {
    dispatcher: Dispatcher,
    name: String,
    base_url: String,
    credentials: Credentials,
    retry: RetryPolicy,
}

impl ServiceClient {
    /// Creates a client on `dispatcher`; prefer [`Dispatcher::client`].
    ///
    /// The retry policy starts as the dispatcher's and can be replaced with
    /// [`ServiceClient::with_retry_policy`].
    pub fn new(
        dispatcher: Dispatcher,
        name: impl Into<String>,
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        let retry = dispatcher.options().retry.clone();
        Self {
            dispatcher,
            name: name.into(),
            base_url: base_url.into(),
            credentials,
            retry,
        }
    }

    /// Creates a client from environment variables, on a default dispatcher.
    ///
    /// Reads:
    /// - `{PREFIX}_ENDPOINT`: base URL of the resource
    /// - `{PREFIX}_API_KEY`: secret
    /// - `{PREFIX}_AUTH` (optional): `subscription-key` (default), `api-key` or `bearer`
    ///
    /// **Not available on `wasm32` targets**; environment variables do not
    /// exist in browser runtimes.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cogsvc_http::ServiceClient;
    ///
    /// let vision = ServiceClient::from_env("vision", "COGSVC").expect("missing COGSVC_* env vars");
    /// ```
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env(name: impl Into<String>, prefix: &str) -> Result<Self> {
        Self::from_env_with(Dispatcher::default(), name, prefix)
    }

    /// Like [`ServiceClient::from_env`], sharing an existing dispatcher.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env_with(
        dispatcher: Dispatcher,
        name: impl Into<String>,
        prefix: &str,
    ) -> Result<Self> {
        let endpoint = required_env(&format!("{prefix}_ENDPOINT"))?;
        let secret = required_env(&format!("{prefix}_API_KEY"))?;
        let scheme = match std::env::var(format!("{prefix}_AUTH")) {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => crate::AuthScheme::SubscriptionKey,
        };
        Ok(Self::new(
            dispatcher,
            name,
            endpoint.trim(),
            scheme.credentials(secret),
        ))
    }

    /// Overrides the retry policy for this client's operations.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Name keying this client's cooldown record.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL that relative paths are joined onto.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Dispatcher shared with every client created alongside this one.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Current minimum spacing between this client's operations.
    pub fn cooldown_interval(&self) -> Duration {
        self.dispatcher.cooldown().interval(&self.name)
    }

    /// Resolves `path` against the base URL; absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            return path.to_owned();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Builds a request to `path` carrying this client's credentials.
    pub fn request(&self, method: Method, path: &str) -> Request {
        let request = Request::new(method, self.url(path));
        match self.credentials.header() {
            Some((name, value)) => request.header(name, value),
            None => request,
        }
    }

    /// `GET` request to `path`, see [`ServiceClient::request`].
    pub fn get(&self, path: &str) -> Request {
        self.request(Method::GET, path)
    }

    /// `POST` request to `path`, see [`ServiceClient::request`].
    pub fn post(&self, path: &str) -> Request {
        self.request(Method::POST, path)
    }

    /// Runs one logical operation: waits out the cooldown, then dispatches.
    ///
    /// Any rate-limit response seen along the way widens this client's
    /// cooldown for good, even if a later attempt succeeds.
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.dispatcher.cooldown().acquire(&self.name).await;
        self.dispatcher
            .run(&request, &self.retry, Some(&self.name))
            .await
    }

    /// Submits a long-running job and polls it until it finishes.
    ///
    /// The submission must answer with an `Operation-Location` header; the
    /// job document found there is returned once it reports `succeeded`.
    pub async fn submit_job(&self, request: Request) -> Result<JsonValue> {
        let response = self.send(request).await?;
        let location = response
            .header(OPERATION_LOCATION)
            .ok_or_else(|| ServiceError::MissingHeader(OPERATION_LOCATION.to_owned()))?
            .to_owned();

        #[cfg(feature = "tracing")]
        tracing::debug!(client = %self.name, location = %location, "job accepted");

        let headers: Vec<(&str, &str)> = self.credentials.header().into_iter().collect();
        self.dispatcher.poll(&location, &headers).await
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn required_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .map_err(|_| ServiceError::Config(format!("missing {key} environment variable")))?;
    if value.trim().is_empty() {
        return Err(ServiceError::Config(format!("{key} is set but empty")));
    }
    Ok(value)
}
