use std::{fmt, sync::Arc, time::Duration};

use crate::{
    timer, CooldownRegistry, Credentials, DispatcherOptions, ReqwestTransport, Request, Response,
    Result, RetryCause, RetryEvent, RetryObserver, RetryPolicy, ServiceClient, ServiceError,
    Transport,
};

/// Performs logical HTTP calls with automatic recovery from rate limiting
/// and transport failures.
///
/// Cloning is cheap; clones share the transport and the cooldown registry.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) options: DispatcherOptions,
    pub(crate) cooldown: CooldownRegistry,
    observer: Option<RetryObserver>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("options", &self.options)
            .field("cooldown", &self.cooldown)
            .field("observer", &self.observer.as_ref().map(|_| "<fn>"))
            .finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherOptions::default())
    }
}

impl Dispatcher {
    /// Creates a dispatcher over a fresh `reqwest` client.
    pub fn new(options: DispatcherOptions) -> Self {
        let transport = ReqwestTransport::new(Duration::from_millis(options.timeout_ms));
        Self::with_transport(transport, options)
    }

    /// Creates a dispatcher over a custom transport.
    ///
    /// `options.timeout_ms` is not applied; the transport owns its timeouts.
    pub fn with_transport(transport: impl Transport + 'static, options: DispatcherOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            cooldown: CooldownRegistry::new(options.cooldown),
            options,
            observer: None,
        }
    }

    /// Installs a hook notified before every retry wait.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Options this dispatcher was built with.
    pub fn options(&self) -> &DispatcherOptions {
        &self.options
    }

    /// Registry shared by every [`ServiceClient`] created from this dispatcher.
    pub fn cooldown(&self) -> &CooldownRegistry {
        &self.cooldown
    }

    /// Creates a named logical client for one endpoint.
    pub fn client(
        &self,
        name: impl Into<String>,
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> ServiceClient {
        ServiceClient::new(self.clone(), name, base_url, credentials)
    }

    /// Sends `request` with the default retry policy.
    pub async fn dispatch(&self, request: &Request) -> Result<Response> {
        self.dispatch_with_policy(request, &self.options.retry).await
    }

    /// Sends `request`, retrying rate-limit responses and transport failures
    /// according to `policy`.
    ///
    /// Returns the first response outside the retryable set that is not an
    /// HTTP error. Fails with [`ServiceError::Http`] on any other error
    /// status, and with [`ServiceError::RetriesExhausted`] or
    /// [`ServiceError::Transport`] once `policy.max_attempts` attempts failed.
    pub async fn dispatch_with_policy(
        &self,
        request: &Request,
        policy: &RetryPolicy,
    ) -> Result<Response> {
        self.run(request, policy, None).await
    }

    /// Retry loop; a retryable status escalates `client`'s cooldown, if given.
    pub(crate) async fn run(
        &self,
        request: &Request,
        policy: &RetryPolicy,
        client: Option<&str>,
    ) -> Result<Response> {
        let max_attempts = policy.attempts();
        let mut attempt = 0usize;
        loop {
            match self.transport.send(request).await {
                Ok(response) => {
                    let status = response.status();

                    if policy.is_retryable(status) {
                        if let Some(client) = client {
                            self.cooldown.escalate(client);
                        }
                        if attempt + 1 >= max_attempts {
                            return Err(ServiceError::RetriesExhausted {
                                status: status.as_u16(),
                                attempts: max_attempts,
                                body: response.text(),
                            });
                        }
                        let delay = policy.delay_for_status(attempt, response.retry_after());
                        self.wait_before_retry(RetryEvent {
                            attempt: attempt + 1,
                            max_attempts,
                            delay,
                            cause: RetryCause::Status(status.as_u16()),
                        })
                        .await;
                        attempt += 1;
                        continue;
                    }

                    if status.is_client_error() || status.is_server_error() {
                        return Err(ServiceError::Http {
                            status: status.as_u16(),
                            body: response.text(),
                        });
                    }

                    return Ok(response);
                }
                Err(err) => {
                    if !err.is_retryable() || attempt + 1 >= max_attempts {
                        return Err(ServiceError::Transport {
                            attempts: attempt + 1,
                            source: err,
                        });
                    }
                    self.wait_before_retry(RetryEvent {
                        attempt: attempt + 1,
                        max_attempts,
                        delay: policy.backoff_delay(attempt),
                        cause: RetryCause::Transport(err.to_string()),
                    })
                    .await;
                    attempt += 1;
                }
            }
        }
    }

    async fn wait_before_retry(&self, event: RetryEvent) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt = event.attempt,
            max_attempts = event.max_attempts,
            delay_ms = event.delay.as_millis() as u64,
            cause = %event.cause,
            "retrying request"
        );

        if let Some(observer) = &self.observer {
            observer(&event);
        }
        timer::sleep(event.delay).await;
    }
}
