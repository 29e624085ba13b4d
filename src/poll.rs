use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::{timer, Dispatcher, PollOptions, Request, Result, ServiceError};

/// Lifecycle state reported by a long-running job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    /// Any non-terminal state, such as `running` or `notStarted`.
    Pending(String),
}

impl JobStatus {
    /// Reads the `status` field of a job document.
    ///
    /// A document without a string `status` counts as pending.
    pub fn from_body(body: &JsonValue) -> Self {
        match body.get("status").and_then(JsonValue::as_str) {
            Some("succeeded") => Self::Succeeded,
            Some("failed") => Self::Failed,
            Some(other) => Self::Pending(other.to_owned()),
            None => Self::Pending(String::new()),
        }
    }

    /// `succeeded` and `failed` end polling.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending(_))
    }
}

impl Dispatcher {
    /// Polls a job location with the dispatcher's [`PollOptions`].
    pub async fn poll<K, V>(&self, location: &str, headers: &[(K, V)]) -> Result<JsonValue>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.poll_with(location, headers, self.options.poll).await
    }

    /// Issues `GET location` until the job reports a terminal status.
    ///
    /// Returns the whole job document once `status` is `succeeded`. A
    /// `failed` status or a non-success HTTP status ends polling with an
    /// error; neither is retried here.
    ///
    /// `max_polls: Some(0)` is rejected with [`ServiceError::Config`] before
    /// any request is made.
    pub async fn poll_with<K, V>(
        &self,
        location: &str,
        headers: &[(K, V)],
        options: PollOptions,
    ) -> Result<JsonValue>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if options.max_polls == Some(0) {
            return Err(ServiceError::Config("max_polls must be at least 1".to_owned()));
        }

        let request = Request::get(location).headers(
            headers
                .iter()
                .map(|(name, value)| (name.as_ref(), value.as_ref())),
        );
        let interval = Duration::from_millis(options.interval_ms);
        let mut polls = 0usize;

        loop {
            let response = self
                .transport
                .send(&request)
                .await
                .map_err(|source| ServiceError::Transport {
                    attempts: 1,
                    source,
                })?;
            polls += 1;

            let status = response.status();
            if !status.is_success() {
                return Err(ServiceError::Http {
                    status: status.as_u16(),
                    body: response.text(),
                });
            }

            let body: JsonValue = response.json()?;
            match JobStatus::from_body(&body) {
                JobStatus::Succeeded => return Ok(body),
                JobStatus::Failed => return Err(ServiceError::JobFailed { body }),
                JobStatus::Pending(_state) => {
                    if options.max_polls.is_some_and(|max| polls >= max) {
                        return Err(ServiceError::PollTimeout { polls });
                    }

                    #[cfg(feature = "tracing")]
                    tracing::debug!(location, state = %_state, polls, "job still pending");

                    timer::sleep(interval).await;
                }
            }
        }
    }
}
