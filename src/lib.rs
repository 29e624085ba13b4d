//! `cogsvc-http` is an async HTTP client for hosted cognitive-service APIs.
//!
//! The core is a resilient request dispatcher:
//! - [`Dispatcher::dispatch`] retries rate-limited calls with server-supplied
//!   or exponential backoff
//! - [`ServiceClient::send`] spaces the operations of one logical client
//!   through a cooldown that widens after the first rate limit
//! - [`Dispatcher::poll`] and [`ServiceClient::submit_job`] turn
//!   "submit, then poll" job APIs into a single call
//!
//! On top of it sit typed operations: chat completion, image analysis,
//! content-safety scoring and a connection check.

mod analysis;
mod auth;
mod chat;
mod client;
mod cooldown;
mod dispatcher;
mod error;
mod options;
mod poll;
mod request;
mod response;
mod retry;
mod timer;
mod transport;

#[cfg(test)]
mod test_utils;

pub use analysis::{
    ImageInput, CONTENT_SAFETY_API_VERSION, SAFETY_CATEGORIES, VALIDATION_IMAGE_URL,
    VISION_ANALYZE_PATH, VISUAL_FEATURES,
};
pub use auth::{AuthScheme, Credentials, API_KEY_HEADER, SUBSCRIPTION_KEY_HEADER};
pub use chat::{ChatCompletion, ChatMessage, ChatRequest};
pub use client::{ServiceClient, OPERATION_LOCATION};
pub use cooldown::CooldownRegistry;
pub use dispatcher::Dispatcher;
pub use error::{ServiceError, TransportError};
pub use options::{CooldownOptions, DispatcherOptions, PollOptions};
pub use poll::JobStatus;
pub use request::{Body, Request};
pub use response::Response;
pub use retry::{RetryCause, RetryEvent, RetryObserver, RetryPolicy, SITE_OVERLOADED};
pub use transport::{ReqwestTransport, Transport, TransportFuture};

pub use reqwest::{Method, StatusCode};

pub type Result<T> = std::result::Result<T, ServiceError>;
