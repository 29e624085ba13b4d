//! In-memory transport that replays a fixed script of replies.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    StatusCode,
};
use serde_json::Value as JsonValue;

use crate::{transport::TransportFuture, Request, Response, Transport, TransportError};

#[derive(Clone, Debug)]
enum Outcome {
    Respond {
        status: StatusCode,
        headers: Vec<(&'static str, String)>,
        body: Vec<u8>,
    },
    Fail {
        message: String,
        retryable: bool,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Reply(Outcome);

impl Reply {
    pub(crate) fn status(status: u16) -> Self {
        let status = StatusCode::from_u16(status).expect("scripted status must be valid");
        Self::text(status, "")
    }

    pub(crate) fn text(status: StatusCode, body: &str) -> Self {
        Self(Outcome::Respond {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        })
    }

    pub(crate) fn json(status: StatusCode, body: JsonValue) -> Self {
        Self::text(status, &body.to_string()).with_header("content-type", "application/json")
    }

    pub(crate) fn transport_error(message: &str) -> Self {
        Self(Outcome::Fail {
            message: message.to_owned(),
            retryable: true,
        })
    }

    pub(crate) fn invalid_request(message: &str) -> Self {
        Self(Outcome::Fail {
            message: message.to_owned(),
            retryable: false,
        })
    }

    pub(crate) fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Outcome::Respond { headers, .. } = &mut self.0 {
            headers.push((name, value.to_owned()));
        }
        self
    }

    fn into_result(self) -> Result<Response, TransportError> {
        match self.0 {
            Outcome::Respond {
                status,
                headers,
                body,
            } => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.append(
                        HeaderName::from_bytes(name.as_bytes())
                            .expect("scripted header name must be valid"),
                        HeaderValue::from_str(&value).expect("scripted header must be valid"),
                    );
                }
                Ok(Response::new(status, map, body))
            }
            Outcome::Fail { message, retryable } => Err(if retryable {
                TransportError::new(message)
            } else {
                TransportError::invalid_request(message)
            }),
        }
    }
}

/// Replays queued replies in order and records every request it receives.
///
/// Once the script runs out it answers `500`.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<Request>>>,
    hits: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Self::default()
        }
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().expect("request log").clone()
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a Request) -> TransportFuture<'a> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("request log")
            .push(request.clone());
        let reply = self
            .replies
            .lock()
            .expect("reply queue")
            .pop_front()
            .unwrap_or_else(|| Reply::text(StatusCode::INTERNAL_SERVER_ERROR, "script exhausted"));
        Box::pin(async move { reply.into_result() })
    }
}
