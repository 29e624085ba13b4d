use std::{fmt, str::FromStr};

use crate::ServiceError;

/// Header used by cognitive-services resources.
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
/// Header used by OpenAI-style model deployments.
pub const API_KEY_HEADER: &str = "api-key";

/// How a logical client authenticates against its endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Ocp-Apim-Subscription-Key: <key>`.
    SubscriptionKey(String),
    /// `api-key: <key>`.
    ApiKey(String),
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// No authentication header.
    Anonymous,
}

impl Credentials {
    /// Creates bearer credentials, adding the `Bearer ` prefix if it is missing.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        Self::Bearer(normalize_bearer_authorization(token.as_ref()))
    }

    /// Header name and value to attach to requests, if any.
    pub fn header(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::SubscriptionKey(key) => Some((SUBSCRIPTION_KEY_HEADER, key.as_str())),
            Self::ApiKey(key) => Some((API_KEY_HEADER, key.as_str())),
            Self::Bearer(value) => Some(("Authorization", value.as_str())),
            Self::Anonymous => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self {
            Self::SubscriptionKey(_) => "SubscriptionKey",
            Self::ApiKey(_) => "ApiKey",
            Self::Bearer(_) => "Bearer",
            Self::Anonymous => return f.write_str("Anonymous"),
        };
        f.debug_tuple(scheme).field(&"<redacted>").finish()
    }
}

/// Credential scheme names accepted in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthScheme {
    SubscriptionKey,
    ApiKey,
    Bearer,
}

impl AuthScheme {
    /// Pairs this scheme with a secret.
    pub fn credentials(self, secret: impl AsRef<str>) -> Credentials {
        let secret = secret.as_ref().trim();
        match self {
            Self::SubscriptionKey => Credentials::SubscriptionKey(secret.to_owned()),
            Self::ApiKey => Credentials::ApiKey(secret.to_owned()),
            Self::Bearer => Credentials::bearer(secret),
        }
    }
}

impl FromStr for AuthScheme {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "subscription-key" | "subscription_key" | "ocp-apim-subscription-key" => {
                Ok(Self::SubscriptionKey)
            }
            "api-key" | "api_key" => Ok(Self::ApiKey),
            "bearer" => Ok(Self::Bearer),
            other => Err(ServiceError::Config(format!(
                "unknown auth scheme '{other}', expected subscription-key, api-key or bearer"
            ))),
        }
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
