//! Image analysis, content moderation and connection checks.

use serde_json::{json, Value as JsonValue};

use crate::{Request, Result, ServiceClient, ServiceError};

/// Path of the image-analysis operation, relative to the resource endpoint.
pub const VISION_ANALYZE_PATH: &str = "vision/v3.2/analyze";

/// Features requested by [`ServiceClient::analyze_image`].
pub const VISUAL_FEATURES: &str = "Categories,Tags,Description,Faces,Objects,Adult";

/// API version used for the content-safety operations.
pub const CONTENT_SAFETY_API_VERSION: &str = "2023-10-01";

/// Harm categories scored by [`ServiceClient::analyze_text_safety`].
pub const SAFETY_CATEGORIES: [&str; 4] = ["Hate", "SelfHarm", "Sexual", "Violence"];

/// Publicly reachable image analyzed by [`ServiceClient::validate`].
pub const VALIDATION_IMAGE_URL: &str = "https://raw.githubusercontent.com/Azure-Samples/cognitive-services-sample-data-files/master/ComputerVision/Images/landmark.jpg";

const DEFAULT_IMAGE_CONTENT_TYPE: &str = "application/octet-stream";

/// An image handed to an analysis operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageInput {
    /// An image the service downloads itself.
    Url(String),
    /// Image bytes uploaded in the request body.
    Bytes {
        /// MIME type such as `image/png`; empty means `application/octet-stream`.
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl ImageInput {
    /// Shorthand for [`ImageInput::Url`].
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    /// Shorthand for [`ImageInput::Bytes`].
    pub fn bytes(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Attaches the image as a raw upload, or as JSON built by `url_body`.
    fn attach(
        self,
        request: Request,
        url_body: impl FnOnce(String) -> JsonValue,
    ) -> Result<Request> {
        match self {
            Self::Url(url) => request.json(&url_body(url)),
            Self::Bytes {
                content_type,
                bytes,
            } => {
                let content_type = if content_type.trim().is_empty() {
                    DEFAULT_IMAGE_CONTENT_TYPE
                } else {
                    content_type.trim()
                };
                Ok(request.bytes(content_type, bytes))
            }
        }
    }
}

impl ServiceClient {
    /// Runs computer-vision analysis (categories, tags, description, faces,
    /// objects and adult content) on an image.
    ///
    /// A URL is posted as `{"url": ...}`; bytes are uploaded as-is with
    /// their content type. Returns the service's analysis document.
    pub async fn analyze_image(&self, image: ImageInput) -> Result<JsonValue> {
        let path = format!("{VISION_ANALYZE_PATH}?visualFeatures={VISUAL_FEATURES}&language=en");
        let request = image.attach(self.post(&path), |url| json!({ "url": url }))?;
        self.send(request).await?.json()
    }

    /// Scores `text` against the [`SAFETY_CATEGORIES`].
    pub async fn analyze_text_safety(&self, text: &str) -> Result<JsonValue> {
        let path = format!("contentsafety/text:analyze?api-version={CONTENT_SAFETY_API_VERSION}");
        let request = self.post(&path).json(&json!({
            "text": text,
            "categories": SAFETY_CATEGORIES,
        }))?;
        self.send(request).await?.json()
    }

    /// Scores an image for harmful content.
    ///
    /// Bytes are uploaded raw. A URL is sent as `{"image": {"blobUrl": ...}}`,
    /// which the service only accepts for storage blobs it can read.
    pub async fn analyze_image_safety(&self, image: ImageInput) -> Result<JsonValue> {
        let path = format!("contentsafety/image:analyze?api-version={CONTENT_SAFETY_API_VERSION}");
        let request = image.attach(self.post(&path), |url| json!({ "image": { "blobUrl": url } }))?;
        self.send(request).await?.json()
    }

    /// Checks that the endpoint and credentials work by analyzing
    /// [`VALIDATION_IMAGE_URL`] for categories only.
    ///
    /// Any HTTP error status, rate limits included once the retry budget is
    /// spent, yields `Ok(false)`. Failures that never reached the service,
    /// such as connection errors, are returned as errors.
    pub async fn validate(&self) -> Result<bool> {
        let request = self
            .post(&format!("{VISION_ANALYZE_PATH}?visualFeatures=Categories"))
            .json(&json!({ "url": VALIDATION_IMAGE_URL }))?;

        match self.send(request).await {
            Ok(_) => Ok(true),
            Err(_err @ (ServiceError::Http { .. } | ServiceError::RetriesExhausted { .. })) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(client = %self.name(), error = %_err, "connection check rejected");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{ImageInput, VALIDATION_IMAGE_URL};
    use crate::{
        request::Body,
        test_utils::{Reply, ScriptedTransport},
        Credentials, Dispatcher, DispatcherOptions, RetryPolicy, ServiceClient, ServiceError,
    };

    fn client(transport: &ScriptedTransport) -> ServiceClient {
        Dispatcher::with_transport(transport.clone(), DispatcherOptions::default()).client(
            "vision",
            "https://cog.example/",
            Credentials::SubscriptionKey("sub".to_owned()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn analyze_image_posts_url_as_json() {
        let transport = ScriptedTransport::new(vec![Reply::json(
            StatusCode::OK,
            json!({"description": {"captions": [{"text": "a bridge"}]}}),
        )]);
        let client = client(&transport);

        let analysis = client
            .analyze_image(ImageInput::url("https://img.example/bridge.jpg"))
            .await
            .expect("must analyze");

        assert_eq!(analysis["description"]["captions"][0]["text"], "a bridge");
        let sent = transport.requests();
        assert_eq!(
            sent[0].url(),
            "https://cog.example/vision/v3.2/analyze?visualFeatures=Categories,Tags,Description,Faces,Objects,Adult&language=en"
        );
        assert_eq!(sent[0].header_value("ocp-apim-subscription-key"), Some("sub"));
        assert_eq!(sent[0].header_value("content-type"), Some("application/json"));
        assert_eq!(
            sent[0].body(),
            Some(&Body::Json(json!({"url": "https://img.example/bridge.jpg"})))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn analyze_image_uploads_bytes_with_content_type() {
        let transport = ScriptedTransport::new(vec![Reply::json(StatusCode::OK, json!({}))]);
        let client = client(&transport);

        client
            .analyze_image(ImageInput::bytes("image/png", vec![0x89, b'P', b'N', b'G']))
            .await
            .expect("must analyze");

        let sent = transport.requests();
        assert_eq!(sent[0].header_value("content-type"), Some("image/png"));
        assert_eq!(
            sent[0].body(),
            Some(&Body::Bytes(vec![0x89, b'P', b'N', b'G']))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn untyped_image_bytes_default_to_octet_stream() {
        let transport = ScriptedTransport::new(vec![Reply::json(StatusCode::OK, json!({}))]);
        let client = client(&transport);

        client
            .analyze_image_safety(ImageInput::bytes("", vec![1, 2, 3]))
            .await
            .expect("must analyze");

        let sent = transport.requests();
        assert_eq!(
            sent[0].url(),
            "https://cog.example/contentsafety/image:analyze?api-version=2023-10-01"
        );
        assert_eq!(
            sent[0].header_value("content-type"),
            Some("application/octet-stream")
        );
        assert_eq!(sent[0].body(), Some(&Body::Bytes(vec![1, 2, 3])));
    }

    #[tokio::test(start_paused = true)]
    async fn image_safety_sends_blob_url() {
        let transport = ScriptedTransport::new(vec![Reply::json(
            StatusCode::OK,
            json!({"categoriesAnalysis": [{"category": "Violence", "severity": 0}]}),
        )]);
        let client = client(&transport);

        let result = client
            .analyze_image_safety(ImageInput::url("https://blob.example/c/1.png"))
            .await
            .expect("must analyze");

        assert_eq!(result["categoriesAnalysis"][0]["severity"], 0);
        assert_eq!(
            transport.requests()[0].body(),
            Some(&Body::Json(
                json!({"image": {"blobUrl": "https://blob.example/c/1.png"}})
            ))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn text_safety_requests_all_categories_and_retries() {
        let transport = ScriptedTransport::new(vec![
            Reply::status(429).with_header("retry-after", "2"),
            Reply::json(StatusCode::OK, json!({"categoriesAnalysis": []})),
        ]);
        let client = client(&transport);

        client
            .analyze_text_safety("I feel hopeless")
            .await
            .expect("must recover from the rate limit");

        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[1].url(),
            "https://cog.example/contentsafety/text:analyze?api-version=2023-10-01"
        );
        assert_eq!(
            sent[1].body(),
            Some(&Body::Json(json!({
                "text": "I feel hopeless",
                "categories": ["Hate", "SelfHarm", "Sexual", "Violence"],
            })))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_error_status_is_returned() {
        let transport =
            ScriptedTransport::new(vec![Reply::text(StatusCode::BAD_REQUEST, "InvalidImageUrl")]);
        let client = client(&transport);

        let err = client
            .analyze_image(ImageInput::url("not-an-image"))
            .await
            .expect_err("must fail");

        match err {
            ServiceError::Http { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "InvalidImageUrl");
            }
            other => panic!("expected http error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn validate_reports_reachable_service() {
        let transport = ScriptedTransport::new(vec![Reply::json(
            StatusCode::OK,
            json!({"categories": []}),
        )]);
        let client = client(&transport);

        assert!(client.validate().await.expect("must check"));
        let sent = transport.requests();
        assert_eq!(
            sent[0].url(),
            "https://cog.example/vision/v3.2/analyze?visualFeatures=Categories"
        );
        assert_eq!(
            sent[0].body(),
            Some(&Body::Json(json!({"url": VALIDATION_IMAGE_URL})))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn validate_is_false_on_rejected_credentials_or_exhaustion() {
        let transport = ScriptedTransport::new(vec![Reply::status(401)]);
        assert!(!client(&transport).validate().await.expect("must check"));

        let transport = ScriptedTransport::new(vec![Reply::status(429)]);
        let limited = client(&transport).with_retry_policy(RetryPolicy::no_retry());
        assert!(!limited.validate().await.expect("must check"));
    }

    #[tokio::test(start_paused = true)]
    async fn validate_propagates_unreachable_service() {
        let transport = ScriptedTransport::new(vec![Reply::invalid_request("bad url")]);

        let err = client(&transport).validate().await.expect_err("must fail");

        assert!(matches!(err, ServiceError::Transport { attempts: 1, .. }));
    }
}
