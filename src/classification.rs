//! Classification service client
//!
//! Sends the validated document and invoice to the third-party classifier
//! and parses its verdict. Uses a long-lived reqwest::Client for connection
//! pooling, with a retry policy around transport failures.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use crate::error::ClassificationCallError;
use crate::models::{ClassificationResponse, Invoice, ValidatedRequest};
use crate::retry::RetryPolicy;

/// Path appended to the configured base URL
pub const CLASSIFY_PATH: &str = "classify";

/// Anything that can classify a validated request
#[async_trait]
pub trait ClassificationClient: Send + Sync {
    async fn classify(
        &self,
        request: &ValidatedRequest,
    ) -> Result<ClassificationResponse, ClassificationCallError>;
}

/// Reusable HTTP classification client (connection-pooled)
pub struct HttpClassificationClient {
    client: Client,
    endpoint: Url,
    retry_policy: RetryPolicy,
}

impl HttpClassificationClient {
    /// `base_url` must end with `/` so that `classify` is appended to it.
    pub fn new(base_url: &Url, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        let endpoint = base_url.join(CLASSIFY_PATH).map_err(|e| {
            ClassificationCallError::new(format!("Invalid classification endpoint: {}", e))
                .with_source(e)
        })?;

        Ok(Self {
            client,
            endpoint,
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ClassificationClient for HttpClassificationClient {
    async fn classify(
        &self,
        request: &ValidatedRequest,
    ) -> Result<ClassificationResponse, ClassificationCallError> {
        let payload = ClassifyPayload::from_request(request);

        info!(
            invoice_id = %request.invoice.invoice_id,
            endpoint = %self.endpoint,
            "Calling classification service"
        );

        let response = self
            .retry_policy
            .run(
                || self.client.post(self.endpoint.clone()).json(&payload).send(),
                is_transient,
            )
            .await
            .map_err(|e| {
                error!("Classification request failed: {}", e);
                ClassificationCallError::new(format!("Classification request failed: {}", e))
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read classification response body: {}", e);
            ClassificationCallError::new(format!(
                "Failed to read classification response with status code {}: {}",
                status, e
            ))
            .with_status(status)
            .with_source(e)
        })?;

        let classification = parse_classification(status, &body)?;

        info!(
            classification = %classification.classification,
            risk_level = %classification.risk_level,
            "Classification received"
        );

        Ok(classification)
    }
}

/// Connection, request and timeout failures are worth another attempt
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

/// Validate a classifier response and deserialize its body
fn parse_classification(
    status: StatusCode,
    body: &str,
) -> Result<ClassificationResponse, ClassificationCallError> {
    if !status.is_success() {
        error!(%status, "Classification service error response: {}", body);
        return Err(ClassificationCallError::new(format!(
            "Classification request failed with status code {}: {}",
            status, body
        ))
        .with_status(status));
    }

    if body.trim().is_empty() {
        return Err(
            ClassificationCallError::new("Classification response content is null")
                .with_status(status),
        );
    }

    serde_json::from_str(body).map_err(|e| {
        debug!("Unparseable classification body: {}", body);
        ClassificationCallError::new(format!(
            "Failed to deserialize classification response: {}",
            body
        ))
        .with_status(status)
        .with_source(e)
    })
}

//
// ================= Wire Format =================
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyPayload<'a> {
    document: DocumentPayload<'a>,
    invoice: &'a Invoice,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentPayload<'a> {
    file_name: Option<&'a str>,
    content_type: &'a str,
    length: usize,
    /// Base64 of the raw PDF bytes
    content: String,
}

impl<'a> ClassifyPayload<'a> {
    fn from_request(request: &'a ValidatedRequest) -> Self {
        Self {
            document: DocumentPayload {
                file_name: request.document.file_name.as_deref(),
                content_type: &request.document.content_type,
                length: request.document.len(),
                content: BASE64.encode(&request.document.bytes),
            },
            invoice: &request.invoice,
        }
    }
}
