//! REST API server for invoice evaluation
//!
//! Accepts the multipart upload, validates it, runs the evaluation and maps
//! the outcome to an HTTP status.

use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::error::{EvaluationError, ValidationErrors};
use crate::evaluation::EvaluationService;
use crate::models::{
    parse_invoice_date, Document, EvaluationRequest, EvaluationResponse, InvoiceDetails,
};
use crate::validation::{validate, DOCUMENT_TOO_LARGE, MAX_DOCUMENT_BYTES};

/// Whole-request ceiling (the usual 30 MB host default). Documents are
/// streamed, so anything between this and the 5 MB rule still reaches
/// validation.
pub const MAX_REQUEST_BYTES: usize = 30_000_000;

pub const EVALUATE_ROUTE: &str = "/Evaluation/evaluate";

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub upstream_status: Option<u16>,
    pub timestamp: String,
}

impl ErrorBody {
    fn new(error: String, upstream_status: Option<u16>) -> Self {
        Self {
            error,
            upstream_status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub evaluator: Arc<EvaluationService>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Evaluation Endpoint
/// =============================

async fn evaluate(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!("Rejected evaluation request: {}", rejection.body_text());
            return bad_request(vec![rejection.body_text()]);
        }
    };

    let (request, binding_errors) = match bind_submission(&mut multipart).await {
        Ok(bound) => bound,
        Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Evaluation request exceeds {} bytes", MAX_REQUEST_BYTES);
            return bad_request(vec![DOCUMENT_TOO_LARGE.to_string()]);
        }
        Err(e) => {
            warn!("Malformed multipart body: {}", e.body_text());
            return bad_request(vec![format!("Malformed multipart body: {}", e.body_text())]);
        }
    };

    info!(
        invoice_id = request
            .invoice
            .as_ref()
            .and_then(|i| i.invoice_id.as_deref())
            .unwrap_or("<missing>"),
        document_bytes = request.document.as_ref().map(Document::len).unwrap_or(0),
        "Received evaluation request"
    );

    match process(&state.evaluator, request, binding_errors).await {
        Ok(response) => {
            info!(
                evaluation_id = %response.evaluation_id,
                invoice_id = %response.invoice_id,
                classification = %response.classification,
                "Evaluation completed"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Validate, then evaluate. Binding messages come first in the error list.
async fn process(
    evaluator: &EvaluationService,
    request: EvaluationRequest,
    mut errors: ValidationErrors,
) -> crate::Result<EvaluationResponse> {
    let validated = match validate(request) {
        Ok(validated) if errors.is_empty() => validated,
        Ok(_) => return Err(errors.into()),
        Err(rule_errors) => {
            errors.extend(rule_errors);
            return Err(errors.into());
        }
    };

    evaluator.evaluate(&validated).await
}

fn bad_request(messages: Vec<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(messages)).into_response()
}

fn error_response(err: EvaluationError) -> Response {
    match err {
        EvaluationError::Validation(errors) => {
            warn!(errors = %errors, "Evaluation request validation failed");
            bad_request(errors.into_messages())
        }
        EvaluationError::Classification(call) => {
            error!("Evaluation failed: {}", call);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(call.message, call.status.map(|s| s.as_u16()))),
            )
                .into_response()
        }
        other => {
            error!("Evaluation failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(other.to_string(), None)),
            )
                .into_response()
        }
    }
}

/// =============================
/// Multipart Binding
/// =============================

/// Bind form fields onto an [`EvaluationRequest`].
///
/// Field names match case-insensitively and values are kept as submitted.
/// Values that fail to parse leave the field unset and add a binding message.
async fn bind_submission(
    multipart: &mut Multipart,
) -> Result<(EvaluationRequest, ValidationErrors), MultipartError> {
    let mut request = EvaluationRequest::default();
    let mut binding_errors = ValidationErrors::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_ascii_lowercase();

        if name == "document" {
            request.document = Some(read_document(field).await?);
            continue;
        }

        let Some(invoice_field) = name.strip_prefix("invoice.") else {
            continue;
        };

        let value = field.text().await?;
        let invoice = request.invoice.get_or_insert_with(InvoiceDetails::default);

        if value.trim().is_empty() {
            continue;
        }

        match invoice_field {
            "invoiceid" => invoice.invoice_id = Some(value),
            "invoicenumber" => invoice.invoice_number = Some(value),
            "comment" => invoice.comment = Some(value),
            "invoicedate" => match parse_invoice_date(&value) {
                Some(date) => invoice.invoice_date = Some(date),
                None => binding_errors.push(invalid_value(&value, "InvoiceDate")),
            },
            "amount" => match Decimal::from_str(value.trim()) {
                Ok(amount) => invoice.amount = Some(amount),
                Err(_) => binding_errors.push(invalid_value(&value, "Amount")),
            },
            _ => {}
        }
    }

    Ok((request, binding_errors))
}

/// Stream the upload, keeping its bytes only while it is within the
/// document limit. Past that only the size is tracked.
async fn read_document(mut field: Field<'_>) -> Result<Document, MultipartError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().unwrap_or_default().to_string();

    let mut bytes = Vec::new();
    let mut size = 0usize;
    while let Some(chunk) = field.chunk().await? {
        size += chunk.len();
        if size <= MAX_DOCUMENT_BYTES {
            bytes.extend_from_slice(&chunk);
        } else if !bytes.is_empty() {
            bytes = Vec::new();
        }
    }

    let document = if size <= MAX_DOCUMENT_BYTES {
        Document::new(content_type, bytes)
    } else {
        Document::discarded(content_type, size)
    };

    Ok(match file_name {
        Some(file_name) => document.with_file_name(file_name),
        None => document,
    })
}

fn invalid_value(value: &str, field: &str) -> String {
    format!("The value '{}' is not valid for {}.", value, field)
}

/// =============================
/// Router
/// =============================

pub fn create_router(evaluator: Arc<EvaluationService>) -> Router {
    router_with_limit(evaluator, MAX_REQUEST_BYTES)
}

fn router_with_limit(evaluator: Arc<EvaluationService>, body_limit: usize) -> Router {
    let state = ApiState { evaluator };

    Router::new()
        .route("/health", get(health))
        .route(EVALUATE_ROUTE, post(evaluate))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(evaluator: Arc<EvaluationService>, port: u16) -> crate::Result<()> {
    let router = create_router(evaluator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
