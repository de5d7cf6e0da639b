//! Invoice Evaluation Service
//!
//! Accepts a PDF invoice plus its metadata over HTTP and:
//! - Validates the upload and invoice fields before any outbound call
//! - Classifies the work through an external service, retrying transport failures
//! - Applies the rule engine (blanket approval for now)
//! - Returns an evaluation record with a base64 text summary
//!
//! FLOW:
//! UPLOAD → VALIDATE → CLASSIFY (retry) → APPLY RULES → SUMMARIZE → RESPOND

pub mod api;
pub mod classification;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod retry;
pub mod rules;
pub mod validation;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use classification::{ClassificationClient, HttpClassificationClient};
pub use evaluation::EvaluationService;
