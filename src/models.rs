//! Core data models for invoice evaluation

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

/// Type of repair or maintenance work an invoice is classified as
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Classification {
    WaterLeakDetection,
    RoofingTileReplacement,
    FireDamagedWallRepair,
    BrokenDoorRepair,
    BasementWaterproofing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

//
// ================= Submission (as received) =================
//

/// Uploaded file as it arrived in the multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Uploaded size; equals `bytes.len()` unless the body was discarded
    size: usize,
}

impl Document {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: None,
            content_type: content_type.into(),
            size: bytes.len(),
            bytes,
        }
    }

    /// Upload whose content was dropped while streaming; only its size is kept
    pub fn discarded(content_type: impl Into<String>, size: usize) -> Self {
        Self {
            file_name: None,
            content_type: content_type.into(),
            bytes: Vec::new(),
            size,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Invoice fields exactly as bound from the form; any of them may be missing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceDetails {
    pub invoice_id: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub amount: Option<Decimal>,
}

/// Candidate evaluation request, checked by [`crate::validation::validate`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationRequest {
    pub document: Option<Document>,
    pub invoice: Option<InvoiceDetails>,
}

//
// ================= Validated Request =================
//

/// Invoice with every required field present
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_id: String,
    pub invoice_number: String,
    pub invoice_date: DateTime<Utc>,
    pub comment: String,
    pub amount: Decimal,
}

/// A request that passed validation. Only this type reaches the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub document: Document,
    pub invoice: Invoice,
}

//
// ================= Classification =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResponse {
    pub classification: Classification,
    pub risk_level: RiskLevel,
}

//
// ================= Evaluation Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub evaluation_id: String,
    pub invoice_id: String,
    pub rules_applied: Vec<String>,
    pub classification: Classification,
    /// Base64 of the plain-text evaluation summary
    pub evaluation_file: String,
}

//
// ================= Parsing Helpers =================
//

/// Parse an ISO-8601 invoice date.
///
/// Accepts RFC 3339 timestamps, offset-less timestamps (taken as UTC) and
/// bare dates (midnight UTC).
pub fn parse_invoice_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::WaterLeakDetection => "WaterLeakDetection",
            Classification::RoofingTileReplacement => "RoofingTileReplacement",
            Classification::FireDamagedWallRepair => "FireDamagedWallRepair",
            Classification::BrokenDoorRepair => "BrokenDoorRepair",
            Classification::BasementWaterproofing => "BasementWaterproofing",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        write!(f, "{}", s)
    }
}
