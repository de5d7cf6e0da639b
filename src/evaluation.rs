//! Evaluation orchestrator
//!
//! CLASSIFY → APPLY RULES → SUMMARIZE → RESPOND
//!
//! A classification failure is a failed evaluation; nothing is recovered here.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::classification::ClassificationClient;
use crate::models::{ClassificationResponse, EvaluationResponse, ValidatedRequest};
use crate::rules::{ApprovalRuleEngine, RuleEngine};
use crate::Result;

/// Prefix of every generated evaluation id
pub const EVALUATION_ID_PREFIX: &str = "EVAL_";

pub struct EvaluationService {
    classifier: Arc<dyn ClassificationClient>,
    rule_engine: Box<dyn RuleEngine>,
}

impl EvaluationService {
    pub fn new(classifier: Arc<dyn ClassificationClient>, rule_engine: Box<dyn RuleEngine>) -> Self {
        Self {
            classifier,
            rule_engine,
        }
    }

    /// Service using the blanket approval rules
    pub fn with_default_rules(classifier: Arc<dyn ClassificationClient>) -> Self {
        Self::new(classifier, Box::new(ApprovalRuleEngine))
    }

    pub async fn evaluate(&self, request: &ValidatedRequest) -> Result<EvaluationResponse> {
        let classification = self.classifier.classify(request).await?;

        let evaluation_id = new_evaluation_id();
        let rules_applied = self.rule_engine.apply(&classification, &request.invoice);

        debug!(
            evaluation_id = %evaluation_id,
            rules = ?rules_applied,
            "Rules applied"
        );

        let summary = build_summary(
            &evaluation_id,
            &request.invoice.invoice_id,
            &classification,
            &rules_applied,
        );

        info!(
            evaluation_id = %evaluation_id,
            invoice_id = %request.invoice.invoice_id,
            classification = %classification.classification,
            "Evaluation assembled"
        );

        Ok(EvaluationResponse {
            evaluation_id,
            invoice_id: request.invoice.invoice_id.clone(),
            rules_applied,
            classification: classification.classification,
            evaluation_file: BASE64.encode(summary.as_bytes()),
        })
    }
}

fn new_evaluation_id() -> String {
    format!("{}{}", EVALUATION_ID_PREFIX, Uuid::new_v4())
}

/// Plain-text evaluation summary, one `Label: value` line per fact
pub fn build_summary(
    evaluation_id: &str,
    invoice_id: &str,
    classification: &ClassificationResponse,
    rules_applied: &[String],
) -> String {
    format!(
        "Evaluation ID: {}\nInvoice ID: {}\nClassification: {}\nRisk Level: {}\nRules Applied: {}\n",
        evaluation_id,
        invoice_id,
        classification.classification,
        classification.risk_level,
        rules_applied.join(", "),
    )
}
