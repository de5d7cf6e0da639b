//! Rule engine seam
//!
//! Decides which business rules an evaluated invoice triggered. Only the
//! blanket approval exists today.

use crate::models::{ClassificationResponse, Invoice};

/// Name reported when an invoice is approved without further checks
pub const APPROVED: &str = "Approved";

/// Strategy producing the ordered list of applied rule names
pub trait RuleEngine: Send + Sync {
    fn apply(&self, classification: &ClassificationResponse, invoice: &Invoice) -> Vec<String>;
}

/// Approves every classified invoice
#[derive(Debug, Default, Clone, Copy)]
pub struct ApprovalRuleEngine;

impl RuleEngine for ApprovalRuleEngine {
    fn apply(&self, _classification: &ClassificationResponse, _invoice: &Invoice) -> Vec<String> {
        vec![APPROVED.to_string()]
    }
}
