//! Request validation
//!
//! Field-presence and format rules for an evaluation submission.
//! Pure and synchronous: every field is checked and every violation collected.

use crate::error::ValidationErrors;
use crate::models::{Document, EvaluationRequest, Invoice, InvoiceDetails, ValidatedRequest};
use chrono::{DateTime, NaiveDate, Utc};

/// Largest accepted document, in bytes
pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

const PDF_CONTENT_TYPE: &str = "application/pdf";

pub const DOCUMENT_REQUIRED: &str = "PDF document is required";
pub const DOCUMENT_NOT_PDF: &str = "Only PDF documents are accepted";
pub const DOCUMENT_TOO_LARGE: &str = "The maximum file size is 5 MB";
pub const INVOICE_REQUIRED: &str = "Invoice details are required";
pub const INVOICE_ID_REQUIRED: &str = "Invoice ID is required";
pub const INVOICE_NUMBER_REQUIRED: &str = "Invoice number is required";
pub const INVOICE_NUMBER_FORMAT: &str = "Invoice number must start with 'S' followed by 5 digits";
pub const INVOICE_DATE_REQUIRED: &str = "Invoice date is required";
pub const COMMENT_REQUIRED: &str = "Comment is required";
pub const AMOUNT_REQUIRED: &str = "Invoice amount is required";

/// Validate a submission, returning the typed request or every violation.
pub fn validate(request: EvaluationRequest) -> Result<ValidatedRequest, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let document = check_document(request.document, &mut errors);

    let invoice = match request.invoice {
        Some(details) => check_invoice(details, &mut errors),
        None => {
            errors.push(INVOICE_REQUIRED);
            None
        }
    };

    match (document, invoice) {
        (Some(document), Some(invoice)) => Ok(ValidatedRequest { document, invoice }),
        _ => Err(errors),
    }
}

//
// ================= Document Rules =================
//

/// Returns the document only when it passed every rule
fn check_document(document: Option<Document>, errors: &mut ValidationErrors) -> Option<Document> {
    let Some(document) = document else {
        errors.push(DOCUMENT_REQUIRED);
        return None;
    };

    let is_pdf = document.content_type.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE);
    if !is_pdf {
        errors.push(DOCUMENT_NOT_PDF);
    }

    let fits = document.len() <= MAX_DOCUMENT_BYTES;
    if !fits {
        errors.push(DOCUMENT_TOO_LARGE);
    }

    (is_pdf && fits).then_some(document)
}

//
// ================= Invoice Rules =================
//

/// Returns the typed invoice only when every field passed
fn check_invoice(details: InvoiceDetails, errors: &mut ValidationErrors) -> Option<Invoice> {
    let invoice_id = required_text(details.invoice_id, INVOICE_ID_REQUIRED, errors);

    let invoice_number = required_text(details.invoice_number, INVOICE_NUMBER_REQUIRED, errors)
        .and_then(|number| {
            if is_valid_invoice_number(&number) {
                Some(number)
            } else {
                errors.push(INVOICE_NUMBER_FORMAT);
                None
            }
        });

    let invoice_date = details.invoice_date.filter(|date| Some(*date) != unset_date());
    if invoice_date.is_none() {
        errors.push(INVOICE_DATE_REQUIRED);
    }

    let comment = required_text(details.comment, COMMENT_REQUIRED, errors);

    if details.amount.is_none() {
        errors.push(AMOUNT_REQUIRED);
    }

    Some(Invoice {
        invoice_id: invoice_id?,
        invoice_number: invoice_number?,
        invoice_date: invoice_date?,
        comment: comment?,
        amount: details.amount?,
    })
}

/// `S` followed by exactly five ASCII digits
pub fn is_valid_invoice_number(number: &str) -> bool {
    match number.strip_prefix('S') {
        Some(digits) => digits.len() == 5 && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Keeps the value as submitted; blank (absent or whitespace) is an error
fn required_text(
    value: Option<String>,
    message: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = value.filter(|v| !v.trim().is_empty());
    if value.is_none() {
        errors.push(message);
    }
    value
}

/// `0001-01-01T00:00:00Z`, the zero value an unset invoice date binds to
fn unset_date() -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

//
// ================= Tests =================
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn pdf(size: usize) -> Document {
        Document::new("application/pdf", vec![0u8; size]).with_file_name("invoice.pdf")
    }

    fn invoice_details() -> InvoiceDetails {
        InvoiceDetails {
            invoice_id: Some("INV123".to_string()),
            invoice_number: Some("S12345".to_string()),
            invoice_date: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
            comment: Some("Leak under the kitchen sink".to_string()),
            amount: Some(Decimal::new(100000, 2)),
        }
    }

    fn request() -> EvaluationRequest {
        EvaluationRequest {
            document: Some(pdf(1024)),
            invoice: Some(invoice_details()),
        }
    }

    fn with_number(number: &str) -> EvaluationRequest {
        let mut request = request();
        request.invoice.as_mut().unwrap().invoice_number = Some(number.to_string());
        request
    }

    #[test]
    fn test_valid_request_passes() {
        let validated = validate(request()).unwrap();
        assert_eq!(validated.invoice.invoice_id, "INV123");
        assert_eq!(validated.invoice.amount, Decimal::new(100000, 2));
        assert_eq!(validated.document.len(), 1024);
    }

    #[test]
    fn test_missing_document() {
        let mut request = request();
        request.document = None;

        let errors = validate(request).unwrap_err();
        assert_eq!(errors.messages(), [DOCUMENT_REQUIRED]);
    }

    #[test]
    fn test_non_pdf_content_types_rejected() {
        for content_type in ["image/png", "text/plain", "application/octet-stream", ""] {
            let mut request = request();
            request.document = Some(Document::new(content_type, vec![1, 2, 3]));

            let errors = validate(request).unwrap_err();
            assert_eq!(errors.messages(), [DOCUMENT_NOT_PDF], "{}", content_type);
        }
    }

    #[test]
    fn test_content_type_is_case_insensitive() {
        let mut request = request();
        request.document = Some(Document::new("Application/PDF", vec![1, 2, 3]));
        assert!(validate(request).is_ok());
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let mut at_limit = request();
        at_limit.document = Some(pdf(MAX_DOCUMENT_BYTES));
        assert!(validate(at_limit).is_ok());

        let mut over_limit = request();
        over_limit.document = Some(pdf(MAX_DOCUMENT_BYTES + 1));
        let errors = validate(over_limit).unwrap_err();
        assert_eq!(errors.messages(), [DOCUMENT_TOO_LARGE]);
    }

    #[test]
    fn test_discarded_upload_is_judged_by_its_size() {
        let mut request = request();
        request.document = Some(Document::discarded("application/pdf", 11 * 1024 * 1024));

        let errors = validate(request).unwrap_err();
        assert_eq!(errors.messages(), [DOCUMENT_TOO_LARGE]);
    }

    #[test]
    fn test_document_rules_collect_together() {
        let mut request = request();
        request.document = Some(Document::new("image/jpeg", vec![0u8; MAX_DOCUMENT_BYTES + 1]));

        let errors = validate(request).unwrap_err();
        assert_eq!(errors.messages(), [DOCUMENT_NOT_PDF, DOCUMENT_TOO_LARGE]);
    }

    #[test]
    fn test_missing_invoice() {
        let mut request = request();
        request.invoice = None;

        let errors = validate(request).unwrap_err();
        assert_eq!(errors.messages(), [INVOICE_REQUIRED]);
    }

    #[test]
    fn test_invoice_number_format() {
        for bad in ["S1234", "A12345", "S123456", "s12345", "S12a45", "S-1234", "S 1234"] {
            let errors = validate(with_number(bad)).unwrap_err();
            assert_eq!(errors.messages(), [INVOICE_NUMBER_FORMAT], "{}", bad);
        }

        assert!(validate(with_number("S12345")).is_ok());
        assert!(validate(with_number("S00000")).is_ok());
    }

    #[test]
    fn test_blank_invoice_number_reports_required_only() {
        let errors = validate(with_number("   ")).unwrap_err();
        assert_eq!(errors.messages(), [INVOICE_NUMBER_REQUIRED]);
    }

    #[test]
    fn test_empty_invoice_collects_every_field() {
        let request = EvaluationRequest {
            document: None,
            invoice: Some(InvoiceDetails::default()),
        };

        let errors = validate(request).unwrap_err();
        assert_eq!(
            errors.messages(),
            [
                DOCUMENT_REQUIRED,
                INVOICE_ID_REQUIRED,
                INVOICE_NUMBER_REQUIRED,
                INVOICE_DATE_REQUIRED,
                COMMENT_REQUIRED,
                AMOUNT_REQUIRED,
            ]
        );
    }

    #[test]
    fn test_zero_date_counts_as_missing() {
        let mut request = request();
        request.invoice.as_mut().unwrap().invoice_date =
            Some(Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap());

        let errors = validate(request).unwrap_err();
        assert_eq!(errors.messages(), [INVOICE_DATE_REQUIRED]);
    }

    #[test]
    fn test_unix_epoch_is_a_real_date() {
        let mut request = request();
        request.invoice.as_mut().unwrap().invoice_date = Some(DateTime::<Utc>::default());

        let validated = validate(request).unwrap();
        assert_eq!(validated.invoice.invoice_date, DateTime::<Utc>::default());
    }

    #[test]
    fn test_values_are_kept_as_submitted() {
        let mut request = request();
        let invoice = request.invoice.as_mut().unwrap();
        invoice.invoice_id = Some("INV123 ".to_string());
        invoice.comment = Some("  Leak under the sink\n".to_string());

        let validated = validate(request).unwrap();
        assert_eq!(validated.invoice.invoice_id, "INV123 ");
        assert_eq!(validated.invoice.comment, "  Leak under the sink\n");
    }

    #[test]
    fn test_invalid_document_with_valid_invoice_fails() {
        let mut request = request();
        request.document = Some(Document::new("text/plain", vec![1]));

        let errors = validate(request).unwrap_err();
        assert_eq!(errors.messages(), [DOCUMENT_NOT_PDF]);
    }

    #[test]
    fn test_zero_amount_is_present() {
        let mut request = request();
        request.invoice.as_mut().unwrap().amount = Some(Decimal::ZERO);
        assert!(validate(request).is_ok());
    }
}
