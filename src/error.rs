//! Error types for the invoice evaluation service

use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Result type alias for evaluation operations
pub type Result<T> = std::result::Result<T, EvaluationError>;

/// Boxed inner cause carried by a failed classification call
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum EvaluationError {

    // =============================
    // Request Pipeline Errors
    // =============================

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Classification(#[from] ClassificationCallError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Uniform failure of the outbound classification call.
///
/// Transport failures carry the transport error as `source` and no status;
/// everything that happened after a response arrived carries its status.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ClassificationCallError {
    pub message: String,
    pub status: Option<StatusCode>,
    #[source]
    pub source: Option<BoxError>,
}

impl ClassificationCallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Ordered list of field-rule violations for a submitted request
#[derive(Error, Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    messages: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append every message of `other`, keeping order
    pub fn extend(&mut self, other: ValidationErrors) {
        self.messages.extend(other.messages);
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

impl From<Vec<String>> for ValidationErrors {
    fn from(messages: Vec<String>) -> Self {
        Self { messages }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join("; "))
    }
}

/// Startup-time configuration failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),

    #[error("{name} is not a valid URL: {value}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{name} must use http or https, got '{scheme}'")]
    UnsupportedScheme { name: &'static str, scheme: String },

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}
