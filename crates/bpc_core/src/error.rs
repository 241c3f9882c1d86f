use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape used across both crates.
///
/// Compliance conditions (PII found, banned phrase, missing citation) are
/// never errors; they travel inside the response as flags and redactions.
/// `AppError` is reserved for configuration and collaborator failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Policy pack rejection. The pack is all-or-nothing, so these are fatal
    /// at startup and never retryable.
    pub fn policy_pack(code_suffix: &str, message: impl Into<String>) -> Self {
        Self::new(format!("POLICY_PACK_{code_suffix}"), message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
