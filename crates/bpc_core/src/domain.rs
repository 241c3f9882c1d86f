use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;

/// Inbound question. Jurisdiction is optional; the pack's default applies
/// when it is absent or unknown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub jurisdiction: Option<String>,
}

/// One retrieved policy passage, passed by value into the gate for the
/// duration of a single request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceSnippet {
    pub doc_id: String,
    pub title: String,
    pub jurisdiction: String,
    pub effective_from: String,
    pub effective_to: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub policy_id: String,
    pub jurisdiction: String,
    pub effective_from: String,
    pub effective_to: String,
    pub snippet: String,
}

const CITATION_SNIPPET_MAX_CHARS: usize = 300;

impl Citation {
    /// Citations carry a flattened, truncated excerpt rather than the full
    /// passage text.
    pub fn from_snippet(s: &EvidenceSnippet) -> Self {
        let flat = s.text.trim().replace('\n', " ");
        let excerpt = if flat.chars().count() <= CITATION_SNIPPET_MAX_CHARS {
            flat
        } else {
            flat.chars().take(CITATION_SNIPPET_MAX_CHARS).collect()
        };
        Self {
            title: s.title.clone(),
            policy_id: s.doc_id.clone(),
            jurisdiction: s.jurisdiction.clone(),
            effective_from: s.effective_from.clone(),
            effective_to: s.effective_to.clone(),
            snippet: excerpt,
        }
    }
}

/// Record of one rule type having masked text in this request. The original
/// span is never carried; `original_snippet` is always the literal
/// placeholder `<hidden>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Redaction {
    #[serde(rename = "type")]
    pub pii_type: String,
    pub original_snippet: String,
    pub mask_pattern: String,
}

pub const REDACTION_PLACEHOLDER: &str = "<hidden>";

impl Redaction {
    pub fn new(pii_type: impl Into<String>, mask_pattern: impl Into<String>) -> Self {
        Self {
            pii_type: pii_type.into(),
            original_snippet: REDACTION_PLACEHOLDER.to_string(),
            mask_pattern: mask_pattern.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    PolicyViolation,
    NoCitation,
    PiiDetected,
    JurisdictionFallback,
    InsufficientContext,
}

impl RiskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskCategory::PolicyViolation => "policy_violation",
            RiskCategory::NoCitation => "no_citation",
            RiskCategory::PiiDetected => "pii_detected",
            RiskCategory::JurisdictionFallback => "jurisdiction_fallback",
            RiskCategory::InsufficientContext => "insufficient_context",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "policy_violation" => Some(RiskCategory::PolicyViolation),
            "no_citation" => Some(RiskCategory::NoCitation),
            "pii_detected" => Some(RiskCategory::PiiDetected),
            "jurisdiction_fallback" => Some(RiskCategory::JurisdictionFallback),
            "insufficient_context" => Some(RiskCategory::InsufficientContext),
            _ => None,
        }
    }

    /// Only these categories force the refusal template. Informational
    /// categories ride along in the audit trail.
    pub fn is_forcing(self) -> bool {
        matches!(
            self,
            RiskCategory::PolicyViolation | RiskCategory::NoCitation
        )
    }
}

/// Tagged audit flag, serialized on the wire as `"<category>:<detail>"`.
/// Accumulation order is detection order and must be preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RiskFlag {
    pub category: RiskCategory,
    pub detail: String,
}

impl RiskFlag {
    pub fn new(category: RiskCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
        }
    }

    pub fn is_forcing(&self) -> bool {
        self.category.is_forcing()
    }
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category.as_str(), self.detail)
    }
}

impl From<RiskFlag> for String {
    fn from(flag: RiskFlag) -> String {
        flag.to_string()
    }
}

impl TryFrom<String> for RiskFlag {
    type Error = AppError;

    fn try_from(s: String) -> Result<Self, AppError> {
        let (cat, detail) = s.split_once(':').ok_or_else(|| {
            AppError::new("RISK_FLAG_MALFORMED", "Risk flag must be '<category>:<detail>'")
                .with_details(s.clone())
        })?;
        let category = RiskCategory::parse(cat).ok_or_else(|| {
            AppError::new("RISK_FLAG_MALFORMED", "Unknown risk flag category")
                .with_details(s.clone())
        })?;
        Ok(RiskFlag::new(category, detail))
    }
}

/// Per-request audit stamp echoed in every response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunMetadata {
    pub model: String,
    pub policy_pack_version: String,
    pub kb_snapshot_docs: Vec<String>,
    pub timestamp: String, // RFC3339
}

/// Final compliance-checked response. Constructed once by the assembler and
/// immutable after that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerPayload {
    pub answer: String,
    pub jurisdiction: String,
    pub policy_pack_version: String,
    pub citations: Vec<Citation>,
    pub redactions: Vec<Redaction>,
    pub risk_flags: Vec<RiskFlag>,
    pub disclaimer: String,
    pub run_metadata: RunMetadata,
}
