use std::cell::RefCell;

use pretty_assertions::assert_eq;

use bpc_ai::chain::ask;
use bpc_ai::demo::demo_policy_docs;
use bpc_ai::llm::Llm;
use bpc_ai::retrieve::SnapshotIndex;
use bpc_ai::telemetry::{NoopTelemetry, TelemetrySink};
use bpc_core::assemble::refusal_template;
use bpc_core::domain::{AskRequest, Redaction, RiskCategory, RiskFlag, RunMetadata};
use bpc_core::error::AppError;
use bpc_core::policy::PolicyPack;

struct MockLlm {
    out: String,
}

impl Llm for MockLlm {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AppError> {
        Ok(self.out.clone())
    }
}

struct FailingLlm;

impl Llm for FailingLlm {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AppError> {
        Err(AppError::new("GENERATION_FAILED", "upstream unavailable").with_retryable(true))
    }
}

#[derive(Default)]
struct RecordingTelemetry {
    runs: RefCell<Vec<RunMetadata>>,
}

impl TelemetrySink for RecordingTelemetry {
    fn record(
        &self,
        run: &RunMetadata,
        _risk_flags: &[RiskFlag],
        _redactions: &[Redaction],
    ) -> Result<(), AppError> {
        self.runs.borrow_mut().push(run.clone());
        Ok(())
    }
}

struct FailingTelemetry;

impl TelemetrySink for FailingTelemetry {
    fn record(
        &self,
        _run: &RunMetadata,
        _risk_flags: &[RiskFlag],
        _redactions: &[Redaction],
    ) -> Result<(), AppError> {
        Err(AppError::new("TELEMETRY_WRITE_FAILED", "sink offline"))
    }
}

fn fixtures() -> (PolicyPack, SnapshotIndex) {
    let pack = PolicyPack::builtin().expect("builtin pack");
    let index = SnapshotIndex::build(demo_policy_docs()).expect("snapshot");
    (pack, index)
}

fn onboarding_request(jurisdiction: &str) -> AskRequest {
    AskRequest {
        question: "What documents are needed for onboarding?".to_string(),
        jurisdiction: Some(jurisdiction.to_string()),
    }
}

const GROUNDED_ANSWER: &str = "Onboarding requires Emirates ID, passport copy, proof of \
     address, and source of funds documentation before account activation. [[doc:KYC-001]]";

#[test]
fn scenario_a_grounded_clean_answer() {
    let (pack, index) = fixtures();
    let llm = MockLlm {
        out: GROUNDED_ANSWER.to_string(),
    };
    let telemetry = RecordingTelemetry::default();

    let payload = ask(
        &pack,
        &index,
        &llm,
        &telemetry,
        "gpt-4o-mini",
        onboarding_request("UAE"),
    )
    .expect("ask should succeed");

    assert!(payload.risk_flags.is_empty());
    assert!(!payload.citations.is_empty());
    assert_eq!(payload.citations[0].policy_id, "KYC-001");
    assert_eq!(payload.jurisdiction, "UAE");
    assert_eq!(payload.policy_pack_version, pack.version);
    assert_eq!(payload.disclaimer, pack.required_disclaimer);
    assert_ne!(payload.answer, refusal_template(&payload.risk_flags));
    assert!(!payload.answer.contains("[[doc:"));

    let runs = telemetry.runs.borrow();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].model, "gpt-4o-mini");
    assert_eq!(runs[0].kb_snapshot_docs, vec!["KYC-001"]);
}

#[test]
fn scenario_b_pan_and_banned_phrase_refuses() {
    let (pack, index) = fixtures();
    let llm = MockLlm {
        out: "Your card 4111 1111 1111 1234 has guaranteed approval for onboarding \
              documents. [[doc:KYC-001]]"
            .to_string(),
    };

    let payload = ask(
        &pack,
        &index,
        &llm,
        &NoopTelemetry,
        "gpt-4o-mini",
        onboarding_request("UAE"),
    )
    .expect("ask should succeed");

    assert_eq!(payload.redactions.len(), 1);
    assert_eq!(payload.redactions[0].pii_type, "PAN");
    assert_eq!(payload.redactions[0].original_snippet, "<hidden>");
    assert_eq!(payload.redactions[0].mask_pattern, "**** **** **** ####");

    let rendered: Vec<String> = payload.risk_flags.iter().map(|f| f.to_string()).collect();
    assert!(rendered
        .contains(&"policy_violation:Contains banned phrase: 'guaranteed approval'".to_string()));
    assert_eq!(payload.answer, refusal_template(&payload.risk_flags));
    assert!(payload
        .answer
        .contains("Contains banned phrase: 'guaranteed approval'"));
    assert!(!payload.answer.contains("4111"));
}

#[test]
fn scenario_c_unknown_jurisdiction_falls_back() {
    let (pack, index) = fixtures();
    let llm = MockLlm {
        out: GROUNDED_ANSWER.to_string(),
    };

    let payload = ask(
        &pack,
        &index,
        &llm,
        &NoopTelemetry,
        "gpt-4o-mini",
        onboarding_request("ZZ"),
    )
    .expect("fallback is never a hard error");

    assert_eq!(payload.jurisdiction, "UAE");
    assert!(payload
        .risk_flags
        .iter()
        .any(|f| f.category == RiskCategory::JurisdictionFallback));
    assert_ne!(payload.answer, refusal_template(&payload.risk_flags));
}

#[test]
fn generation_failure_aborts_without_partial_payload() {
    let (pack, index) = fixtures();
    let telemetry = RecordingTelemetry::default();

    let err = ask(
        &pack,
        &index,
        &FailingLlm,
        &telemetry,
        "gpt-4o-mini",
        onboarding_request("UAE"),
    )
    .expect_err("generation failure must surface");

    assert_eq!(err.code, "GENERATION_FAILED");
    assert!(err.retryable);
    // Nothing was assembled, so nothing was recorded.
    assert!(telemetry.runs.borrow().is_empty());
}

#[test]
fn telemetry_failure_never_fails_the_response() {
    let (pack, index) = fixtures();
    let llm = MockLlm {
        out: GROUNDED_ANSWER.to_string(),
    };

    let payload = ask(
        &pack,
        &index,
        &llm,
        &FailingTelemetry,
        "gpt-4o-mini",
        onboarding_request("UAE"),
    )
    .expect("sink failure is swallowed");
    assert!(payload.risk_flags.is_empty());
}

#[test]
fn pii_in_question_is_masked_before_prompting() {
    let (pack, index) = fixtures();
    let llm = MockLlm {
        out: GROUNDED_ANSWER.to_string(),
    };

    let payload = ask(
        &pack,
        &index,
        &llm,
        &NoopTelemetry,
        "gpt-4o-mini",
        AskRequest {
            question: "What onboarding documents are needed for card 4111 1111 1111 1234?"
                .to_string(),
            jurisdiction: Some("UAE".to_string()),
        },
    )
    .expect("ask should succeed");

    // The question-stage redaction shows up in the audit trail even though
    // the answer itself was clean.
    assert!(payload.redactions.iter().any(|r| r.pii_type == "PAN"));
    assert!(payload
        .risk_flags
        .iter()
        .any(|f| f.category == RiskCategory::PiiDetected));
    // Informational only: still not a refusal.
    assert_ne!(payload.answer, refusal_template(&payload.risk_flags));
}
