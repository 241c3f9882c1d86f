use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use bpc_core::assemble::{run_gate, GateInput};
use bpc_core::domain::{AnswerPayload, AskRequest, EvidenceSnippet};
use bpc_core::error::AppError;
use bpc_core::pii::{self, RedactionOutcome};
use bpc_core::policy::PolicyPack;

use crate::llm::Llm;
use crate::prompts;
use crate::retrieve::Retriever;
use crate::telemetry::TelemetrySink;

/// End-to-end question handling: retrieve, redact, generate, gate, record.
///
/// Only configuration and generation failures surface as errors; every
/// compliance condition comes back inside a well-formed payload. A
/// generation failure aborts before the gate runs, so no partial payload is
/// ever assembled.
pub fn ask(
    pack: &PolicyPack,
    retriever: &dyn Retriever,
    llm: &dyn Llm,
    telemetry: &dyn TelemetrySink,
    model: &str,
    req: AskRequest,
) -> Result<AnswerPayload, AppError> {
    let jurisdiction = pack.resolve_jurisdiction(req.jurisdiction.as_deref());

    // Pre-generation redaction of the question; the raw question still drives
    // retrieval so masked digits do not distort ranking.
    let question_pass = pii::redact(&req.question, pack);

    let today = OffsetDateTime::now_utc().date();
    let raw_evidence = retriever.search(&req.question, &jurisdiction.name, today)?;

    // Pre-generation redaction of the retrieved context. Both the prompt and
    // everything downstream (gate, citations) see only masked snippet text.
    let (evidence, pre) = redact_context(question_pass, raw_evidence, pack);

    let context = prompts::context_block(&evidence);
    let prompt = prompts::build_prompt(&jurisdiction.directive, &pre.text, &context);
    let draft_answer = llm.generate(model, &prompt)?;

    let timestamp = OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new("RUN_TIMESTAMP_FAILED", "Failed to format run timestamp")
            .with_details(e.to_string())
    })?;

    let payload = run_gate(
        pack,
        GateInput {
            jurisdiction,
            pre,
            evidence,
            draft_answer,
            model: model.to_string(),
            timestamp,
        },
    );

    // Fire-and-forget: a telemetry failure must never fail the response.
    let _ = telemetry.record(&payload.run_metadata, &payload.risk_flags, &payload.redactions);

    Ok(payload)
}

/// Mask snippet texts, folding their redaction records and flags into the
/// pre-generation outcome started by the question pass.
fn redact_context(
    question_pass: RedactionOutcome,
    raw_evidence: Vec<EvidenceSnippet>,
    pack: &PolicyPack,
) -> (Vec<EvidenceSnippet>, RedactionOutcome) {
    let mut pre = question_pass;
    let evidence = raw_evidence
        .into_iter()
        .map(|mut snippet| {
            let pass = pii::redact(&snippet.text, pack);
            snippet.text = pass.text;
            pre.redactions.extend(pass.redactions);
            pre.flags.extend(pass.flags);
            snippet
        })
        .collect();
    (evidence, pre)
}
