use crate::domain::{
    AnswerPayload, Citation, EvidenceSnippet, Redaction, RiskCategory, RiskFlag, RunMetadata,
};
use crate::grounding::{self, GroundingDecision};
use crate::lint;
use crate::pii::{self, RedactionOutcome};
use crate::policy::{PolicyPack, ResolvedJurisdiction};

/// Everything the gate needs about one request once generation has finished.
/// `pre` is the pre-generation redaction outcome over the question and the
/// retrieved context; `draft_answer` is the raw model output.
#[derive(Debug, Clone)]
pub struct GateInput {
    pub jurisdiction: ResolvedJurisdiction,
    pub pre: RedactionOutcome,
    pub evidence: Vec<EvidenceSnippet>,
    pub draft_answer: String,
    pub model: String,
    pub timestamp: String, // RFC3339
}

/// Render the fixed refusal answer. Byte-exact contract: tests assert against
/// this format, and audits rely on it being stable.
pub fn refusal_template(flags: &[RiskFlag]) -> String {
    let reasons = flags
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "I cannot provide a policy-confirmed answer with the current context. \
         Please consult a supervisor or escalate per KYC/SOP. Reason(s): {reasons}"
    )
}

/// Run the trust gate over a generated draft and assemble the final payload.
///
/// Stage order is fixed: the draft is redacted, the redacted draft is linted
/// and citation-checked, flags merge in detection order (jurisdiction
/// fallback, pre-generation PII, insufficient context, linter, citation gate,
/// post-generation PII), any forcing flag overwrites the answer with the
/// refusal template, and a final redaction pass runs over the outgoing text
/// so every path redacts. The payload is immutable once returned.
pub fn run_gate(pack: &PolicyPack, input: GateInput) -> AnswerPayload {
    // Post-generation redaction happens before the refusal branch so that
    // PII in a doomed draft is still recorded in the audit trail.
    let post = pii::redact(&input.draft_answer, pack);

    let lint_flags = lint::lint(&post.text, pack);
    let decision = grounding::check(&post.text, &input.evidence, pack);

    let mut risk_flags: Vec<RiskFlag> = Vec::new();
    if let Some(flag) = input.jurisdiction.fallback_flag.clone() {
        risk_flags.push(flag);
    }
    risk_flags.extend(input.pre.flags.iter().cloned());
    if input.evidence.is_empty() {
        risk_flags.push(RiskFlag::new(
            RiskCategory::InsufficientContext,
            "no policy snippets matched the question",
        ));
    }
    risk_flags.extend(lint_flags);
    if let GroundingDecision::Refused(reasons) = &decision {
        risk_flags.extend(reasons.iter().cloned());
    }
    risk_flags.extend(post.flags.iter().cloned());

    let must_refuse = risk_flags.iter().any(RiskFlag::is_forcing);
    let answer = if must_refuse {
        refusal_template(&risk_flags)
    } else {
        grounding::strip_doc_markers(&post.text)
    };

    // Uniform final pass; a no-op by construction on both paths because masks
    // never re-match and the refusal text carries no PII.
    let answer = pii::redact(&answer, pack).text;

    let citations: Vec<Citation> = input
        .evidence
        .iter()
        .map(Citation::from_snippet)
        .collect();
    let kb_snapshot_docs: Vec<String> = citations.iter().map(|c| c.policy_id.clone()).collect();

    AnswerPayload {
        answer,
        jurisdiction: input.jurisdiction.name.clone(),
        policy_pack_version: pack.version.clone(),
        citations,
        redactions: merge_redactions(&input.pre.redactions, &post.redactions),
        risk_flags,
        disclaimer: pack.required_disclaimer.clone(),
        run_metadata: RunMetadata {
            model: input.model,
            policy_pack_version: pack.version.clone(),
            kb_snapshot_docs,
            timestamp: input.timestamp,
        },
    }
}

/// Pre- and post-generation records merged in detection order, one entry per
/// rule type across the whole request.
fn merge_redactions(pre: &[Redaction], post: &[Redaction]) -> Vec<Redaction> {
    let mut out: Vec<Redaction> = Vec::with_capacity(pre.len() + post.len());
    for r in pre.iter().chain(post.iter()) {
        if !out.iter().any(|existing| existing.pii_type == r.pii_type) {
            out.push(r.clone());
        }
    }
    out
}
