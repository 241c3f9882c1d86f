use bpc_core::domain::EvidenceSnippet;

pub const NO_MATCH_CONTEXT: &str = "NO_MATCH";

/// One line per snippet: `- [title|policy_id|jurisdiction|from→to] text`,
/// newlines flattened. `NO_MATCH` when retrieval came back empty.
pub fn context_block(evidence: &[EvidenceSnippet]) -> String {
    if evidence.is_empty() {
        return NO_MATCH_CONTEXT.to_string();
    }
    evidence
        .iter()
        .map(|s| {
            let flat = s.text.trim().replace('\n', " ");
            format!(
                "- [{}|{}|{}|{}→{}] {flat}",
                s.title, s.doc_id, s.jurisdiction, s.effective_from, s.effective_to
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full prompt for one generation call. The contract is explicit:
/// - answer ONLY from the provided snippets, citing them as [[doc:<policy_id>]];
/// - never reveal raw PII, masked forms only;
/// - refuse when the context is insufficient.
pub fn build_prompt(jurisdiction_directive: &str, question: &str, context: &str) -> String {
    format!(
        r#"You are a banking policy copilot focused on TRUST, OBSERVABILITY, and COMPLIANCE.
- Answer ONLY from the policy snippets below. Cite each supporting snippet inline as [[doc:<policy_id>]].
- If you lack sufficient citations, refuse and suggest escalation.
- NEVER reveal raw PII; only masked forms may appear in the answer.
- Output must be concise, actionable, and policy-correct.
- Jurisdiction to follow: {jurisdiction_directive}

USER QUESTION:
{question}

CONTEXT (policy snippets):
{context}

CONSTRAINTS:
- Require citations.
- If context is insufficient or conflicting, say so and suggest escalation.
- Avoid banned phrases; be precise with refund/fee/KYC language.

Respond clearly for frontline use.
"#
    )
}
