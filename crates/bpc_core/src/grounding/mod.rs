use std::collections::BTreeSet;

use crate::domain::{EvidenceSnippet, RiskCategory, RiskFlag};
use crate::policy::PolicyPack;

/// Outcome of the citation gate. A refusal carries the reasons and is a
/// mandatory override: the assembler substitutes the refusal template and no
/// downstream step can reintroduce the ungrounded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroundingDecision {
    Grounded,
    Refused(Vec<RiskFlag>),
}

impl GroundingDecision {
    pub fn is_grounded(&self) -> bool {
        matches!(self, GroundingDecision::Grounded)
    }
}

/// Decide whether `answer` is adequately supported by the retrieved evidence.
///
/// Two acceptance routes, checked in order:
/// 1. an explicit `[[doc:<doc_id>]]` marker in the answer that resolves to a
///    retrieved snippet;
/// 2. lexical overlap: the fraction of the answer's significant terms present
///    in the best single snippet reaches `pack.grounding_min_overlap`.
///
/// Empty evidence always refuses.
pub fn check(
    answer: &str,
    evidence: &[EvidenceSnippet],
    pack: &PolicyPack,
) -> GroundingDecision {
    if evidence.is_empty() {
        return GroundingDecision::Refused(vec![RiskFlag::new(
            RiskCategory::NoCitation,
            "no supporting documents retrieved",
        )]);
    }

    let markers = extract_doc_markers(answer);
    if markers
        .iter()
        .any(|id| evidence.iter().any(|s| &s.doc_id == id))
    {
        return GroundingDecision::Grounded;
    }

    let terms = significant_terms(&strip_doc_markers(answer));
    if terms.is_empty() {
        return GroundingDecision::Refused(vec![RiskFlag::new(
            RiskCategory::NoCitation,
            "answer has no significant terms to ground",
        )]);
    }

    let mut best = 0.0f64;
    for snippet in evidence.iter() {
        let snippet_terms: BTreeSet<String> = tokenize(&snippet.text).collect();
        let hits = terms.iter().filter(|t| snippet_terms.contains(*t)).count();
        let fraction = hits as f64 / terms.len() as f64;
        if fraction > best {
            best = fraction;
        }
    }

    if best >= pack.grounding_min_overlap {
        GroundingDecision::Grounded
    } else {
        GroundingDecision::Refused(vec![RiskFlag::new(
            RiskCategory::NoCitation,
            format!(
                "insufficient lexical overlap with cited snippets ({best:.2} < {:.2})",
                pack.grounding_min_overlap
            ),
        )])
    }
}

/// Parse `[[doc:<doc_id>]]` markers out of model output.
pub fn extract_doc_markers(text: &str) -> BTreeSet<String> {
    const OPEN: &str = "[[doc:";
    let mut out = BTreeSet::new();
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        match after.find("]]") {
            Some(end) => {
                let id = after[..end].trim();
                if !id.is_empty() && !id.contains('[') && !id.contains(']') {
                    out.insert(id.to_string());
                }
                rest = &after[end + 2..];
            }
            None => break,
        }
    }
    out
}

/// Remove citation markers from user-visible text, leaving the prose intact.
pub fn strip_doc_markers(text: &str) -> String {
    const OPEN: &str = "[[doc:";
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        match after.find("]]") {
            Some(end) => {
                out.push_str(rest[..start].trim_end());
                rest = after[end + 2..].trim_start();
                if !out.is_empty() && !rest.is_empty() {
                    out.push(' ');
                }
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Lowercased alphanumeric tokens of length >= 4, deduplicated. Short tokens
/// (articles, "the", ids like "a1") carry too little signal to count.
pub fn significant_terms(text: &str) -> BTreeSet<String> {
    tokenize(text).filter(|t| t.chars().count() >= 4).collect()
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}
