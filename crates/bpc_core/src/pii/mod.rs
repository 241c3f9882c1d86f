use std::borrow::Cow;

use crate::domain::{Redaction, RiskCategory, RiskFlag};
use crate::policy::{PiiRule, PolicyPack};

/// Result of one redaction pass: the masked text plus the audit trail for it.
/// One redaction record and one `pii_detected` flag per rule type that
/// matched, in pack order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionOutcome {
    pub text: String,
    pub redactions: Vec<Redaction>,
    pub flags: Vec<RiskFlag>,
}

impl RedactionOutcome {
    pub fn untouched(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            redactions: Vec::new(),
            flags: Vec::new(),
        }
    }
}

/// Mask every PII match in `text` using the pack's rules.
///
/// Rules apply in pack-declaration order; within a rule, matches are replaced
/// left to right, non-overlapping. Each rule scans the text already masked by
/// earlier rules, so a span claimed by one rule is never re-matched by a
/// later one (first-match-wins) and placeholders are never masked again.
/// Deterministic for identical input; no match returns the input unchanged.
pub fn redact(text: &str, pack: &PolicyPack) -> RedactionOutcome {
    pack.pii_rules
        .iter()
        .fold(RedactionOutcome::untouched(text), |mut acc, rule| {
            let masked = apply_rule(&acc.text, rule);
            if let Cow::Owned(new_text) = masked {
                acc.text = new_text;
                acc.redactions
                    .push(Redaction::new(rule.pii_type.clone(), rule.mask.clone()));
                acc.flags
                    .push(RiskFlag::new(RiskCategory::PiiDetected, rule.pii_type.clone()));
            }
            acc
        })
}

fn apply_rule<'t>(text: &'t str, rule: &PiiRule) -> Cow<'t, str> {
    rule.detector.replace_all(text, |caps: &regex::Captures| {
        mask_match(&rule.mask, &caps[0])
    })
}

/// Render the mask template for one match. `####` in the template keeps the
/// final four characters of the matched span (the whole span when shorter),
/// so e.g. a 16-digit PAN becomes `**** **** **** 1234`.
fn mask_match(mask: &str, matched: &str) -> String {
    if !mask.contains("####") {
        return mask.to_string();
    }
    let chars: Vec<char> = matched.chars().collect();
    let tail: String = if chars.len() >= 4 {
        chars[chars.len() - 4..].iter().collect()
    } else {
        chars.iter().collect()
    };
    mask.replace("####", &tail)
}
