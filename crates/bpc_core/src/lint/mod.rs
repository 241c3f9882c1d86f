use crate::domain::{RiskCategory, RiskFlag};
use crate::policy::PolicyPack;

/// Scan answer text for banned phrases from the active pack.
///
/// Matching is case-insensitive substring; each distinct phrase present
/// yields exactly one flag regardless of how often it repeats. Runs on the
/// post-redaction candidate: masking only removes PII spans, never policy
/// wording. An empty result is a clean answer, not an error.
pub fn lint(text: &str, pack: &PolicyPack) -> Vec<RiskFlag> {
    let haystack = text.to_lowercase();
    pack.banned_phrases
        .iter()
        .filter(|phrase| haystack.contains(&phrase.to_lowercase()))
        .map(|phrase| {
            RiskFlag::new(
                RiskCategory::PolicyViolation,
                format!("Contains banned phrase: '{phrase}'"),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack() -> PolicyPack {
        PolicyPack::builtin().expect("builtin pack")
    }

    #[test]
    fn repeated_phrase_yields_single_flag() {
        let flags = lint(
            "Guaranteed approval! Yes, GUARANTEED APPROVAL for everyone.",
            &pack(),
        );
        assert_eq!(flags.len(), 1);
        assert_eq!(
            flags[0].to_string(),
            "policy_violation:Contains banned phrase: 'guaranteed approval'"
        );
    }

    #[test]
    fn multiple_distinct_phrases_yield_one_flag_each() {
        let flags = lint("This risk-free loan has guaranteed approval.", &pack());
        assert_eq!(flags.len(), 2);
    }

    #[test]
    fn clean_text_yields_no_flags() {
        assert!(lint("Collect Emirates ID and proof of address.", &pack()).is_empty());
    }
}
