use std::collections::BTreeMap;

use regex::Regex;
use serde::Deserialize;

use crate::domain::{RiskCategory, RiskFlag};
use crate::error::AppError;

/// Raw JSON shape of a policy pack file. Deserialized first, validated and
/// compiled second; no partially-valid pack ever leaves `load_json`.
#[derive(Debug, Clone, Deserialize)]
struct PolicyPackFile {
    policy_pack_version: String,
    default_jurisdiction: String,
    jurisdictions: BTreeMap<String, JurisdictionRulesFile>,
    banned_phrases: Vec<String>,
    pii_patterns: Vec<PiiRuleFile>,
    required_disclaimer: String,
    grounding_min_overlap: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct JurisdictionRulesFile {
    directive: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PiiRuleFile {
    #[serde(rename = "type")]
    pii_type: String,
    pattern: String,
    mask: String,
}

#[derive(Debug, Clone)]
pub struct JurisdictionRules {
    pub directive: String,
}

/// One compiled PII detector. Declaration order in the pack is scan order.
#[derive(Debug, Clone)]
pub struct PiiRule {
    pub pii_type: String,
    pub detector: Regex,
    pub mask: String,
}

/// Immutable, versioned compliance configuration. Loaded once, injected by
/// reference into every gate component; replacement is a whole-pack swap by
/// the owner, never a field update.
#[derive(Debug, Clone)]
pub struct PolicyPack {
    pub version: String,
    pub default_jurisdiction: String,
    pub jurisdictions: BTreeMap<String, JurisdictionRules>,
    pub banned_phrases: Vec<String>,
    pub pii_rules: Vec<PiiRule>,
    pub required_disclaimer: String,
    pub grounding_min_overlap: f64,
}

/// Jurisdiction lookup result. `fallback_flag` is set when the requested
/// jurisdiction was unknown and the default applied instead.
#[derive(Debug, Clone)]
pub struct ResolvedJurisdiction {
    pub name: String,
    pub directive: String,
    pub fallback_flag: Option<RiskFlag>,
}

const BUILTIN_PACK_JSON: &str = include_str!("../../packs/policy_pack.json");

impl PolicyPack {
    /// Parse, validate and compile a pack from its JSON source. All-or-nothing:
    /// any schema violation or pattern compile failure rejects the whole pack.
    pub fn load_json(json: &str) -> Result<Self, AppError> {
        let file: PolicyPackFile = serde_json::from_str(json).map_err(|e| {
            AppError::policy_pack("PARSE_FAILED", "Failed to parse policy pack JSON")
                .with_details(e.to_string())
        })?;

        if file.policy_pack_version.trim().is_empty() {
            return Err(AppError::policy_pack(
                "VERSION_EMPTY",
                "policy_pack_version must be non-empty",
            ));
        }
        if file.jurisdictions.is_empty() {
            return Err(AppError::policy_pack(
                "JURISDICTIONS_EMPTY",
                "At least one jurisdiction is required",
            ));
        }
        if !file.jurisdictions.contains_key(&file.default_jurisdiction) {
            return Err(AppError::policy_pack(
                "DEFAULT_JURISDICTION_UNKNOWN",
                "default_jurisdiction must be a declared jurisdiction",
            )
            .with_details(file.default_jurisdiction.clone()));
        }
        for (name, rules) in file.jurisdictions.iter() {
            if name.trim().is_empty() || rules.directive.trim().is_empty() {
                return Err(AppError::policy_pack(
                    "JURISDICTION_INVALID",
                    "Jurisdiction keys and directives must be non-empty",
                )
                .with_details(format!("jurisdiction={name}")));
            }
        }
        for phrase in file.banned_phrases.iter() {
            if phrase.trim().is_empty() {
                return Err(AppError::policy_pack(
                    "BANNED_PHRASE_EMPTY",
                    "Banned phrases must be non-empty",
                ));
            }
        }
        if !(0.0..=1.0).contains(&file.grounding_min_overlap) {
            return Err(AppError::policy_pack(
                "GROUNDING_THRESHOLD_INVALID",
                "grounding_min_overlap must be within 0.0..=1.0",
            )
            .with_details(file.grounding_min_overlap.to_string()));
        }
        if file.required_disclaimer.trim().is_empty() {
            return Err(AppError::policy_pack(
                "DISCLAIMER_EMPTY",
                "required_disclaimer must be non-empty",
            ));
        }

        let mut pii_rules: Vec<PiiRule> = Vec::with_capacity(file.pii_patterns.len());
        for rule in file.pii_patterns.iter() {
            if rule.pii_type.trim().is_empty() {
                return Err(AppError::policy_pack(
                    "PII_TYPE_EMPTY",
                    "PII rule types must be non-empty",
                ));
            }
            if pii_rules.iter().any(|r| r.pii_type == rule.pii_type) {
                return Err(AppError::policy_pack(
                    "PII_TYPE_DUPLICATE",
                    "PII rule types must be unique",
                )
                .with_details(rule.pii_type.clone()));
            }
            let detector = Regex::new(&rule.pattern).map_err(|e| {
                AppError::policy_pack("PII_PATTERN_INVALID", "PII pattern failed to compile")
                    .with_details(format!("type={}; err={e}", rule.pii_type))
            })?;
            pii_rules.push(PiiRule {
                pii_type: rule.pii_type.clone(),
                detector,
                mask: rule.mask.clone(),
            });
        }

        Ok(PolicyPack {
            version: file.policy_pack_version,
            default_jurisdiction: file.default_jurisdiction,
            jurisdictions: file
                .jurisdictions
                .into_iter()
                .map(|(k, v)| {
                    (
                        k,
                        JurisdictionRules {
                            directive: v.directive,
                        },
                    )
                })
                .collect(),
            banned_phrases: file.banned_phrases,
            pii_rules,
            required_disclaimer: file.required_disclaimer,
            grounding_min_overlap: file.grounding_min_overlap,
        })
    }

    /// The embedded default pack (PAN/IBAN/SSN/EID detectors, UAE default).
    pub fn builtin() -> Result<Self, AppError> {
        Self::load_json(BUILTIN_PACK_JSON)
    }

    /// Resolve the requested jurisdiction, falling back to the pack default
    /// with an informational flag when it is unknown or absent. Fail-closed:
    /// an unknown key is never silently honored.
    pub fn resolve_jurisdiction(&self, requested: Option<&str>) -> ResolvedJurisdiction {
        let requested = requested.map(str::trim).filter(|s| !s.is_empty());
        if let Some(name) = requested {
            if let Some(rules) = self.jurisdictions.get(name) {
                return ResolvedJurisdiction {
                    name: name.to_string(),
                    directive: rules.directive.clone(),
                    fallback_flag: None,
                };
            }
            let mut resolved = self.default_resolved();
            resolved.fallback_flag = Some(RiskFlag::new(
                RiskCategory::JurisdictionFallback,
                format!(
                    "unknown jurisdiction '{name}', using default '{}'",
                    self.default_jurisdiction
                ),
            ));
            return resolved;
        }
        self.default_resolved()
    }

    fn default_resolved(&self) -> ResolvedJurisdiction {
        // The loader guarantees the default key exists; a hand-built pack
        // that breaks that invariant degrades to an empty directive.
        let directive = self
            .jurisdictions
            .get(&self.default_jurisdiction)
            .map(|r| r.directive.clone())
            .unwrap_or_default();
        ResolvedJurisdiction {
            name: self.default_jurisdiction.clone(),
            directive,
            fallback_flag: None,
        }
    }
}
