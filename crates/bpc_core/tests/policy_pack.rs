use pretty_assertions::assert_eq;

use bpc_core::policy::PolicyPack;

fn valid_pack_json() -> serde_json::Value {
    serde_json::json!({
        "policy_pack_version": "2025-08-01",
        "default_jurisdiction": "UAE",
        "jurisdictions": {
            "UAE": { "directive": "Apply UAE Central Bank regulations." },
            "EU": { "directive": "Apply PSD2 and GDPR constraints." }
        },
        "banned_phrases": ["guaranteed approval"],
        "pii_patterns": [
            { "type": "SSN", "pattern": "\\b\\d{3}-\\d{2}-\\d{4}\\b", "mask": "***-**-####" }
        ],
        "required_disclaimer": "Not legal advice.",
        "grounding_min_overlap": 0.2
    })
}

fn load(value: serde_json::Value) -> Result<PolicyPack, bpc_core::error::AppError> {
    PolicyPack::load_json(&value.to_string())
}

#[test]
fn builtin_pack_loads_with_expected_rules() {
    let pack = PolicyPack::builtin().expect("builtin pack must load");
    assert_eq!(pack.version, "2025-08-01");
    assert_eq!(pack.default_jurisdiction, "UAE");
    let types: Vec<&str> = pack.pii_rules.iter().map(|r| r.pii_type.as_str()).collect();
    assert_eq!(types, vec!["PAN", "IBAN", "SSN", "EID"]);
    assert!(pack
        .banned_phrases
        .iter()
        .any(|p| p == "guaranteed approval"));
}

#[test]
fn pack_loads_from_a_file_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("policy_pack.json");
    std::fs::write(&path, valid_pack_json().to_string()).expect("write pack");

    let json = std::fs::read_to_string(&path).expect("read pack");
    let pack = PolicyPack::load_json(&json).expect("load");
    assert_eq!(pack.version, "2025-08-01");
}

#[test]
fn empty_version_rejects_whole_pack() {
    let mut v = valid_pack_json();
    v["policy_pack_version"] = serde_json::json!("  ");
    let err = load(v).expect_err("should reject");
    assert_eq!(err.code, "POLICY_PACK_VERSION_EMPTY");
}

#[test]
fn missing_field_rejects_whole_pack() {
    let mut v = valid_pack_json();
    v.as_object_mut().unwrap().remove("required_disclaimer");
    let err = load(v).expect_err("should reject");
    assert_eq!(err.code, "POLICY_PACK_PARSE_FAILED");
}

#[test]
fn bad_regex_rejects_whole_pack() {
    let mut v = valid_pack_json();
    v["pii_patterns"][0]["pattern"] = serde_json::json!("([unclosed");
    let err = load(v).expect_err("should reject");
    assert_eq!(err.code, "POLICY_PACK_PII_PATTERN_INVALID");
}

#[test]
fn duplicate_pii_type_rejects_whole_pack() {
    let mut v = valid_pack_json();
    let rule = v["pii_patterns"][0].clone();
    v["pii_patterns"].as_array_mut().unwrap().push(rule);
    let err = load(v).expect_err("should reject");
    assert_eq!(err.code, "POLICY_PACK_PII_TYPE_DUPLICATE");
}

#[test]
fn unknown_default_jurisdiction_rejects_whole_pack() {
    let mut v = valid_pack_json();
    v["default_jurisdiction"] = serde_json::json!("MARS");
    let err = load(v).expect_err("should reject");
    assert_eq!(err.code, "POLICY_PACK_DEFAULT_JURISDICTION_UNKNOWN");
}

#[test]
fn out_of_range_grounding_threshold_rejects_whole_pack() {
    let mut v = valid_pack_json();
    v["grounding_min_overlap"] = serde_json::json!(1.5);
    let err = load(v).expect_err("should reject");
    assert_eq!(err.code, "POLICY_PACK_GROUNDING_THRESHOLD_INVALID");
}

#[test]
fn known_jurisdiction_resolves_without_flag() {
    let pack = load(valid_pack_json()).expect("load");
    let resolved = pack.resolve_jurisdiction(Some("EU"));
    assert_eq!(resolved.name, "EU");
    assert!(resolved.fallback_flag.is_none());
}

#[test]
fn unknown_jurisdiction_falls_back_with_informational_flag() {
    let pack = load(valid_pack_json()).expect("load");
    let resolved = pack.resolve_jurisdiction(Some("ZZ"));
    assert_eq!(resolved.name, "UAE");
    let flag = resolved.fallback_flag.expect("fallback flag");
    assert_eq!(
        flag.to_string(),
        "jurisdiction_fallback:unknown jurisdiction 'ZZ', using default 'UAE'"
    );
}

#[test]
fn absent_jurisdiction_uses_default_silently() {
    let pack = load(valid_pack_json()).expect("load");
    let resolved = pack.resolve_jurisdiction(None);
    assert_eq!(resolved.name, "UAE");
    assert!(resolved.fallback_flag.is_none());
}
