//! Constraint profile files and request-time profile resolution.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::core::profile::{ConstraintProfile, preset};
use crate::core::types::{ContractType, Jurisdiction};

/// Load a constraint profile from a JSON or TOML file, chosen by extension.
pub fn load_profile(path: &Path) -> Result<ConstraintProfile> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") => {
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
        }
        Some("toml") => toml::from_str(&contents).with_context(|| format!("parse {}", path.display())),
        _ => Err(anyhow!(
            "unsupported profile format {} (expected .json or .toml)",
            path.display()
        )),
    }
}

/// Pick the profile for a request: a named preset wins, otherwise a default
/// profile for the contract type and jurisdiction (DPA and European Union when absent).
pub fn resolve_profile(
    preset_name: Option<&str>,
    contract_type: Option<&str>,
    jurisdiction: Option<&str>,
) -> Result<ConstraintProfile> {
    if let Some(name) = preset_name.filter(|name| !name.trim().is_empty()) {
        return Ok(preset(name.trim())?);
    }
    let contract_type = contract_type
        .map(str::parse::<ContractType>)
        .transpose()?
        .unwrap_or(ContractType::DataProcessing);
    let jurisdiction = jurisdiction
        .map(str::parse::<Jurisdiction>)
        .transpose()?
        .unwrap_or(Jurisdiction::EuropeanUnion);
    Ok(ConstraintProfile::new(contract_type, jurisdiction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RiskLevel;

    #[test]
    fn loads_toml_profile_with_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("profile.toml");
        fs::write(
            &path,
            r#"contract_type = "Master Services Agreement"
max_clause_words = 200
required_source_ids = ["MSA-1"]

[[forbidden_patterns]]
pattern = "(?i)exclusive"
reason = "No exclusivity"
severity = "medium"
"#,
        )
        .expect("write");

        let profile = load_profile(&path).expect("load");
        assert_eq!(profile.contract_type(), ContractType::MasterServices);
        assert_eq!(profile.jurisdiction(), Jurisdiction::Sweden);
        assert_eq!(profile.max_clause_words(), 200);
        assert_eq!(profile.forbidden_patterns()[0].severity(), RiskLevel::Medium);
        assert!(profile.required_source_ids().contains("MSA-1"));
    }

    #[test]
    fn loads_json_profile() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("profile.json");
        let profile = preset("privacy").expect("preset");
        fs::write(&path, serde_json::to_string(&profile).expect("serialize")).expect("write");
        assert_eq!(load_profile(&path).expect("load"), profile);
    }

    #[test]
    fn invalid_pattern_in_file_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("bad.json");
        fs::write(
            &path,
            r#"{"contract_type": "Privacy Policy", "forbidden_patterns": [{"pattern": "(", "reason": "r"}]}"#,
        )
        .expect("write");
        let err = load_profile(&path).unwrap_err();
        assert!(format!("{err:#}").contains("not a valid regular expression"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("profile.yaml");
        fs::write(&path, "contract_type: x").expect("write");
        assert!(load_profile(&path).is_err());
    }

    #[test]
    fn preset_wins_over_contract_type() {
        let profile = resolve_profile(Some("MSA"), Some("dpa"), Some("uk")).expect("resolve");
        assert_eq!(profile, preset("msa").expect("msa"));
    }

    #[test]
    fn custom_profile_defaults_to_dpa_in_eu() {
        let profile = resolve_profile(None, None, None).expect("resolve");
        assert_eq!(profile.contract_type(), ContractType::DataProcessing);
        assert_eq!(profile.jurisdiction(), Jurisdiction::EuropeanUnion);

        let profile = resolve_profile(Some(""), Some("nda"), Some("New York, USA")).expect("resolve");
        assert_eq!(profile.contract_type(), ContractType::NonDisclosure);
        assert_eq!(profile.jurisdiction(), Jurisdiction::NewYork);
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(resolve_profile(Some("lease"), None, None).is_err());
        assert!(resolve_profile(None, Some("lease"), None).is_err());
        assert!(resolve_profile(None, None, Some("mars")).is_err());
    }
}
