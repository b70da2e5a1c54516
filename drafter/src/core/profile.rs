//! Constraint profiles: the rule set a drafted contract must satisfy.
//!
//! A profile is built once per request (or taken from a named preset) and is
//! never mutated while a run is in flight. Construction rejects profiles that
//! could never be enforced, so every profile that reaches the validator is
//! internally consistent.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{ContractType, Jurisdiction, RiskLevel};

/// Reasons a profile (or one of its rules) is rejected at construction.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(
        "liability rule is unconstrained: set max_amount, cap_multiple_of_fees or allows_unlimited"
    )]
    UnconstrainedLiability,
    #[error("forbidden pattern '{pattern}' is not a valid regular expression")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("max_clause_words must be > 0")]
    ZeroClauseWords,
    #[error("unknown preset '{0}' (expected one of: dpa, msa, privacy)")]
    UnknownPreset(String),
}

/// Liability limits. At least one cap mechanism is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLiabilityRule")]
pub struct LiabilityRule {
    max_amount: Option<f64>,
    cap_multiple_of_fees: Option<f64>,
    allows_consequential_damages: bool,
    allows_unlimited: bool,
}

#[derive(Deserialize)]
struct RawLiabilityRule {
    #[serde(default)]
    max_amount: Option<f64>,
    #[serde(default)]
    cap_multiple_of_fees: Option<f64>,
    #[serde(default)]
    allows_consequential_damages: bool,
    #[serde(default)]
    allows_unlimited: bool,
}

impl TryFrom<RawLiabilityRule> for LiabilityRule {
    type Error = ProfileError;

    fn try_from(raw: RawLiabilityRule) -> Result<Self, Self::Error> {
        LiabilityRule::new(
            raw.max_amount,
            raw.cap_multiple_of_fees,
            raw.allows_consequential_damages,
            raw.allows_unlimited,
        )
    }
}

impl LiabilityRule {
    pub fn new(
        max_amount: Option<f64>,
        cap_multiple_of_fees: Option<f64>,
        allows_consequential_damages: bool,
        allows_unlimited: bool,
    ) -> Result<Self, ProfileError> {
        if max_amount.is_none() && cap_multiple_of_fees.is_none() && !allows_unlimited {
            return Err(ProfileError::UnconstrainedLiability);
        }
        Ok(Self {
            max_amount,
            cap_multiple_of_fees,
            allows_consequential_damages,
            allows_unlimited,
        })
    }

    /// Absolute cap; consequential damages disallowed.
    pub fn capped_amount(amount: f64) -> Self {
        Self {
            max_amount: Some(amount),
            cap_multiple_of_fees: None,
            allows_consequential_damages: false,
            allows_unlimited: false,
        }
    }

    /// Cap expressed as a multiple of fees; consequential damages disallowed.
    pub fn fee_multiple(multiple: f64) -> Self {
        Self {
            max_amount: None,
            cap_multiple_of_fees: Some(multiple),
            allows_consequential_damages: false,
            allows_unlimited: false,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            max_amount: None,
            cap_multiple_of_fees: None,
            allows_consequential_damages: false,
            allows_unlimited: true,
        }
    }

    pub fn allowing_consequential_damages(mut self) -> Self {
        self.allows_consequential_damages = true;
        self
    }

    pub fn max_amount(&self) -> Option<f64> {
        self.max_amount
    }

    pub fn cap_multiple_of_fees(&self) -> Option<f64> {
        self.cap_multiple_of_fees
    }

    pub fn allows_consequential_damages(&self) -> bool {
        self.allows_consequential_damages
    }

    pub fn allows_unlimited(&self) -> bool {
        self.allows_unlimited
    }
}

impl Default for LiabilityRule {
    fn default() -> Self {
        LiabilityRule::fee_multiple(2.0)
    }
}

/// Data handling and privacy requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataProtectionRule {
    pub jurisdiction: Jurisdiction,
    pub requires_gdpr: bool,
    pub max_retention_days: Option<u32>,
    pub requires_breach_notice: bool,
    pub max_breach_notice_hours: u32,
    pub allows_cross_border_transfer: bool,
    pub requires_sub_processor_approval: bool,
}

impl Default for DataProtectionRule {
    fn default() -> Self {
        Self {
            jurisdiction: Jurisdiction::EuropeanUnion,
            requires_gdpr: true,
            max_retention_days: None,
            requires_breach_notice: true,
            max_breach_notice_hours: 72,
            allows_cross_border_transfer: true,
            requires_sub_processor_approval: true,
        }
    }
}

/// Termination requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationRule {
    pub min_notice_days: u32,
    pub allows_for_convenience: bool,
    pub requires_data_return: bool,
}

impl Default for TerminationRule {
    fn default() -> Self {
        Self {
            min_notice_days: 30,
            allows_for_convenience: true,
            requires_data_return: true,
        }
    }
}

/// Phrasing that must never appear in a draft.
///
/// The pattern is compiled once at construction; case sensitivity is whatever
/// the pattern itself declares (presets use `(?i)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawForbiddenPattern", into = "RawForbiddenPattern")]
pub struct ForbiddenPattern {
    regex: Regex,
    reason: String,
    severity: RiskLevel,
}

#[derive(Serialize, Deserialize)]
struct RawForbiddenPattern {
    pattern: String,
    reason: String,
    #[serde(default = "default_pattern_severity")]
    severity: RiskLevel,
}

fn default_pattern_severity() -> RiskLevel {
    RiskLevel::High
}

impl TryFrom<RawForbiddenPattern> for ForbiddenPattern {
    type Error = ProfileError;

    fn try_from(raw: RawForbiddenPattern) -> Result<Self, Self::Error> {
        ForbiddenPattern::new(&raw.pattern, raw.reason, raw.severity)
    }
}

impl From<ForbiddenPattern> for RawForbiddenPattern {
    fn from(pattern: ForbiddenPattern) -> Self {
        Self {
            pattern: pattern.regex.as_str().to_string(),
            reason: pattern.reason,
            severity: pattern.severity,
        }
    }
}

impl ForbiddenPattern {
    pub fn new(
        pattern: &str,
        reason: impl Into<String>,
        severity: RiskLevel,
    ) -> Result<Self, ProfileError> {
        let regex = Regex::new(pattern).map_err(|source| ProfileError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            regex,
            reason: reason.into(),
            severity,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn severity(&self) -> RiskLevel {
        self.severity
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for ForbiddenPattern {
    fn eq(&self, other: &Self) -> bool {
        self.regex.as_str() == other.regex.as_str()
            && self.reason == other.reason
            && self.severity == other.severity
    }
}

/// The full rule set for one contract request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawConstraintProfile")]
pub struct ConstraintProfile {
    contract_type: ContractType,
    jurisdiction: Jurisdiction,
    liability: LiabilityRule,
    data_protection: DataProtectionRule,
    termination: TerminationRule,
    forbidden_patterns: Vec<ForbiddenPattern>,
    required_source_ids: BTreeSet<String>,
    max_clause_words: usize,
}

#[derive(Deserialize)]
struct RawConstraintProfile {
    contract_type: ContractType,
    #[serde(default = "default_jurisdiction")]
    jurisdiction: Jurisdiction,
    #[serde(default)]
    liability: LiabilityRule,
    #[serde(default)]
    data_protection: DataProtectionRule,
    #[serde(default)]
    termination: TerminationRule,
    #[serde(default)]
    forbidden_patterns: Vec<ForbiddenPattern>,
    #[serde(default)]
    required_source_ids: BTreeSet<String>,
    #[serde(default = "default_max_clause_words")]
    max_clause_words: usize,
}

fn default_jurisdiction() -> Jurisdiction {
    Jurisdiction::Sweden
}

fn default_max_clause_words() -> usize {
    500
}

impl TryFrom<RawConstraintProfile> for ConstraintProfile {
    type Error = ProfileError;

    fn try_from(raw: RawConstraintProfile) -> Result<Self, Self::Error> {
        let profile = ConstraintProfile {
            contract_type: raw.contract_type,
            jurisdiction: raw.jurisdiction,
            liability: raw.liability,
            data_protection: raw.data_protection,
            termination: raw.termination,
            forbidden_patterns: raw.forbidden_patterns,
            required_source_ids: raw.required_source_ids,
            max_clause_words: 1,
        };
        profile.with_max_clause_words(raw.max_clause_words)
    }
}

impl ConstraintProfile {
    /// Profile with default rules for the given contract type and jurisdiction.
    pub fn new(contract_type: ContractType, jurisdiction: Jurisdiction) -> Self {
        Self {
            contract_type,
            jurisdiction,
            liability: LiabilityRule::default(),
            data_protection: DataProtectionRule::default(),
            termination: TerminationRule::default(),
            forbidden_patterns: Vec::new(),
            required_source_ids: BTreeSet::new(),
            max_clause_words: default_max_clause_words(),
        }
    }

    pub fn with_liability(mut self, liability: LiabilityRule) -> Self {
        self.liability = liability;
        self
    }

    pub fn with_data_protection(mut self, data_protection: DataProtectionRule) -> Self {
        self.data_protection = data_protection;
        self
    }

    pub fn with_termination(mut self, termination: TerminationRule) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_forbidden_pattern(mut self, pattern: ForbiddenPattern) -> Self {
        self.forbidden_patterns.push(pattern);
        self
    }

    pub fn with_required_sources<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_source_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_max_clause_words(mut self, max_clause_words: usize) -> Result<Self, ProfileError> {
        if max_clause_words == 0 {
            return Err(ProfileError::ZeroClauseWords);
        }
        self.max_clause_words = max_clause_words;
        Ok(self)
    }

    pub fn contract_type(&self) -> ContractType {
        self.contract_type
    }

    pub fn jurisdiction(&self) -> Jurisdiction {
        self.jurisdiction
    }

    pub fn liability(&self) -> &LiabilityRule {
        &self.liability
    }

    pub fn data_protection(&self) -> &DataProtectionRule {
        &self.data_protection
    }

    pub fn termination(&self) -> &TerminationRule {
        &self.termination
    }

    /// Forbidden patterns in authored order.
    pub fn forbidden_patterns(&self) -> &[ForbiddenPattern] {
        &self.forbidden_patterns
    }

    pub fn required_source_ids(&self) -> &BTreeSet<String> {
        &self.required_source_ids
    }

    pub fn max_clause_words(&self) -> usize {
        self.max_clause_words
    }
}

/// Catalogue entry describing a named preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetSummary {
    pub name: &'static str,
    pub contract_type: ContractType,
    pub jurisdiction: Jurisdiction,
    pub forbidden_patterns: usize,
    pub required_citations: usize,
}

static PRESET_NAMES: [&str; 3] = ["dpa", "msa", "privacy"];

/// Names of the built-in presets, in catalogue order.
pub fn preset_names() -> &'static [&'static str] {
    &PRESET_NAMES
}

/// Build a named preset (case-insensitive).
pub fn preset(name: &str) -> Result<ConstraintProfile, ProfileError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "dpa" => dpa_preset(),
        "msa" => msa_preset(),
        "privacy" => privacy_preset(),
        _ => Err(ProfileError::UnknownPreset(name.to_string())),
    }
}

/// Summaries of every preset, in catalogue order.
pub fn preset_summaries() -> Result<Vec<PresetSummary>, ProfileError> {
    PRESET_NAMES
        .into_iter()
        .map(|name| {
            let profile = preset(name)?;
            Ok(PresetSummary {
                name,
                contract_type: profile.contract_type(),
                jurisdiction: profile.jurisdiction(),
                forbidden_patterns: profile.forbidden_patterns().len(),
                required_citations: profile.required_source_ids().len(),
            })
        })
        .collect()
}

fn dpa_preset() -> Result<ConstraintProfile, ProfileError> {
    Ok(
        ConstraintProfile::new(ContractType::DataProcessing, Jurisdiction::EuropeanUnion)
            .with_liability(LiabilityRule::fee_multiple(2.0))
            .with_data_protection(DataProtectionRule {
                max_breach_notice_hours: 36,
                ..DataProtectionRule::default()
            })
            .with_forbidden_pattern(ForbiddenPattern::new(
                r"(?i)unlimited\s+liability",
                "Unlimited liability is never acceptable in DPAs.",
                RiskLevel::Critical,
            )?)
            .with_forbidden_pattern(ForbiddenPattern::new(
                r"(?i)waive.*right.*to.*audit",
                "Audit rights cannot be waived under GDPR.",
                RiskLevel::Critical,
            )?)
            .with_forbidden_pattern(ForbiddenPattern::new(
                r"(?i)sell.*personal\s+data",
                "Selling personal data is prohibited.",
                RiskLevel::Critical,
            )?)
            .with_required_sources(["DPA-7.1", "DPA-6.2", "DPA-9.1"]),
    )
}

fn msa_preset() -> Result<ConstraintProfile, ProfileError> {
    Ok(
        ConstraintProfile::new(ContractType::MasterServices, Jurisdiction::Sweden)
            .with_liability(LiabilityRule::capped_amount(1_000_000.0))
            .with_termination(TerminationRule {
                min_notice_days: 60,
                ..TerminationRule::default()
            })
            .with_forbidden_pattern(ForbiddenPattern::new(
                r"(?i)non-?compete",
                "Non-compete clauses are not acceptable in this MSA.",
                RiskLevel::High,
            )?)
            .with_forbidden_pattern(ForbiddenPattern::new(
                r"(?i)automatic\s+renewal",
                "Auto-renewal without explicit consent is risky.",
                RiskLevel::Medium,
            )?),
    )
}

fn privacy_preset() -> Result<ConstraintProfile, ProfileError> {
    Ok(
        ConstraintProfile::new(ContractType::PrivacyPolicy, Jurisdiction::EuropeanUnion)
            .with_liability(LiabilityRule::unlimited())
            .with_data_protection(DataProtectionRule {
                max_retention_days: Some(365 * 7),
                ..DataProtectionRule::default()
            })
            .with_forbidden_pattern(ForbiddenPattern::new(
                r"(?i)sell.*your.*data",
                "Claiming to sell user data violates GDPR principles.",
                RiskLevel::Critical,
            )?)
            .with_required_sources(["Priv-4.1", "Priv-6.1"]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_liability_is_rejected() {
        let err = LiabilityRule::new(None, None, true, false).unwrap_err();
        assert!(matches!(err, ProfileError::UnconstrainedLiability));
        assert!(LiabilityRule::new(None, None, false, true).is_ok());
    }

    #[test]
    fn deserialize_enforces_liability_invariant() {
        let raw = r#"{"contract_type": "Master Services Agreement", "liability": {}}"#;
        let err = serde_json::from_str::<ConstraintProfile>(raw).unwrap_err();
        assert!(err.to_string().contains("unconstrained"), "{err}");
    }

    #[test]
    fn deserialize_applies_defaults() {
        let raw = r#"{"contract_type": "Non-Disclosure Agreement"}"#;
        let profile: ConstraintProfile = serde_json::from_str(raw).expect("parse");
        assert_eq!(
            profile,
            ConstraintProfile::new(ContractType::NonDisclosure, Jurisdiction::Sweden)
        );
        assert_eq!(profile.liability().cap_multiple_of_fees(), Some(2.0));
        assert_eq!(profile.max_clause_words(), 500);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = ForbiddenPattern::new("(unclosed", "r", RiskLevel::Low).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidPattern { .. }));
    }

    #[test]
    fn zero_clause_words_is_rejected() {
        let err = ConstraintProfile::new(ContractType::NonDisclosure, Jurisdiction::Sweden)
            .with_max_clause_words(0)
            .unwrap_err();
        assert!(matches!(err, ProfileError::ZeroClauseWords));
    }

    #[test]
    fn presets_are_case_insensitive_and_listed_in_order() {
        let dpa = preset("DPA").expect("dpa");
        assert_eq!(dpa.contract_type(), ContractType::DataProcessing);
        assert_eq!(dpa.data_protection().max_breach_notice_hours, 36);
        assert_eq!(dpa.forbidden_patterns().len(), 3);

        let names: Vec<_> = preset_summaries()
            .expect("summaries")
            .into_iter()
            .map(|summary| summary.name)
            .collect();
        assert_eq!(names, preset_names());
        assert!(matches!(
            preset("nda"),
            Err(ProfileError::UnknownPreset(name)) if name == "nda"
        ));
    }

    #[test]
    fn profile_serializes_patterns_as_source_text() {
        let profile = preset("msa").expect("msa");
        let value = serde_json::to_value(&profile).expect("serialize");
        assert_eq!(
            value["forbidden_patterns"][0]["pattern"],
            r"(?i)non-?compete"
        );
        let back: ConstraintProfile = serde_json::from_value(value).expect("parse");
        assert_eq!(back, profile);
    }
}
