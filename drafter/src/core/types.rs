//! Shared deterministic types for drafting core logic.
//!
//! These types define the contract between the generation gateway, the
//! validation engine and the agent loop. They carry no I/O and serialize to
//! the same JSON shape the model is asked to produce.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a slug or display name does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Supported governing-law jurisdictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    #[serde(rename = "Sweden")]
    Sweden,
    #[serde(rename = "European Union")]
    EuropeanUnion,
    #[serde(rename = "United Kingdom")]
    UnitedKingdom,
    #[serde(rename = "California, USA")]
    California,
    #[serde(rename = "Delaware, USA")]
    Delaware,
    #[serde(rename = "New York, USA")]
    NewYork,
}

impl Jurisdiction {
    pub const ALL: [Jurisdiction; 6] = [
        Jurisdiction::Sweden,
        Jurisdiction::EuropeanUnion,
        Jurisdiction::UnitedKingdom,
        Jurisdiction::California,
        Jurisdiction::Delaware,
        Jurisdiction::NewYork,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Jurisdiction::Sweden => "Sweden",
            Jurisdiction::EuropeanUnion => "European Union",
            Jurisdiction::UnitedKingdom => "United Kingdom",
            Jurisdiction::California => "California, USA",
            Jurisdiction::Delaware => "Delaware, USA",
            Jurisdiction::NewYork => "New York, USA",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Jurisdiction::Sweden => "sweden",
            Jurisdiction::EuropeanUnion => "eu",
            Jurisdiction::UnitedKingdom => "uk",
            Jurisdiction::California => "california",
            Jurisdiction::Delaware => "delaware",
            Jurisdiction::NewYork => "new-york",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Jurisdiction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Jurisdiction::ALL
            .into_iter()
            .find(|j| {
                j.slug().eq_ignore_ascii_case(needle) || j.as_str().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownVariant {
                kind: "jurisdiction",
                value: s.to_string(),
            })
    }
}

/// Contract families the drafting agent knows how to ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "Non-Disclosure Agreement")]
    NonDisclosure,
    #[serde(rename = "Master Services Agreement")]
    MasterServices,
    #[serde(rename = "Data Processing Agreement")]
    DataProcessing,
    #[serde(rename = "Privacy Policy")]
    PrivacyPolicy,
    #[serde(rename = "Service Level Agreement")]
    ServiceLevel,
}

impl ContractType {
    pub const ALL: [ContractType; 5] = [
        ContractType::NonDisclosure,
        ContractType::MasterServices,
        ContractType::DataProcessing,
        ContractType::PrivacyPolicy,
        ContractType::ServiceLevel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContractType::NonDisclosure => "Non-Disclosure Agreement",
            ContractType::MasterServices => "Master Services Agreement",
            ContractType::DataProcessing => "Data Processing Agreement",
            ContractType::PrivacyPolicy => "Privacy Policy",
            ContractType::ServiceLevel => "Service Level Agreement",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            ContractType::NonDisclosure => "nda",
            ContractType::MasterServices => "msa",
            ContractType::DataProcessing => "dpa",
            ContractType::PrivacyPolicy => "privacy",
            ContractType::ServiceLevel => "sla",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ContractType::ALL
            .into_iter()
            .find(|c| {
                c.slug().eq_ignore_ascii_case(needle) || c.as_str().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownVariant {
                kind: "contract type",
                value: s.to_string(),
            })
    }
}

/// Risk classification shared by generated clauses and violations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A citation reference inside a generated clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseCitation {
    pub source_id: String,
    pub relevance: String,
}

/// A single clause drafted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedClause {
    pub title: String,
    /// Clause body. Always non-empty and trimmed once it has passed the output parser.
    pub text: String,
    #[serde(default)]
    pub citations: Vec<ClauseCitation>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub reasoning: String,
}

/// Complete structured output the generation gateway must return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredOutput {
    pub clauses: Vec<GeneratedClause>,
    pub summary: String,
    #[serde(rename = "governing_jurisdiction")]
    pub jurisdiction: Jurisdiction,
    pub confidence_score: f64,
}

impl StructuredOutput {
    /// Concatenation of every clause body, used for full-text rule checks.
    pub fn full_text(&self) -> String {
        self.clauses
            .iter()
            .map(|clause| clause.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One failed rule check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted name of the rule that failed (e.g. `data_protection.gdpr`).
    pub field: String,
    pub message: String,
    pub severity: RiskLevel,
    #[serde(default)]
    pub suggestion: String,
}

impl Violation {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        severity: RiskLevel,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity,
            suggestion: suggestion.into(),
        }
    }
}

/// Outcome of validating one output against one profile.
///
/// `is_valid` is derived from the violation list at construction and cannot
/// drift from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    is_valid: bool,
    violations: Vec<Violation>,
    attempt_number: u32,
}

impl ValidationResult {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self {
            is_valid: violations.is_empty(),
            violations,
            attempt_number: 1,
        }
    }

    /// Stamp the 1-based attempt that produced this result.
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt_number = attempt;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// Human-readable multi-line summary, used for logs.
    pub fn summary(&self) -> String {
        if self.is_valid {
            return "No violations found.".to_string();
        }
        let mut lines = vec![format!("Found {} violation(s):", self.violations.len())];
        for violation in &self.violations {
            lines.push(format!(
                "  [{}] {}: {}",
                violation.severity.as_str().to_uppercase(),
                violation.field,
                violation.message
            ));
        }
        lines.join("\n")
    }
}
