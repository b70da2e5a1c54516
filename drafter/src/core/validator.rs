//! Rule validation of structured drafts against a constraint profile.
//!
//! [`validate`] is a pure function: the same output and profile always produce
//! the same ordered violation list. Checks run in a fixed order so the most
//! structural problems are reported first:
//!
//! 1. jurisdiction
//! 2. forbidden patterns
//! 3. required citations
//! 4. liability
//! 5. data protection
//! 6. clause length

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::profile::ConstraintProfile;
use crate::core::types::{RiskLevel, StructuredOutput, ValidationResult, Violation};

static UNLIMITED_LIABILITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"unlimited\s+liability").unwrap());

static CONSEQUENTIAL_DAMAGES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"consequential\s+damages?\b").unwrap());

/// Run every check and collect violations in check order.
///
/// The returned result carries attempt number 1; the agent loop restamps it.
pub fn validate(output: &StructuredOutput, profile: &ConstraintProfile) -> ValidationResult {
    let full_text = output.full_text();
    let lowered = full_text.to_lowercase();

    let mut violations = Vec::new();
    check_jurisdiction(output, profile, &mut violations);
    check_forbidden_patterns(&full_text, profile, &mut violations);
    check_required_citations(output, profile, &mut violations);
    check_liability(&lowered, profile, &mut violations);
    check_data_protection(&lowered, profile, &mut violations);
    check_clause_length(output, profile, &mut violations);
    ValidationResult::new(violations)
}

fn check_jurisdiction(
    output: &StructuredOutput,
    profile: &ConstraintProfile,
    violations: &mut Vec<Violation>,
) {
    let expected = profile.jurisdiction();
    if output.jurisdiction != expected {
        violations.push(Violation::new(
            "governing_jurisdiction",
            format!(
                "Expected jurisdiction '{expected}' but got '{}'.",
                output.jurisdiction
            ),
            RiskLevel::High,
            format!("Change the governing jurisdiction to '{expected}'."),
        ));
    }
}

/// One violation per matching pattern, not per occurrence.
fn check_forbidden_patterns(
    full_text: &str,
    profile: &ConstraintProfile,
    violations: &mut Vec<Violation>,
) {
    for forbidden in profile.forbidden_patterns() {
        if forbidden.is_match(full_text) {
            violations.push(Violation::new(
                "forbidden_clause",
                format!(
                    "Forbidden pattern detected: '{}'. Reason: {}",
                    forbidden.pattern(),
                    forbidden.reason()
                ),
                forbidden.severity(),
                format!(
                    "Remove or rephrase any language matching: {}",
                    forbidden.pattern()
                ),
            ));
        }
    }
}

fn check_required_citations(
    output: &StructuredOutput,
    profile: &ConstraintProfile,
    violations: &mut Vec<Violation>,
) {
    if profile.required_source_ids().is_empty() {
        return;
    }
    let cited: BTreeSet<&str> = output
        .clauses
        .iter()
        .flat_map(|clause| clause.citations.iter())
        .map(|citation| citation.source_id.as_str())
        .collect();

    for required in profile.required_source_ids() {
        if !cited.contains(required.as_str()) {
            violations.push(Violation::new(
                "required_citations",
                format!("Required citation '{required}' is missing from the output."),
                RiskLevel::Medium,
                format!("Include a citation to [SourceID: {required}] in your response."),
            ));
        }
    }
}

fn check_liability(lowered: &str, profile: &ConstraintProfile, violations: &mut Vec<Violation>) {
    let liability = profile.liability();
    if !liability.allows_unlimited() && UNLIMITED_LIABILITY_RE.is_match(lowered) {
        violations.push(Violation::new(
            "liability.unlimited",
            "Output contains 'unlimited liability' but this is not permitted.",
            RiskLevel::Critical,
            "Replace unlimited liability with a capped liability clause.",
        ));
    }
    if !liability.allows_consequential_damages() && CONSEQUENTIAL_DAMAGES_RE.is_match(lowered) {
        violations.push(Violation::new(
            "liability.consequential_damages",
            "Output mentions 'consequential damages' but these are excluded by the constraint profile.",
            RiskLevel::High,
            "Add exclusion language for consequential and indirect damages.",
        ));
    }
}

fn check_data_protection(
    lowered: &str,
    profile: &ConstraintProfile,
    violations: &mut Vec<Violation>,
) {
    let rule = profile.data_protection();
    if rule.requires_gdpr && !lowered.contains("gdpr") && !lowered.contains("general data protection")
    {
        violations.push(Violation::new(
            "data_protection.gdpr",
            "GDPR compliance is required but no GDPR reference found in output.",
            RiskLevel::High,
            "Include explicit reference to GDPR compliance.",
        ));
    }
    if rule.requires_breach_notice && !lowered.contains("breach") && !lowered.contains("notification")
    {
        violations.push(Violation::new(
            "data_protection.breach_notification",
            "Breach notification clause is required but not found.",
            RiskLevel::High,
            format!(
                "Include a breach notification clause with a {}-hour notification window.",
                rule.max_breach_notice_hours
            ),
        ));
    }
}

fn check_clause_length(
    output: &StructuredOutput,
    profile: &ConstraintProfile,
    violations: &mut Vec<Violation>,
) {
    let limit = profile.max_clause_words();
    for clause in &output.clauses {
        let words = clause.text.split_whitespace().count();
        if words > limit {
            violations.push(Violation::new(
                format!("clause_length.{}", clause.title),
                format!(
                    "Clause '{}' has {words} words, exceeding the limit of {limit}.",
                    clause.title
                ),
                RiskLevel::Low,
                format!("Shorten this clause to under {limit} words."),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profile::{DataProtectionRule, ForbiddenPattern, LiabilityRule, preset};
    use crate::core::types::{ContractType, Jurisdiction};
    use crate::test_support::{clause, cited_clause, output_with};

    fn lenient_profile() -> ConstraintProfile {
        ConstraintProfile::new(ContractType::MasterServices, Jurisdiction::Sweden)
            .with_data_protection(DataProtectionRule {
                requires_gdpr: false,
                requires_breach_notice: false,
                ..DataProtectionRule::default()
            })
    }

    fn fields(result: &ValidationResult) -> Vec<&str> {
        result
            .violations()
            .iter()
            .map(|violation| violation.field.as_str())
            .collect()
    }

    #[test]
    fn clean_output_passes() {
        let output = output_with(Jurisdiction::Sweden, vec![clause("Scope", "Plain terms.")]);
        let result = validate(&output, &lenient_profile());
        assert!(result.is_valid());
        assert!(result.violations().is_empty());
    }

    #[test]
    fn missing_gdpr_reference_yields_single_high_violation() {
        let profile = ConstraintProfile::new(ContractType::DataProcessing, Jurisdiction::Sweden);
        let output = output_with(
            Jurisdiction::Sweden,
            vec![clause("Security", "Processor shall notify of any breach promptly.")],
        );
        let result = validate(&output, &profile);
        assert_eq!(fields(&result), vec!["data_protection.gdpr"]);
        assert_eq!(result.violations()[0].severity, RiskLevel::High);
    }

    #[test]
    fn unlimited_liability_is_critical_regardless_of_case() {
        let output = output_with(
            Jurisdiction::Sweden,
            vec![clause("Liability", "Supplier accepts Unlimited Liability.")],
        );
        let result = validate(&output, &lenient_profile());
        assert_eq!(fields(&result), vec!["liability.unlimited"]);
        assert_eq!(result.violations()[0].severity, RiskLevel::Critical);

        let permissive = lenient_profile().with_liability(LiabilityRule::unlimited());
        assert!(validate(&output, &permissive).is_valid());
    }

    #[test]
    fn consequential_damages_flagged_unless_allowed() {
        let output = output_with(
            Jurisdiction::Sweden,
            vec![clause("Exclusions", "Each party is liable for consequential damage.")],
        );
        assert_eq!(
            fields(&validate(&output, &lenient_profile())),
            vec!["liability.consequential_damages"]
        );
        let permissive = lenient_profile()
            .with_liability(LiabilityRule::fee_multiple(1.0).allowing_consequential_damages());
        assert!(validate(&output, &permissive).is_valid());
    }

    #[test]
    fn violations_follow_check_order() {
        let profile = lenient_profile()
            .with_forbidden_pattern(
                ForbiddenPattern::new(r"(?i)non-?compete", "no", RiskLevel::High).expect("pattern"),
            )
            .with_required_sources(["MSA-1"])
            .with_max_clause_words(3)
            .expect("words");
        let output = output_with(
            Jurisdiction::UnitedKingdom,
            vec![clause(
                "Restraint",
                "A Non-Compete applies with unlimited liability forever.",
            )],
        );

        let result = validate(&output, &profile);
        assert_eq!(
            fields(&result),
            vec![
                "governing_jurisdiction",
                "forbidden_clause",
                "required_citations",
                "liability.unlimited",
                "clause_length.Restraint",
            ]
        );
        assert_eq!(
            result.violations()[0].message,
            "Expected jurisdiction 'Sweden' but got 'United Kingdom'."
        );
        assert!(!result.is_valid());
    }

    #[test]
    fn forbidden_pattern_reports_once_per_pattern() {
        let profile = lenient_profile().with_forbidden_pattern(
            ForbiddenPattern::new(r"(?i)automatic\s+renewal", "risky", RiskLevel::Medium)
                .expect("pattern"),
        );
        let output = output_with(
            Jurisdiction::Sweden,
            vec![
                clause("Term", "Automatic renewal applies."),
                clause("Renewal", "Another automatic  renewal."),
            ],
        );
        let result = validate(&output, &profile);
        assert_eq!(fields(&result), vec!["forbidden_clause"]);
        assert_eq!(result.violations()[0].severity, RiskLevel::Medium);
    }

    #[test]
    fn required_citations_report_each_missing_id() {
        let profile = preset("dpa").expect("dpa");
        let output = output_with(
            Jurisdiction::EuropeanUnion,
            vec![cited_clause(
                "Processing",
                "Processing follows GDPR with breach notification.",
                &["DPA-6.2"],
            )],
        );
        let result = validate(&output, &profile);
        let missing: Vec<_> = result
            .violations()
            .iter()
            .map(|violation| violation.message.as_str())
            .collect();
        assert_eq!(
            missing,
            vec![
                "Required citation 'DPA-7.1' is missing from the output.",
                "Required citation 'DPA-9.1' is missing from the output.",
            ]
        );
    }

    #[test]
    fn breach_suggestion_embeds_configured_hours() {
        let profile = preset("dpa").expect("dpa");
        let output = output_with(
            Jurisdiction::EuropeanUnion,
            vec![cited_clause(
                "Processing",
                "Processing follows GDPR.",
                &["DPA-7.1", "DPA-6.2", "DPA-9.1"],
            )],
        );
        let result = validate(&output, &profile);
        assert_eq!(fields(&result), vec!["data_protection.breach_notification"]);
        assert!(result.violations()[0].suggestion.contains("36-hour"));
    }

    #[test]
    fn validation_is_deterministic() {
        let profile = preset("msa").expect("msa");
        let output = output_with(
            Jurisdiction::EuropeanUnion,
            vec![clause("Term", "Automatic renewal with consequential damages.")],
        );
        assert_eq!(validate(&output, &profile), validate(&output, &profile));
    }
}
