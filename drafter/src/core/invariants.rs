//! Semantic invariants of structured output not expressible via JSON Schema.

use crate::core::types::StructuredOutput;

/// Check invariants JSON Schema cannot express: clause text is non-empty
/// once surrounding whitespace is removed. Titles may be blank.
pub fn validate_invariants(output: &StructuredOutput) -> Vec<String> {
    let mut errors = Vec::new();
    for (idx, clause) in output.clauses.iter().enumerate() {
        if clause.text.trim().is_empty() {
            errors.push(format!("clauses[{idx}]: clause text cannot be empty"));
        }
    }
    errors
}

/// Trim clause bodies in place so downstream checks see normalized text.
pub fn normalize(output: &mut StructuredOutput) {
    for clause in &mut output.clauses {
        clause.text = clause.text.trim().to_string();
    }
}
