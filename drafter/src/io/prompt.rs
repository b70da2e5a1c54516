//! Prompt rendering for generation attempts.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::profile::ConstraintProfile;
use crate::core::types::Violation;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const CORRECTION_TEMPLATE: &str = include_str!("prompts/correction.md");
const FORMAT_FAILURE_TEMPLATE: &str = include_str!("prompts/format_failure.md");

/// One violation line in the correction prompt.
#[derive(Debug, Clone, Serialize)]
struct ViolationLine<'a> {
    severity: String,
    field: &'a str,
    message: &'a str,
}

/// Template engine wrapper around minijinja.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .context("load system template")?;
        env.add_template("correction", CORRECTION_TEMPLATE)
            .context("load correction template")?;
        env.add_template("format_failure", FORMAT_FAILURE_TEMPLATE)
            .context("load format failure template")?;
        Ok(Self { env })
    }

    /// System prompt: drafting rules, output schema, the serialized profile and source context.
    pub fn render_system(&self, profile: &ConstraintProfile, source_context: &str) -> Result<String> {
        let profile_json =
            serde_json::to_string_pretty(profile).context("serialize constraint profile")?;
        let template = self.env.get_template("system")?;
        let rendered = template.render(context! {
            jurisdiction => profile.jurisdiction().as_str(),
            max_clause_words => profile.max_clause_words(),
            profile_json => profile_json,
            context => source_context,
        })?;
        Ok(rendered)
    }

    /// User prompt for the attempt after a rejected draft.
    ///
    /// Lists every violation and every non-empty suggestion.
    pub fn render_correction(&self, user_prompt: &str, violations: &[Violation]) -> Result<String> {
        let lines: Vec<ViolationLine<'_>> = violations
            .iter()
            .map(|violation| ViolationLine {
                severity: violation.severity.as_str().to_uppercase(),
                field: &violation.field,
                message: &violation.message,
            })
            .collect();
        let suggestions: Vec<&str> = violations
            .iter()
            .map(|violation| violation.suggestion.as_str())
            .filter(|suggestion| !suggestion.is_empty())
            .collect();
        let template = self.env.get_template("correction")?;
        let rendered = template.render(context! {
            user_prompt => user_prompt,
            violations => lines,
            suggestions => suggestions,
        })?;
        Ok(rendered)
    }

    /// User prompt for the attempt after a malformed response.
    pub fn render_format_failure(&self, user_prompt: &str, error: &str) -> Result<String> {
        let template = self.env.get_template("format_failure")?;
        let rendered = template.render(context! {
            user_prompt => user_prompt,
            error => error,
        })?;
        Ok(rendered)
    }
}
