//! Generation gateway abstraction for model invocation.
//!
//! The [`GenerationGateway`] trait decouples the agent loop from the actual
//! text-generation backend. [`CommandGateway`] spawns a configured command and
//! exchanges JSON over stdin/stdout; tests use scripted gateways that return
//! predetermined outputs without spawning processes.

use std::process::Command;

use anyhow::Context;
use jsonschema::{Draft, Validator};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::invariants::{normalize, validate_invariants};
use crate::core::types::StructuredOutput;
use crate::io::command::run_command_with_timeout;
use crate::io::settings::GatewaySettings;

const OUTPUT_SCHEMA: &str = include_str!("../../../schemas/structured_output.schema.json");

/// Longest stderr excerpt carried into a backend error.
const STDERR_EXCERPT_CHARS: usize = 500;

/// The response was not a usable structured output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationFormatError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("output does not match schema: {}", .0.join("; "))]
    SchemaMismatch(Vec<String>),
}

/// Any failed generation attempt. Both kinds are retried by the agent loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Format(#[from] GenerationFormatError),
    #[error("generation backend failed: {0}")]
    Backend(String),
}

/// Abstraction over text-generation backends.
pub trait GenerationGateway {
    /// Draft a structured output for the given prompts.
    fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StructuredOutput, GenerationError>;
}

impl<G: GenerationGateway + ?Sized> GenerationGateway for Box<G> {
    fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StructuredOutput, GenerationError> {
        (**self).generate(system_prompt, user_prompt)
    }
}

/// Parses raw model text into a checked [`StructuredOutput`].
///
/// Parsing runs JSON decoding, JSON Schema validation (Draft 2020-12), typed
/// deserialization and the semantic invariants in that order. Clause text is
/// returned trimmed.
pub struct OutputParser {
    validator: Validator,
}

impl OutputParser {
    pub fn new() -> anyhow::Result<Self> {
        let schema: Value =
            serde_json::from_str(OUTPUT_SCHEMA).context("parse output schema json")?;
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .context("compile output schema")?;
        Ok(Self { validator })
    }

    pub fn parse(&self, raw: &str) -> Result<StructuredOutput, GenerationFormatError> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|err| GenerationFormatError::InvalidJson(err.to_string()))?;

        let messages: Vec<String> = self
            .validator
            .iter_errors(&value)
            .map(|err| err.to_string())
            .collect();
        if !messages.is_empty() {
            return Err(GenerationFormatError::SchemaMismatch(messages));
        }

        let mut output: StructuredOutput = serde_json::from_value(value)
            .map_err(|err| GenerationFormatError::SchemaMismatch(vec![err.to_string()]))?;
        let errors = validate_invariants(&output);
        if !errors.is_empty() {
            return Err(GenerationFormatError::SchemaMismatch(errors));
        }
        normalize(&mut output);
        Ok(output)
    }
}

/// JSON request written to the gateway command's stdin.
#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    system_prompt: &'a str,
    user_prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
    response_format: &'static str,
}

/// Gateway that spawns the configured command once per attempt.
///
/// The command receives a [`GenerationRequest`] as JSON on stdin and must
/// print the model's JSON answer on stdout.
pub struct CommandGateway {
    settings: GatewaySettings,
    parser: OutputParser,
}

impl CommandGateway {
    pub fn new(settings: GatewaySettings) -> anyhow::Result<Self> {
        Ok(Self {
            settings,
            parser: OutputParser::new()?,
        })
    }
}

impl GenerationGateway for CommandGateway {
    #[instrument(skip_all, fields(timeout_secs = self.settings.timeout_secs))]
    fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StructuredOutput, GenerationError> {
        let Some((program, args)) = self.settings.command.split_first() else {
            return Err(GenerationError::Backend(
                "gateway.command is empty".to_string(),
            ));
        };
        info!(program = %program, "starting gateway command");

        let request = serde_json::to_vec(&GenerationRequest {
            system_prompt,
            user_prompt,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: "json_object",
        })
        .map_err(|err| GenerationError::Backend(format!("serialize request: {err}")))?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        let output = run_command_with_timeout(
            cmd,
            Some(request.as_slice()),
            self.settings.timeout(),
            self.settings.output_limit_bytes,
        )
        .map_err(|err| GenerationError::Backend(format!("run {program}: {err:#}")))?;

        if output.timed_out {
            warn!(
                timeout_secs = self.settings.timeout_secs,
                "gateway command timed out"
            );
            return Err(GenerationError::Backend(format!(
                "{program} timed out after {}s",
                self.settings.timeout_secs
            )));
        }
        if !output.status.success() {
            let stderr = output.stderr_excerpt(STDERR_EXCERPT_CHARS);
            warn!(exit_code = ?output.status.code(), stderr = %stderr, "gateway command failed");
            return Err(GenerationError::Backend(format!(
                "{program} failed with status {:?}: {stderr}",
                output.status.code()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let parsed = self.parser.parse(&raw)?;
        debug!(clauses = parsed.clauses.len(), "parsed gateway output");
        Ok(parsed)
    }
}
