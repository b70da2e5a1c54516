//! The draft/validate/correct loop.
//!
//! One [`DraftingAgent::run_with`] call retrieves source context, renders the
//! system prompt, then alternates generation and validation until a draft
//! passes or the retry budget is spent. Every step is recorded as an
//! [`AgentEvent`]; the finished trace is returned alongside the result so a
//! transport can replay it (see [`crate::stream`]).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::profile::ConstraintProfile;
use crate::core::retrieval::{ContextRetrievalError, render_context, select_chunks};
use crate::core::types::{StructuredOutput, ValidationResult, Violation};
use crate::core::validator::validate;
use crate::io::document_store::DocumentStore;
use crate::io::gateway::{GenerationError, GenerationGateway};
use crate::io::prompt::PromptEngine;
use crate::io::settings::{DrafterSettings, RetrievalSettings};

/// Externally visible loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Initializing,
    Retrieving,
    Drafting,
    Validating,
    ViolationFound,
    Correcting,
    Finalizing,
    Complete,
    Error,
}

impl AgentState {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentState::Initializing => "initializing",
            AgentState::Retrieving => "retrieving",
            AgentState::Drafting => "drafting",
            AgentState::Validating => "validating",
            AgentState::ViolationFound => "violation_found",
            AgentState::Correcting => "correcting",
            AgentState::Finalizing => "finalizing",
            AgentState::Complete => "complete",
            AgentState::Error => "error",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-state payload of an event. Each variant maps to exactly one [`AgentState`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    Initializing,
    RetrievalStarted,
    ContextRetrieved {
        context_length: usize,
    },
    DraftStarted {
        attempt: u32,
        max_attempts: u32,
    },
    DraftGenerated {
        clauses_count: usize,
        confidence: f64,
    },
    Validating {
        attempt: u32,
    },
    ViolationFound {
        violations: Vec<Violation>,
    },
    Correcting {
        next_attempt: u32,
    },
    Finalizing {
        attempt: u32,
    },
    Complete,
    Error,
    /// Closing event of a streamed successful run.
    Delivered {
        output: Box<StructuredOutput>,
        validation: ValidationResult,
        total_attempts: u32,
    },
    /// Closing event of a streamed failed run.
    Undelivered {
        validation: Option<ValidationResult>,
        total_attempts: u32,
    },
}

impl EventDetail {
    pub fn state(&self) -> AgentState {
        match self {
            EventDetail::Initializing => AgentState::Initializing,
            EventDetail::RetrievalStarted | EventDetail::ContextRetrieved { .. } => {
                AgentState::Retrieving
            }
            EventDetail::DraftStarted { .. } | EventDetail::DraftGenerated { .. } => {
                AgentState::Drafting
            }
            EventDetail::Validating { .. } => AgentState::Validating,
            EventDetail::ViolationFound { .. } => AgentState::ViolationFound,
            EventDetail::Correcting { .. } => AgentState::Correcting,
            EventDetail::Finalizing { .. } => AgentState::Finalizing,
            EventDetail::Complete | EventDetail::Delivered { .. } => AgentState::Complete,
            EventDetail::Error | EventDetail::Undelivered { .. } => AgentState::Error,
        }
    }

    /// Wire payload, `None` for states that carry nothing.
    pub fn data(&self) -> Option<Value> {
        match self {
            EventDetail::Initializing
            | EventDetail::RetrievalStarted
            | EventDetail::Complete
            | EventDetail::Error => None,
            EventDetail::ContextRetrieved { context_length } => {
                Some(json!({ "context_length": context_length }))
            }
            EventDetail::DraftStarted {
                attempt,
                max_attempts,
            } => Some(json!({ "attempt": attempt, "max_attempts": max_attempts })),
            EventDetail::DraftGenerated {
                clauses_count,
                confidence,
            } => Some(json!({ "clauses_count": clauses_count, "confidence": confidence })),
            EventDetail::Validating { attempt } | EventDetail::Finalizing { attempt } => {
                Some(json!({ "attempt": attempt }))
            }
            EventDetail::ViolationFound { violations } => {
                Some(json!({ "violations": violations }))
            }
            EventDetail::Correcting { next_attempt } => {
                Some(json!({ "next_attempt": next_attempt }))
            }
            EventDetail::Delivered {
                output,
                validation,
                total_attempts,
            } => Some(json!({
                "output": output,
                "validation": validation,
                "total_attempts": total_attempts,
            })),
            EventDetail::Undelivered {
                validation,
                total_attempts,
            } => Some(json!({
                "validation": validation,
                "total_attempts": total_attempts,
            })),
        }
    }
}

/// One entry of a run's append-only trace.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentEvent {
    pub message: String,
    pub detail: EventDetail,
    pub timestamp: DateTime<Utc>,
}

impl AgentEvent {
    pub fn new(message: impl Into<String>, detail: EventDetail) -> Self {
        Self {
            message: message.into(),
            detail,
            timestamp: Utc::now(),
        }
    }

    pub fn state(&self) -> AgentState {
        self.detail.state()
    }
}

/// Wire form: `{state, message, data, timestamp}`.
impl Serialize for AgentEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut event = serializer.serialize_struct("AgentEvent", 4)?;
        event.serialize_field("state", &self.state())?;
        event.serialize_field("message", &self.message)?;
        event.serialize_field("data", &self.detail.data())?;
        event.serialize_field(
            "timestamp",
            &self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        event.end()
    }
}

/// Why a run did not produce an accepted draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunFailure {
    #[error("failed to retrieve context: {0}")]
    ContextRetrieval(#[from] ContextRetrievalError),
    #[error("generation failed on attempt {attempt}: {error}")]
    Generation { attempt: u32, error: GenerationError },
    #[error("failed to build prompt: {0}")]
    Prompt(String),
    #[error("validation failed after {attempts} attempts")]
    RetryBudgetExhausted { attempts: u32 },
}

/// Outcome of one agent run.
///
/// On failure, `output` and `validation` hold the last snapshot that got far
/// enough to be produced, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResult {
    pub success: bool,
    pub total_attempts: u32,
    pub output: Option<StructuredOutput>,
    pub validation: Option<ValidationResult>,
    pub failure: Option<RunFailure>,
}

impl AgentResult {
    fn succeeded(attempt: u32, output: StructuredOutput, validation: ValidationResult) -> Self {
        Self {
            success: true,
            total_attempts: attempt,
            output: Some(output),
            validation: Some(validation),
            failure: None,
        }
    }

    fn failed(
        total_attempts: u32,
        output: Option<StructuredOutput>,
        validation: Option<ValidationResult>,
        failure: RunFailure,
    ) -> Self {
        Self {
            success: false,
            total_attempts,
            output,
            validation,
            failure: Some(failure),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

/// Wire form: `{success, total_attempts, output, validation, error}`.
impl Serialize for AgentResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut result = serializer.serialize_struct("AgentResult", 5)?;
        result.serialize_field("success", &self.success)?;
        result.serialize_field("total_attempts", &self.total_attempts)?;
        result.serialize_field("output", &self.output)?;
        result.serialize_field("validation", &self.validation)?;
        result.serialize_field("error", &self.error_message())?;
        result.end()
    }
}

/// A finished run: its result and the full event trace in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRun {
    pub result: AgentResult,
    pub events: Vec<AgentEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Retry budget: generation attempts per run (at least one is always made).
    pub max_retries: u32,
    pub retrieval: RetrievalSettings,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retrieval: RetrievalSettings::default(),
        }
    }
}

impl AgentConfig {
    pub fn from_settings(settings: &DrafterSettings) -> Self {
        Self {
            max_retries: settings.max_validation_retries,
            retrieval: settings.retrieval.clone(),
        }
    }
}

struct EventLog<F> {
    events: Vec<AgentEvent>,
    on_event: F,
}

impl<F: FnMut(&AgentEvent)> EventLog<F> {
    fn new(on_event: F) -> Self {
        Self {
            events: Vec::new(),
            on_event,
        }
    }

    fn emit(&mut self, message: impl Into<String>, detail: EventDetail) {
        let event = AgentEvent::new(message, detail);
        info!(state = %event.state(), "{}", event.message);
        (self.on_event)(&event);
        self.events.push(event);
    }

    fn prompt_failure(
        mut self,
        attempt: u32,
        output: Option<StructuredOutput>,
        validation: Option<ValidationResult>,
        err: &anyhow::Error,
    ) -> AgentRun {
        let failure = RunFailure::Prompt(format!("{err:#}"));
        self.emit(failure.to_string(), EventDetail::Error);
        self.finish(AgentResult::failed(attempt, output, validation, failure))
    }

    fn finish(self, result: AgentResult) -> AgentRun {
        AgentRun {
            result,
            events: self.events,
        }
    }
}

/// Drafts contract clauses against a constraint profile.
///
/// Holds no per-run state: concurrent runs may share one agent.
pub struct DraftingAgent<G> {
    store: Arc<DocumentStore>,
    gateway: G,
    config: AgentConfig,
    prompts: PromptEngine,
}

impl<G: GenerationGateway> DraftingAgent<G> {
    pub fn new(store: Arc<DocumentStore>, gateway: G, config: AgentConfig) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            gateway,
            config,
            prompts: PromptEngine::new()?,
        })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run the loop to completion and return the result with its trace.
    pub fn run_sync(&self, user_prompt: &str, profile: &ConstraintProfile) -> AgentRun {
        self.run_with(user_prompt, profile, |_| {})
    }

    /// Like [`Self::run_sync`], also handing each event to `on_event` as it is emitted.
    pub fn run_with<F>(&self, user_prompt: &str, profile: &ConstraintProfile, on_event: F) -> AgentRun
    where
        F: FnMut(&AgentEvent),
    {
        let mut log = EventLog::new(on_event);
        let max_attempts = self.config.max_retries.max(1);

        log.emit("Starting contract drafting agent", EventDetail::Initializing);
        log.emit(
            "Retrieving relevant source documents",
            EventDetail::RetrievalStarted,
        );
        let context = match self.retrieve_context(profile) {
            Ok(context) => context,
            Err(err) => {
                let failure = RunFailure::from(err);
                log.emit(failure.to_string(), EventDetail::Error);
                return log.finish(AgentResult::failed(0, None, None, failure));
            }
        };
        log.emit(
            format!("Retrieved context for {}", profile.contract_type()),
            EventDetail::ContextRetrieved {
                context_length: context.chars().count(),
            },
        );

        let system_prompt = match self.prompts.render_system(profile, &context) {
            Ok(prompt) => prompt,
            Err(err) => return log.prompt_failure(0, None, None, &err),
        };

        let mut current_prompt = user_prompt.to_string();
        let mut last_output: Option<StructuredOutput> = None;
        let mut last_validation: Option<ValidationResult> = None;

        for attempt in 1..=max_attempts {
            let final_attempt = attempt == max_attempts;
            log.emit(
                format!("Generating draft (attempt {attempt}/{max_attempts})"),
                EventDetail::DraftStarted {
                    attempt,
                    max_attempts,
                },
            );

            let output = match self.gateway.generate(&system_prompt, &current_prompt) {
                Ok(output) => output,
                Err(error) => {
                    warn!(attempt, error = %error, "generation attempt failed");
                    log.emit(format!("Generation failed: {error}"), EventDetail::Error);
                    if final_attempt {
                        return log.finish(AgentResult::failed(
                            attempt,
                            last_output,
                            last_validation,
                            RunFailure::Generation { attempt, error },
                        ));
                    }
                    match self
                        .prompts
                        .render_format_failure(user_prompt, &error.to_string())
                    {
                        Ok(prompt) => current_prompt = prompt,
                        Err(err) => {
                            return log.prompt_failure(attempt, last_output, last_validation, &err);
                        }
                    }
                    continue;
                }
            };
            log.emit(
                format!(
                    "Draft generated: {} clause(s), confidence {:.0}%",
                    output.clauses.len(),
                    output.confidence_score * 100.0
                ),
                EventDetail::DraftGenerated {
                    clauses_count: output.clauses.len(),
                    confidence: output.confidence_score,
                },
            );

            log.emit(
                "Running constraint validation",
                EventDetail::Validating { attempt },
            );
            let validation = validate(&output, profile).with_attempt(attempt);
            if validation.is_valid() {
                log.emit(
                    "All constraints satisfied",
                    EventDetail::Finalizing { attempt },
                );
                log.emit("Agent loop complete, output verified", EventDetail::Complete);
                return log.finish(AgentResult::succeeded(attempt, output, validation));
            }

            warn!(
                attempt,
                violations = validation.violations().len(),
                "draft failed validation"
            );
            log.emit(
                format!("{} violation(s) found", validation.violations().len()),
                EventDetail::ViolationFound {
                    violations: validation.violations().to_vec(),
                },
            );

            let correction = if final_attempt {
                log.emit(
                    format!("Max retries ({max_attempts}) exhausted, returning best effort"),
                    EventDetail::Error,
                );
                None
            } else {
                log.emit(
                    format!("Injecting corrections for retry {}", attempt + 1),
                    EventDetail::Correcting {
                        next_attempt: attempt + 1,
                    },
                );
                Some(
                    self.prompts
                        .render_correction(user_prompt, validation.violations()),
                )
            };
            last_output = Some(output);
            last_validation = Some(validation);

            match correction {
                Some(Ok(prompt)) => current_prompt = prompt,
                Some(Err(err)) => {
                    return log.prompt_failure(attempt, last_output, last_validation, &err);
                }
                None => {}
            }
        }

        log.finish(AgentResult::failed(
            max_attempts,
            last_output,
            last_validation,
            RunFailure::RetryBudgetExhausted {
                attempts: max_attempts,
            },
        ))
    }

    fn retrieve_context(&self, profile: &ConstraintProfile) -> Result<String, ContextRetrievalError> {
        let corpus = self
            .store
            .corpus()
            .map_err(|err| ContextRetrievalError::Store(err.to_string()))?;
        let document = self.config.retrieval.document_for(profile.contract_type());
        let selected = select_chunks(corpus.chunks(), document, self.config.retrieval.limits());
        if selected.is_empty() {
            return Err(ContextRetrievalError::Empty(profile.contract_type()));
        }
        debug!(
            document = document.unwrap_or("none"),
            chunks = selected.len(),
            "selected context chunks"
        );
        Ok(render_context(&selected))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::core::types::{ContractType, Jurisdiction};
    use crate::io::gateway::GenerationFormatError;
    use crate::test_support::{ScriptedGateway, clause, output_with, write_corpus};

    fn store_with_dpa(dir: &Path) -> Arc<DocumentStore> {
        write_corpus(
            dir,
            &[(
                "legora_dpa.md",
                "# Data Processing Agreement\n\n## Security\n\n[SourceID: DPA-7.1] Encrypt personal data at rest.\n",
            )],
        );
        Arc::new(DocumentStore::new(dir, 800))
    }

    fn build_agent(
        store: Arc<DocumentStore>,
        gateway: ScriptedGateway,
        max_retries: u32,
    ) -> DraftingAgent<ScriptedGateway> {
        let config = AgentConfig {
            max_retries,
            ..AgentConfig::default()
        };
        DraftingAgent::new(store, gateway, config).expect("agent")
    }

    fn profile() -> ConstraintProfile {
        ConstraintProfile::new(ContractType::DataProcessing, Jurisdiction::EuropeanUnion)
    }

    fn compliant() -> StructuredOutput {
        output_with(
            Jurisdiction::EuropeanUnion,
            vec![clause(
                "Security",
                "The processor complies with GDPR and gives breach notification within 72 hours.",
            )],
        )
    }

    fn wrong_jurisdiction() -> StructuredOutput {
        StructuredOutput {
            jurisdiction: Jurisdiction::UnitedKingdom,
            ..compliant()
        }
    }

    fn states(run: &AgentRun) -> Vec<AgentState> {
        run.events.iter().map(AgentEvent::state).collect()
    }

    fn format_error() -> GenerationError {
        GenerationError::Format(GenerationFormatError::InvalidJson(
            "expected value at line 1 column 1".to_string(),
        ))
    }

    #[test]
    fn compliant_first_draft_completes_in_one_attempt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = build_agent(store_with_dpa(temp.path()), ScriptedGateway::always(compliant()), 3);

        let run = agent.run_sync("Draft a security clause.", &profile());

        assert!(run.result.success);
        assert_eq!(run.result.total_attempts, 1);
        assert_eq!(run.result.output, Some(compliant()));
        assert_eq!(run.result.error_message(), None);
        assert_eq!(
            states(&run),
            vec![
                AgentState::Initializing,
                AgentState::Retrieving,
                AgentState::Retrieving,
                AgentState::Drafting,
                AgentState::Drafting,
                AgentState::Validating,
                AgentState::Finalizing,
                AgentState::Complete,
            ]
        );

        let calls = agent.gateway().calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("[Sources: DPA-7.1]\n## Security"));
        assert_eq!(calls[0].1, "Draft a security clause.");
    }

    #[test]
    fn persistent_violations_exhaust_the_budget() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = build_agent(
            store_with_dpa(temp.path()),
            ScriptedGateway::always(wrong_jurisdiction()),
            3,
        );

        let run = agent.run_sync("Draft a security clause.", &profile());

        assert!(!run.result.success);
        assert_eq!(run.result.total_attempts, 3);
        assert_eq!(agent.gateway().call_count(), 3);
        assert_eq!(
            run.result.failure,
            Some(RunFailure::RetryBudgetExhausted { attempts: 3 })
        );
        assert_eq!(
            run.result.error_message().as_deref(),
            Some("validation failed after 3 attempts")
        );
        let validation = run.result.validation.as_ref().expect("validation");
        assert_eq!(validation.attempt_number(), 3);
        assert_eq!(validation.violations()[0].field, "governing_jurisdiction");
        assert_eq!(run.result.output, Some(wrong_jurisdiction()));

        let states = states(&run);
        assert_eq!(
            states.iter().filter(|s| **s == AgentState::Validating).count(),
            3
        );
        assert_eq!(
            states.iter().filter(|s| **s == AgentState::Correcting).count(),
            2
        );
        assert_eq!(states.last(), Some(&AgentState::Error));
    }

    #[test]
    fn correction_prompt_restarts_from_the_user_prompt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = build_agent(
            store_with_dpa(temp.path()),
            ScriptedGateway::always(wrong_jurisdiction()),
            3,
        );

        agent.run_sync("Draft a security clause.", &profile());

        let calls = agent.gateway().calls();
        for (_, user_prompt) in &calls[1..] {
            assert!(user_prompt.starts_with("Draft a security clause.\n\nYOUR PREVIOUS ATTEMPT"));
            assert_eq!(user_prompt.matches("YOUR PREVIOUS ATTEMPT").count(), 1);
            assert!(user_prompt.contains("- Change the governing jurisdiction to 'European Union'."));
        }
    }

    #[test]
    fn format_failure_is_retried_with_a_note() {
        let temp = tempfile::tempdir().expect("tempdir");
        let gateway = ScriptedGateway::new(vec![Err(format_error()), Ok(compliant())]);
        let agent = build_agent(store_with_dpa(temp.path()), gateway, 3);

        let run = agent.run_sync("Draft a security clause.", &profile());

        assert!(run.result.success);
        assert_eq!(run.result.total_attempts, 2);
        let calls = agent.gateway().calls();
        assert_eq!(
            calls[1].1,
            "Draft a security clause.\n\nPREVIOUS ATTEMPT FAILED: invalid JSON: expected value at line 1 column 1\nPlease fix and try again."
        );
        assert_eq!(states(&run)[4], AgentState::Error);
    }

    #[test]
    fn gateway_failing_every_attempt_returns_no_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let gateway = ScriptedGateway::new(vec![Err(format_error())]);
        let agent = build_agent(store_with_dpa(temp.path()), gateway, 3);

        let run = agent.run_sync("Draft a security clause.", &profile());

        assert!(!run.result.success);
        assert_eq!(run.result.total_attempts, 3);
        assert_eq!(run.result.output, None);
        assert_eq!(run.result.validation, None);
        assert_eq!(
            run.result.failure,
            Some(RunFailure::Generation {
                attempt: 3,
                error: format_error()
            })
        );
    }

    #[test]
    fn final_gateway_failure_keeps_earlier_snapshot() {
        let temp = tempfile::tempdir().expect("tempdir");
        let gateway = ScriptedGateway::new(vec![
            Ok(wrong_jurisdiction()),
            Err(GenerationError::Backend("timed out".to_string())),
        ]);
        let agent = build_agent(store_with_dpa(temp.path()), gateway, 2);

        let run = agent.run_sync("Draft a security clause.", &profile());

        assert!(!run.result.success);
        assert_eq!(run.result.total_attempts, 2);
        assert_eq!(run.result.output, Some(wrong_jurisdiction()));
        assert_eq!(
            run.result.validation.as_ref().map(ValidationResult::attempt_number),
            Some(1)
        );
        assert!(matches!(
            run.result.failure,
            Some(RunFailure::Generation { attempt: 2, .. })
        ));
    }

    #[test]
    fn missing_corpus_fails_without_attempts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(DocumentStore::new(temp.path().join("absent"), 800));
        let agent = build_agent(store, ScriptedGateway::always(compliant()), 3);

        let run = agent.run_sync("Draft a security clause.", &profile());

        assert!(!run.result.success);
        assert_eq!(run.result.total_attempts, 0);
        assert_eq!(agent.gateway().call_count(), 0);
        assert!(matches!(
            run.result.failure,
            Some(RunFailure::ContextRetrieval(ContextRetrievalError::Store(_)))
        ));
        assert_eq!(
            states(&run),
            vec![AgentState::Initializing, AgentState::Retrieving, AgentState::Error]
        );
    }

    #[test]
    fn unmapped_contract_type_falls_back_to_corpus_head() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut config = AgentConfig::default();
        config.retrieval.documents.clear();
        let agent = DraftingAgent::new(
            store_with_dpa(temp.path()),
            ScriptedGateway::always(compliant()),
            config,
        )
        .expect("agent");

        let run = agent.run_sync("Draft a security clause.", &profile());

        assert!(run.result.success);
        assert!(agent.gateway().calls()[0].0.contains("Encrypt personal data at rest."));
    }

    #[test]
    fn callback_sees_events_in_emission_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let agent = build_agent(
            store_with_dpa(temp.path()),
            ScriptedGateway::new(vec![Ok(wrong_jurisdiction()), Ok(compliant())]),
            3,
        );
        let mut seen = Vec::new();

        let run = agent.run_with("Draft a security clause.", &profile(), |event| {
            seen.push(event.clone());
        });

        assert_eq!(seen, run.events);
        assert!(run.result.success);
        assert_eq!(run.result.total_attempts, 2);
    }

    #[test]
    fn event_wire_form_has_state_message_data_timestamp() {
        let event = AgentEvent::new(
            "Generating draft (attempt 1/3)",
            EventDetail::DraftStarted {
                attempt: 1,
                max_attempts: 3,
            },
        );
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["state"], "drafting");
        assert_eq!(value["message"], "Generating draft (attempt 1/3)");
        assert_eq!(value["data"]["attempt"], 1);
        assert!(value["timestamp"].as_str().expect("timestamp").ends_with('Z'));

        let value = serde_json::to_value(AgentEvent::new("done", EventDetail::Complete))
            .expect("serialize");
        assert!(value["data"].is_null());
    }

    #[test]
    fn result_wire_form_reports_error_message() {
        let result = AgentResult::failed(
            3,
            None,
            None,
            RunFailure::RetryBudgetExhausted { attempts: 3 },
        );
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["success"], false);
        assert_eq!(value["total_attempts"], 3);
        assert!(value["output"].is_null());
        assert_eq!(value["error"], "validation failed after 3 attempts");
    }
}
