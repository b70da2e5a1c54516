//! Test-only helpers: output builders, corpus writers and a scripted gateway.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::core::types::{
    ClauseCitation, GeneratedClause, Jurisdiction, RiskLevel, StructuredOutput,
};
use crate::io::gateway::{GenerationError, GenerationGateway};

/// Create a clause with no citations and low risk.
pub fn clause(title: &str, text: &str) -> GeneratedClause {
    GeneratedClause {
        title: title.to_string(),
        text: text.to_string(),
        citations: Vec::new(),
        risk_level: RiskLevel::Low,
        reasoning: String::new(),
    }
}

/// Create a clause citing each of `source_ids`.
pub fn cited_clause(title: &str, text: &str, source_ids: &[&str]) -> GeneratedClause {
    GeneratedClause {
        citations: source_ids
            .iter()
            .map(|id| ClauseCitation {
                source_id: (*id).to_string(),
                relevance: format!("supports {title}"),
            })
            .collect(),
        ..clause(title, text)
    }
}

/// Wrap clauses in an output with a fixed summary and confidence.
pub fn output_with(jurisdiction: Jurisdiction, clauses: Vec<GeneratedClause>) -> StructuredOutput {
    StructuredOutput {
        clauses,
        summary: "Drafted clauses".to_string(),
        jurisdiction,
        confidence_score: 0.9,
    }
}

/// Serialize an output the way a model would return it.
pub fn output_json(output: &StructuredOutput) -> String {
    serde_json::to_string(output).expect("serialize structured output")
}

/// Write `(file name, content)` pairs into `dir`.
pub fn write_corpus(dir: &Path, documents: &[(&str, &str)]) {
    fs::create_dir_all(dir).expect("create corpus dir");
    for (name, content) in documents {
        fs::write(dir.join(name), content).expect("write corpus document");
    }
}

/// Gateway that replays queued replies and records every prompt it receives.
///
/// Once the queue is down to its last reply, that reply is repeated for every
/// further call.
#[derive(Debug)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<StructuredOutput, GenerationError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<StructuredOutput, GenerationError>>) -> Self {
        assert!(!replies.is_empty(), "scripted gateway needs at least one reply");
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Gateway that always returns `output`.
    pub fn always(output: StructuredOutput) -> Self {
        Self::new(vec![Ok(output)])
    }

    /// Recorded `(system_prompt, user_prompt)` pairs, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl GenerationGateway for ScriptedGateway {
    fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StructuredOutput, GenerationError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((system_prompt.to_string(), user_prompt.to_string()));
        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        if replies.len() > 1 {
            replies.pop_front().expect("reply queue is non-empty")
        } else {
            replies.front().cloned().expect("reply queue is non-empty")
        }
    }
}
