//! Drafter settings stored in `drafter.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::retrieval::RetrievalLimits;
use crate::core::types::ContractType;

/// Default settings file name, resolved against the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "drafter.toml";

pub const ENV_MAX_VALIDATION_RETRIES: &str = "DRAFTER_MAX_VALIDATION_RETRIES";
pub const ENV_SOURCE_DOCUMENTS_DIR: &str = "DRAFTER_SOURCE_DOCUMENTS_DIR";
pub const ENV_API_KEY: &str = "DRAFTER_API_KEY";

/// Drafter configuration (TOML).
///
/// Missing fields default to values that work against the bundled corpus
/// layout. The file is optional; environment overrides apply on top of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DrafterSettings {
    /// Retry budget: maximum generation attempts per run.
    pub max_validation_retries: u32,

    /// Directory holding the source documents.
    pub source_documents_dir: PathBuf,

    /// Section size threshold for chunking, in characters.
    pub chunk_size_chars: usize,

    pub retrieval: RetrievalSettings,
    pub gateway: GatewaySettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub max_context_chunks: usize,
    pub fallback_chunks: usize,
    /// Contract type (slug or display name) to source document name.
    pub documents: BTreeMap<String, String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        let limits = RetrievalLimits::default();
        let documents = [
            ("dpa", "legora_dpa"),
            ("privacy", "legora_privacy"),
            ("msa", "zegal_msa"),
            ("nda", "legora_dpa"),
            ("sla", "zegal_msa"),
        ]
        .into_iter()
        .map(|(contract, document)| (contract.to_string(), document.to_string()))
        .collect();
        Self {
            max_context_chunks: limits.max_context_chunks,
            fallback_chunks: limits.fallback_chunks,
            documents,
        }
    }
}

impl RetrievalSettings {
    pub fn limits(&self) -> RetrievalLimits {
        RetrievalLimits {
            max_context_chunks: self.max_context_chunks,
            fallback_chunks: self.fallback_chunks,
        }
    }

    /// Source document configured for `contract_type`, if any.
    pub fn document_for(&self, contract_type: ContractType) -> Option<&str> {
        self.documents
            .iter()
            .find(|(key, _)| key.parse::<ContractType>().ok() == Some(contract_type))
            .map(|(_, document)| document.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewaySettings {
    /// Command that reads a JSON generation request on stdin and prints the
    /// model's JSON answer on stdout (e.g. `["drafter-llm", "--model", "gpt-4o-mini"]`).
    pub command: Vec<String>,

    /// Per-attempt wall-clock budget in seconds.
    pub timeout_secs: u64,

    /// Truncate gateway stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            command: vec!["drafter-llm".to_string()],
            timeout_secs: 120,
            output_limit_bytes: 1_000_000,
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

impl GatewaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    /// Shared secret expected in `X-API-Key`. Empty or absent disables the check.
    pub api_key: Option<String>,
}

impl ServerSettings {
    /// The configured key, treating an empty string as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

impl Default for DrafterSettings {
    fn default() -> Self {
        Self {
            max_validation_retries: 3,
            source_documents_dir: PathBuf::from("data/source_documents"),
            chunk_size_chars: 800,
            retrieval: RetrievalSettings::default(),
            gateway: GatewaySettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl DrafterSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_validation_retries == 0 {
            return Err(anyhow!("max_validation_retries must be >= 1"));
        }
        if self.chunk_size_chars == 0 {
            return Err(anyhow!("chunk_size_chars must be > 0"));
        }
        if self.retrieval.max_context_chunks == 0 {
            return Err(anyhow!("retrieval.max_context_chunks must be > 0"));
        }
        if self.retrieval.fallback_chunks == 0 {
            return Err(anyhow!("retrieval.fallback_chunks must be > 0"));
        }
        for key in self.retrieval.documents.keys() {
            key.parse::<ContractType>()
                .with_context(|| format!("retrieval.documents key '{key}'"))?;
        }
        if self.gateway.command.is_empty() || self.gateway.command[0].trim().is_empty() {
            return Err(anyhow!("gateway.command must be a non-empty array"));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(anyhow!("gateway.timeout_secs must be > 0"));
        }
        if self.gateway.output_limit_bytes == 0 {
            return Err(anyhow!("gateway.output_limit_bytes must be > 0"));
        }
        if self.gateway.max_tokens == 0 {
            return Err(anyhow!("gateway.max_tokens must be > 0"));
        }
        Ok(())
    }

    /// Apply `DRAFTER_*` overrides read through `lookup`.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_VALIDATION_RETRIES) {
            self.max_validation_retries = raw
                .trim()
                .parse()
                .with_context(|| format!("parse {ENV_MAX_VALIDATION_RETRIES}='{raw}'"))?;
        }
        if let Some(dir) = lookup(ENV_SOURCE_DOCUMENTS_DIR) {
            self.source_documents_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.server.api_key = Some(key);
        }
        Ok(self)
    }
}

/// Load settings from a TOML file, then apply process environment overrides.
///
/// If the file is missing, defaults are used.
pub fn load_settings(path: &Path) -> Result<DrafterSettings> {
    load_settings_with_env(path, |name| std::env::var(name).ok())
}

/// Like [`load_settings`], reading overrides through `lookup`.
pub fn load_settings_with_env<F>(path: &Path, lookup: F) -> Result<DrafterSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let settings = if path.exists() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    } else {
        debug!(path = %path.display(), "settings file missing, using defaults");
        DrafterSettings::default()
    };
    let settings = settings.with_env_overrides(lookup)?;
    settings.validate()?;
    Ok(settings)
}

/// Atomically write settings to disk (temp file + rename).
pub fn write_settings(path: &Path, settings: &DrafterSettings) -> Result<()> {
    settings.validate()?;
    let mut buf = toml::to_string_pretty(settings).context("serialize settings toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("settings path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp settings {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace settings {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let settings =
            load_settings_with_env(&temp.path().join("missing.toml"), no_env).expect("load");
        assert_eq!(settings, DrafterSettings::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("drafter.toml");
        let settings = DrafterSettings {
            max_validation_retries: 5,
            server: ServerSettings {
                api_key: Some("secret".to_string()),
            },
            ..DrafterSettings::default()
        };
        write_settings(&path, &settings).expect("write");
        let loaded = load_settings_with_env(&path, no_env).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("drafter.toml");
        fs::write(&path, "chunk_size_chars = 400\n[gateway]\ntimeout_secs = 5\n").expect("write");
        let loaded = load_settings_with_env(&path, no_env).expect("load");
        assert_eq!(loaded.chunk_size_chars, 400);
        assert_eq!(loaded.gateway.timeout_secs, 5);
        assert_eq!(loaded.gateway.command, GatewaySettings::default().command);
        assert_eq!(loaded.max_validation_retries, 3);
    }

    #[test]
    fn env_overrides_apply_after_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let lookup = |name: &str| match name {
            ENV_MAX_VALIDATION_RETRIES => Some("7".to_string()),
            ENV_SOURCE_DOCUMENTS_DIR => Some("/srv/docs".to_string()),
            _ => None,
        };
        let loaded = load_settings_with_env(&temp.path().join("none.toml"), lookup).expect("load");
        assert_eq!(loaded.max_validation_retries, 7);
        assert_eq!(loaded.source_documents_dir, PathBuf::from("/srv/docs"));
        assert_eq!(loaded.server.api_key(), None);
    }

    #[test]
    fn zero_retry_budget_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let lookup = |name: &str| (name == ENV_MAX_VALIDATION_RETRIES).then(|| "0".to_string());
        let err = load_settings_with_env(&temp.path().join("none.toml"), lookup).unwrap_err();
        assert!(err.to_string().contains("max_validation_retries"));
    }

    #[test]
    fn unknown_contract_key_is_rejected() {
        let mut settings = DrafterSettings::default();
        settings
            .retrieval
            .documents
            .insert("lease".to_string(), "doc".to_string());
        let err = settings.validate().unwrap_err();
        assert!(format!("{err:#}").contains("unknown contract type 'lease'"));
    }

    #[test]
    fn document_lookup_accepts_display_names() {
        let mut settings = RetrievalSettings::default();
        assert_eq!(
            settings.document_for(ContractType::ServiceLevel),
            Some("zegal_msa")
        );
        settings.documents.clear();
        settings
            .documents
            .insert("Privacy Policy".to_string(), "custom_privacy".to_string());
        assert_eq!(
            settings.document_for(ContractType::PrivacyPolicy),
            Some("custom_privacy")
        );
        assert_eq!(settings.document_for(ContractType::DataProcessing), None);
    }
}
