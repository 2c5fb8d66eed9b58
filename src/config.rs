use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::BenchError;
use crate::provider::Provider;
use crate::report::RankBy;

pub const DEFAULT_PROMPT: &str = "Explain the relationship between quantum mechanics and \
general relativity, and give three practical applications.";
pub const DEFAULT_RUNS: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// LLM API Benchmark - latency and throughput comparison for streaming APIs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Benchmark a single API endpoint
    Single {
        /// API endpoint URL
        #[arg(long, env = "API_URL", default_value = "https://api.openai.com/v1/chat/completions")]
        api_url: String,

        /// API key
        #[arg(long, env = "API_KEY")]
        api_key: String,

        /// Model name to test
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,

        /// Test prompt
        #[arg(long, default_value = DEFAULT_PROMPT)]
        prompt: String,

        /// Number of timed runs
        #[arg(long, default_value_t = DEFAULT_RUNS)]
        runs: u32,

        /// Per-run timeout in seconds
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,

        /// API dialect (openai, claude, azure)
        #[arg(long, default_value = "openai")]
        api_type: Provider,

        /// Write the result as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Benchmark every API in a TOML config file and render a comparison
    Batch {
        /// Path to the TOML configuration file
        #[arg(long)]
        config: PathBuf,

        /// Ranking criterion for the comparison table
        #[arg(long, value_enum, default_value_t = RankBy::Throughput)]
        rank_by: RankBy,
    },
}

/// Immutable description of one endpoint under test
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub name: String,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    pub runs: u32,
    pub timeout_secs: u64,
    pub provider: Provider,
}

impl TargetConfig {
    /// Check the target shape before any exchange is attempted
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.endpoint.is_empty() {
            return Err(BenchError::Config(format!(
                "target '{}': endpoint URL is missing",
                self.name
            )));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(BenchError::Config(format!(
                "target '{}': endpoint '{}' is not an http(s) URL",
                self.name, self.endpoint
            )));
        }
        if self.api_key.is_empty() {
            return Err(BenchError::Config(format!(
                "target '{}': API key is missing",
                self.name
            )));
        }
        if self.model.is_empty() {
            return Err(BenchError::Config(format!(
                "target '{}': model is missing",
                self.name
            )));
        }
        if self.runs == 0 {
            return Err(BenchError::Config(format!(
                "target '{}': runs must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

/// `[general]` section of the batch file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub prompt: String,
    pub runs: u32,
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
    pub report_file: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            runs: DEFAULT_RUNS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_dir: PathBuf::from("./results"),
            report_file: "benchmark_report.md".to_string(),
        }
    }
}

/// One `[[apis]]` entry. Fields a target needs are optional here so a
/// single malformed entry surfaces as that target's failure instead of
/// rejecting the whole file.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEntry {
    pub name: Option<String>,
    pub url: Option<String>,
    pub key: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "type", default)]
    pub api_type: Provider,
    pub prompt: Option<String>,
    pub runs: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Parsed batch configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct BatchFile {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub apis: Vec<TargetEntry>,
}

impl BatchFile {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse TOML config")
    }

    /// Materialize targets, filling omitted fields from `[general]`.
    /// Targets are returned in configuration order.
    pub fn targets(&self) -> Vec<TargetConfig> {
        self.apis
            .iter()
            .enumerate()
            .map(|(i, entry)| TargetConfig {
                name: entry
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("API_{}", i + 1)),
                endpoint: entry.url.clone().unwrap_or_default(),
                api_key: entry.key.clone().unwrap_or_default(),
                model: entry.model.clone().unwrap_or_default(),
                prompt: entry.prompt.clone().unwrap_or_else(|| self.general.prompt.clone()),
                runs: entry.runs.unwrap_or(self.general.runs),
                timeout_secs: entry.timeout_secs.unwrap_or(self.general.timeout_secs),
                provider: entry.api_type,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_target() -> TargetConfig {
        TargetConfig {
            name: "test".to_string(),
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            api_key: "sk-test".to_string(),
            model: "test-model".to_string(),
            prompt: "hello".to_string(),
            runs: 3,
            timeout_secs: 30,
            provider: Provider::OpenAI,
        }
    }

    #[test]
    fn test_validate_accepts_valid_target() {
        assert!(valid_target().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_key() {
        let mut t = valid_target();
        t.api_key = String::new();
        let err = t.validate().unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut t = valid_target();
        t.endpoint = "not-a-url".to_string();
        assert!(t.validate().is_err());

        t.endpoint = String::new();
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_runs() {
        let mut t = valid_target();
        t.runs = 0;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_batch_file_general_defaults() {
        let file = BatchFile::parse(
            r#"
            [[apis]]
            name = "Local"
            url = "http://localhost:8000/v1/chat/completions"
            key = "sk-local"
            model = "llama-3"
            "#,
        )
        .unwrap();

        let targets = file.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].runs, DEFAULT_RUNS);
        assert_eq!(targets[0].timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(targets[0].prompt, DEFAULT_PROMPT);
        assert_eq!(targets[0].provider, Provider::OpenAI);
    }

    #[test]
    fn test_batch_file_general_overrides() {
        let file = BatchFile::parse(
            r#"
            [general]
            prompt = "count to ten"
            runs = 5
            timeout_secs = 60
            output_dir = "/tmp/bench"
            report_file = "cmp.md"

            [[apis]]
            name = "Claude"
            url = "https://api.anthropic.com/v1/messages"
            key = "sk-ant"
            model = "claude-3-5-haiku"
            type = "claude"
            runs = 2

            [[apis]]
            url = "https://api.openai.com/v1/chat/completions"
            key = "sk-oai"
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        assert_eq!(file.general.report_file, "cmp.md");

        let targets = file.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].provider, Provider::Claude);
        assert_eq!(targets[0].runs, 2);
        assert_eq!(targets[0].prompt, "count to ten");
        // Unnamed entries get positional names
        assert_eq!(targets[1].name, "API_2");
        assert_eq!(targets[1].runs, 5);
    }

    #[test]
    fn test_batch_file_incomplete_entry_still_materializes() {
        // Missing url/key must yield a target that fails validation,
        // not a file-level parse error
        let file = BatchFile::parse(
            r#"
            [[apis]]
            name = "Broken"
            model = "some-model"
            "#,
        )
        .unwrap();

        let targets = file.targets();
        assert_eq!(targets.len(), 1);
        assert!(targets[0].validate().is_err());
    }

    #[test]
    fn test_batch_file_rejects_unknown_api_type() {
        let result = BatchFile::parse(
            r#"
            [[apis]]
            url = "https://x.example.com"
            type = "gemini"
            "#,
        );
        assert!(result.is_err());
    }
}
