//! YAML configuration. `${NAME}` references are replaced by environment variables before the
//! document is parsed.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use clap::ValueEnum;
use regex::{Captures, Regex};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub git: GitConfig,
    pub meetings: MeetingsConfig,
    pub jira: JiraConfig,
    pub confluence: ConfluenceConfig,
    pub report: ReportConfig,
    pub time: TimeConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Passed to `git log --author`.
    pub author: String,
    /// Repositories used as is.
    pub repos: Vec<PathBuf>,
    /// Directories scanned recursively for repositories.
    pub repo_dirs: Vec<PathBuf>,
    /// Upper bound for every single `git` invocation.
    pub timeout_secs: Option<u64>,
}

impl GitConfig {
    /// Zero means no timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MeetingsConfig {
    /// feishu, dingtalk or wecom
    pub platform: String,
    pub user_id: String,
    pub app_id: String,
    pub app_secret: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    pub username: String,
    pub url: String,
    pub api_token: String,
    pub project_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    pub username: String,
    pub url: String,
    pub api_token: String,
    pub space_key: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    #[default]
    Template,
    Llm,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub mode: ReportMode,
    pub template_path: Option<PathBuf>,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// openai, anthropic or local
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    pub timezone: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.into(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {path:?}");
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(data);
        // An empty document deserializes to unit, not to an empty mapping.
        let mut config = if expanded.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str::<Config>(&expanded)?
        };
        if config.time.timezone.trim().is_empty() {
            config.time.timezone = DEFAULT_TIMEZONE.into();
        }
        Ok(config)
    }
}

/// Replaces `${NAME}` with the value of the environment variable. Unset or empty variables are
/// left as they are.
pub fn expand_env_vars(input: &str) -> String {
    ENV_VAR
        .replace_all(input, |caps: &Captures| match std::env::var(&caps[1]) {
            Ok(value) if !value.is_empty() => value,
            _ => caps[0].to_string(),
        })
        .into_owned()
}
