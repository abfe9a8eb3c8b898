//! YAML configuration: credentials + column roles, and the email config.
//!
//! Two documents. The tool config holds the Gmail app password, the
//! optional enrichment API keys, and the column roles driving
//! reconciliation. The email config holds the subject plus free-form
//! template variables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::contacts::reconcile::MergeConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Cannot parse {0}: {1}")]
    Parse(PathBuf, serde_yaml::Error),
}

/// The tool config document.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub credentials: Credentials,
    pub columns: MergeConfig,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub gmail: GmailCredentials,
    #[serde(default)]
    pub clearbit: Option<ApiCredentials>,
    #[serde(default)]
    pub peopledatalabs: Option<ApiCredentials>,
}

#[derive(Debug, Deserialize)]
pub struct GmailCredentials {
    /// Gmail app password for SMTP submission.
    pub app_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiCredentials {
    pub api_key: String,
}

/// The email config document: subject plus template variables.
#[derive(Debug, Default, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub subject: Option<String>,
    /// Everything else in the document is a template variable.
    #[serde(flatten)]
    pub vars: BTreeMap<String, serde_yaml::Value>,
}

impl EmailConfig {
    /// Template variables as strings; scalars stringify, everything else
    /// is ignored.
    pub fn string_vars(&self) -> BTreeMap<String, String> {
        self.vars
            .iter()
            .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key.clone(), v)))
            .collect()
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    parse_yaml(path)
}

pub fn load_email(path: &Path) -> Result<EmailConfig, ConfigError> {
    parse_yaml(path)
}

fn parse_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}
