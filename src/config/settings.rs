use crate::errors::ReportError;
use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "RELEASE_TICKETS";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub jira: JiraConfig,
    pub report: ReportConfig,
    #[serde(default = "default_custom_fields")]
    pub custom_fields: Vec<CustomField>,
}

#[derive(Debug, Deserialize)]
pub struct JiraConfig {
    pub url: String,
    pub email: String,
    pub api_token: String,
    pub project_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    pub fix_version: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Creation-time ordering of the search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_jql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn as_config(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Values given on the command line. They take precedence over the file and
/// the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub project_key: Option<String>,
    pub fix_version: Option<String>,
    pub max_results: Option<u32>,
    pub order: Option<SortOrder>,
}

/// Maps a stable display name to the Jira custom field id that holds it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomField {
    pub label: String,
    pub id: String,
}

impl CustomField {
    fn new(label: &str, id: &str) -> Self {
        Self {
            label: label.to_string(),
            id: id.to_string(),
        }
    }
}

pub fn default_custom_fields() -> Vec<CustomField> {
    vec![
        CustomField::new("Product Item", "customfield_11210"),
        CustomField::new("Environment", "customfield_11211"),
        CustomField::new("Feature", "customfield_11215"),
        CustomField::new("Testing version", "customfield_11179"),
    ]
}

fn default_max_results() -> u32 {
    100
}

impl Settings {
    /// Loads the config file (optional unless given explicitly), then
    /// `RELEASE_TICKETS__SECTION__KEY` environment variables, then `overrides`.
    pub fn load(explicit_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let path = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Configuration file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => Self::config_path()?,
        };

        tracing::debug!(path = %path.display(), exists = path.exists(), "loading configuration");

        let config = Config::builder()
            .add_source(
                File::from(path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("jira.project_key", overrides.project_key.clone())?
            .set_override_option("report.fix_version", overrides.fix_version.clone())?
            .set_override_option("report.max_results", overrides.max_results.map(i64::from))?
            .set_override_option("report.order", overrides.order.map(|o| o.as_config()))?
            .build()
            .context("Failed to read configuration")?;

        let settings: Settings = config.try_deserialize().with_context(|| {
            format!(
                "Incomplete configuration. Fill in {} or set {}__JIRA__URL and friends",
                path.display(),
                ENV_PREFIX
            )
        })?;

        Ok(settings)
    }

    pub fn validate(&self) -> crate::errors::Result<()> {
        let required = [
            ("jira.url", &self.jira.url),
            ("jira.email", &self.jira.email),
            ("jira.api_token", &self.jira.api_token),
            ("jira.project_key", &self.jira.project_key),
            ("report.fix_version", &self.report.fix_version),
        ];

        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ReportError::ConfigInvalid(format!("{} must not be empty", name)));
        }

        if self.report.max_results == 0 {
            return Err(ReportError::ConfigInvalid(
                "report.max_results must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Prefix every ticket key is appended to, e.g. `https://x.atlassian.net/browse/`.
    pub fn browse_base(&self) -> String {
        format!("{}/browse/", self.jira.url.trim_end_matches('/'))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.report.timeout_secs.map(Duration::from_secs)
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .context("HOME environment variable not set")?;

        Ok(PathBuf::from(home)
            .join(".release-tickets")
            .join("config.toml"))
    }
}
