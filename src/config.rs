use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    agent::AgentConfig,
    ledger::{LedgerConnector, SimulatedLedgerConfig, SimulatedLedgerConnector},
    notify::{
        FanoutNotificationSink, NotificationSink, StderrNotificationSink, TracingNotificationSink,
        WebhookNotificationSink, WebhookSinkConfig,
    },
    oracle::{
        HttpOracleClient, HttpOracleConfig, OracleClient, StaticOracleClient, StaticOracleConfig,
    },
};

const SCHEMA_FILE_NAME: &str = "escrow-agent.schema.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default = "default_notifications")]
    pub notifications: Vec<NotificationSinkConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            agent: AgentConfig::default(),
            oracle: OracleConfig::default(),
            ledger: LedgerConfig::default(),
            notifications: default_notifications(),
        }
    }
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/agent")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_notifications() -> Vec<NotificationSinkConfig> {
    vec![NotificationSinkConfig::Tracing, NotificationSinkConfig::Stderr]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OracleConfig {
    Http {
        #[serde(default)]
        config: HttpOracleConfig,
    },
    Static {
        #[serde(default)]
        config: StaticOracleConfig,
    },
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self::Http {
            config: HttpOracleConfig::default(),
        }
    }
}

impl OracleConfig {
    pub fn build(&self) -> Result<Arc<dyn OracleClient>> {
        let client: Arc<dyn OracleClient> = match self {
            Self::Http { config } => Arc::new(HttpOracleClient::new(config)?),
            Self::Static { config } => Arc::new(StaticOracleClient::new(config)),
        };
        Ok(client)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LedgerConfig {
    Simulated {
        #[serde(default)]
        config: SimulatedLedgerConfig,
    },
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::Simulated {
            config: SimulatedLedgerConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn build(&self) -> Arc<dyn LedgerConnector> {
        match self {
            Self::Simulated { config } => Arc::new(SimulatedLedgerConnector::new(config)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NotificationSinkConfig {
    Tracing,
    Stderr,
    Webhook { config: WebhookSinkConfig },
}

pub fn build_notification_sink(
    configs: &[NotificationSinkConfig],
) -> Result<Arc<dyn NotificationSink>> {
    let mut sinks: Vec<Arc<dyn NotificationSink>> = Vec::with_capacity(configs.len());
    for config in configs {
        let sink: Arc<dyn NotificationSink> = match config {
            NotificationSinkConfig::Tracing => Arc::new(TracingNotificationSink),
            NotificationSinkConfig::Stderr => Arc::new(StderrNotificationSink),
            NotificationSinkConfig::Webhook { config } => {
                Arc::new(WebhookNotificationSink::new(config)?)
            }
        };
        sinks.push(sink);
    }
    Ok(Arc::new(FanoutNotificationSink::new(sinks)))
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let config: Config =
            serde_json::from_value(config_value).context("failed to deserialize agent config")?;
        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join(SCHEMA_FILE_NAME);
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or {SCHEMA_FILE_NAME} next to it"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
