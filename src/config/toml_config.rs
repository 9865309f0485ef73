use crate::config::builtin_layouts::LayoutRegistry;
use crate::config::layout::LayoutParams;
use crate::domain::model::Credits;
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{validate_path, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_REVERSAL_PROBABILITY: f64 = 0.3;
pub const DEFAULT_DETAILED_COST: Credits = 60;
pub const DEFAULT_WRITTEN_COST: Credits = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub credits: CreditsSection,
    #[serde(default)]
    pub persistence: PersistenceSection,
    pub notification: Option<NotificationSection>,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub layouts: Vec<LayoutParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub reversal_probability: f64,
    pub seed: Option<u64>,
    pub submission_timeout_seconds: u64,
    pub platform: String,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            reversal_probability: DEFAULT_REVERSAL_PROBABILITY,
            seed: None,
            submission_timeout_seconds: 10,
            platform: "cli".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditsSection {
    pub default_detailed: Credits,
    pub default_written: Credits,
    /// credit key（例如 `LOVE_SPREAD_DETAILED`）對應的點數
    pub tiers: BTreeMap<String, Credits>,
    /// 設定時改用遠端 credit gate
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for CreditsSection {
    fn default() -> Self {
        Self {
            default_detailed: DEFAULT_DETAILED_COST,
            default_written: DEFAULT_WRITTEN_COST,
            tiers: BTreeMap::new(),
            endpoint: None,
            timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSection {
    pub backend: PersistenceBackend,
    pub data_dir: String,
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::Memory,
            data_dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSection {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub verbose: bool,
    pub json: bool,
}

impl EngineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EngineError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EngineError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NOTIFY_URL})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| EngineError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 內建牌陣加上設定檔中的 `[[layouts]]`
    pub fn layout_registry(&self) -> Result<LayoutRegistry> {
        let mut registry = LayoutRegistry::with_builtin();
        for params in &self.layouts {
            registry.register(params.clone())?;
        }
        Ok(registry)
    }

    pub fn submission_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.submission_timeout_seconds)
    }

    pub fn notification_timeout(&self) -> Duration {
        let secs = self
            .notification
            .as_ref()
            .and_then(|n| n.timeout_seconds)
            .unwrap_or(5);
        Duration::from_secs(secs)
    }

    pub fn credit_gate_timeout(&self) -> Duration {
        Duration::from_secs(self.credits.timeout_seconds)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_range(
            "engine.reversal_probability",
            self.engine.reversal_probability,
            0.0,
            1.0,
        )?;
        validate_range(
            "engine.submission_timeout_seconds",
            self.engine.submission_timeout_seconds,
            1,
            300,
        )?;

        validate_range("credits.timeout_seconds", self.credits.timeout_seconds, 1, 300)?;
        validate_range(
            "credits.default_detailed",
            self.credits.default_detailed,
            1,
            Credits::MAX,
        )?;
        validate_range(
            "credits.default_written",
            self.credits.default_written,
            1,
            Credits::MAX,
        )?;

        if self.persistence.backend == PersistenceBackend::File {
            validate_path("persistence.data_dir", &self.persistence.data_dir)?;
        }

        if let Some(notification) = &self.notification {
            validate_url("notification.endpoint", &notification.endpoint)?;
            if let Some(timeout) = notification.timeout_seconds {
                validate_range("notification.timeout_seconds", timeout, 1, 300)?;
            }
        }

        if let Some(endpoint) = &self.credits.endpoint {
            validate_url("credits.endpoint", endpoint)?;
        }

        for (key, cost) in &self.credits.tiers {
            if *cost == 0 {
                return Err(EngineError::InvalidConfigValueError {
                    field: format!("credits.tiers.{}", key),
                    value: cost.to_string(),
                    reason: "paid tiers must cost at least 1 credit".to_string(),
                });
            }
        }

        // 額外牌陣必須能通過 factory 與驗證
        self.layout_registry()?;

        Ok(())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
