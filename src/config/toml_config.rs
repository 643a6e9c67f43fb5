use crate::app::fetcher::{CredentialEnv, Credentials, FetcherConfig, DEFAULT_TIMEOUT_SECS};
use crate::app::pipelines::store_pipeline::{LoadSettings, OutputFormat};
use crate::core::classify::Classification;
use crate::core::transform::Normalizer;
use crate::domain::model::TableGroup;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub transform: TransformConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub endpoint: String,
    /// 記錄清單在回應物件中的欄位名稱，例如 "unidades"
    pub records_key: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub credentials: CredentialEnv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    pub mapping_path: String,
    pub normalize: Option<BTreeMap<String, Normalizer>>,
    pub groups: Option<GroupsConfig>,
}

/// 覆寫內建分類表
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupsConfig {
    #[serde(default)]
    pub stores: Vec<String>,
    #[serde(default)]
    pub companies: Vec<String>,
    #[serde(default)]
    pub timezones: Vec<String>,
    #[serde(default)]
    pub segments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub filename: Option<String>,
    pub deduplicate: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            EtlError::config(format!(
                "cannot read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| EtlError::config(format!("TOML parsing error: {}", e)))
    }

    /// 替換環境變數 (例如 ${API_HOST})，找不到的變數保留原文
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| EtlError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        if let Some(key) = &self.source.records_key {
            validation::validate_non_empty_string("source.records_key", key)?;
        }
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_range("source.timeout_seconds", timeout, 1, 300)?;
        }
        validation::validate_path("transform.mapping_path", &self.transform.mapping_path)?;
        validation::validate_path("load.output_path", &self.load.output_path)?;
        if let Some(filename) = &self.load.filename {
            validation::validate_path("load.filename", filename)?;
        }
        validation::validate_allowed_values(
            "load.output_formats",
            &self.load.output_formats,
            &OutputFormat::NAMES,
        )?;
        if self.load.output_formats.is_empty() {
            return Err(EtlError::InvalidConfigValueError {
                field: "load.output_formats".to_string(),
                value: "[]".to_string(),
                reason: "At least one output format is required".to_string(),
            });
        }

        self.classification()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn fetcher_config(&self, credentials: Credentials) -> FetcherConfig {
        let mut config = FetcherConfig::new(self.source.endpoint.clone(), credentials)
            .with_timeout(self.timeout())
            .with_parameters(self.source.parameters.clone().unwrap_or_default());
        if let Some(key) = &self.source.records_key {
            config = config.with_records_key(key.clone());
        }
        config
    }

    /// 沒有 [transform.groups] 時使用內建分類表
    pub fn classification(&self) -> Result<Classification> {
        match &self.transform.groups {
            None => Ok(Classification::default()),
            Some(groups) => Classification::from_groups([
                (TableGroup::Stores, groups.stores.clone()),
                (TableGroup::Companies, groups.companies.clone()),
                (TableGroup::Timezones, groups.timezones.clone()),
                (TableGroup::Segments, groups.segments.clone()),
            ]),
        }
    }

    pub fn normalizers(&self) -> BTreeMap<String, Normalizer> {
        self.transform.normalize.clone().unwrap_or_default()
    }

    pub fn load_settings(&self) -> Result<LoadSettings> {
        let formats = self
            .load
            .output_formats
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<OutputFormat>>>()?;

        let mut settings = LoadSettings::new(self.load.output_path.clone())
            .with_formats(formats)
            .with_deduplicate(self.load.deduplicate.unwrap_or(false));
        if let Some(filename) = &self.load.filename {
            settings = settings.with_filename(filename.clone());
        }
        Ok(settings)
    }

    pub fn output_path(&self) -> &str {
        &self.load.output_path
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
