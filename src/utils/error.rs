use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    /// 對照表或分類表在啟動時檢查失敗屬於設定階段，改名撞名屬於轉換階段
    #[error("Schema error: {message}")]
    SchemaError { stage: Stage, message: String },

    #[error("API request failed: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {endpoint}")]
    HttpStatusError { status: u16, endpoint: String },

    #[error("Unexpected API response format: {message}")]
    FormatError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 失敗發生在哪個階段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Fetch,
    Transform,
    Load,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Configuration => "configuration",
            Stage::Fetch => "fetch",
            Stage::Transform => "transform",
            Stage::Load => "load",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Schema,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn config(message: impl Into<String>) -> Self {
        EtlError::ConfigError {
            message: message.into(),
        }
    }

    pub fn schema(stage: Stage, message: impl Into<String>) -> Self {
        EtlError::SchemaError {
            stage,
            message: message.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        EtlError::FormatError {
            message: message.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => Stage::Configuration,
            EtlError::TransportError(_)
            | EtlError::HttpStatusError { .. }
            | EtlError::FormatError { .. } => Stage::Fetch,
            EtlError::SchemaError { stage, .. } => *stage,
            EtlError::CsvError(_)
            | EtlError::ZipError(_)
            | EtlError::IoError(_)
            | EtlError::SerializationError(_) => Stage::Load,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::TransportError(_) | EtlError::HttpStatusError { .. } => {
                ErrorCategory::Network
            }
            EtlError::FormatError { .. }
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_) => ErrorCategory::Data,
            EtlError::SchemaError { .. } => ErrorCategory::Schema,
            EtlError::ZipError(_) | EtlError::IoError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Data | ErrorCategory::Schema => {
                ErrorSeverity::High
            }
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ConfigError { .. } => {
                "Check that the mapping and pipeline configuration files exist and are valid"
            }
            EtlError::MissingConfigError { .. } => {
                "Set the missing environment variable or configuration key and rerun"
            }
            EtlError::InvalidConfigValueError { .. } => {
                "Fix the reported configuration value and rerun"
            }
            EtlError::SchemaError { .. } => {
                "Make sure every canonical field name is produced by exactly one source field and belongs to one table"
            }
            EtlError::TransportError(_) => "Check network connectivity and the API endpoint",
            EtlError::HttpStatusError { status, .. } if *status == 401 || *status == 403 => {
                "Check the API key and header environment variables"
            }
            EtlError::HttpStatusError { .. } => "Check the API endpoint and try again later",
            EtlError::FormatError { .. } => {
                "Check source.records_key and that the API still returns a list of records"
            }
            EtlError::CsvError(_) | EtlError::SerializationError(_) => {
                "Inspect the fetched records for values that cannot be serialized"
            }
            EtlError::ZipError(_) | EtlError::IoError(_) => {
                "Check that the output path is writable and has free space"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        format!("ETL run aborted during {} stage: {}", self.stage(), self)
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
