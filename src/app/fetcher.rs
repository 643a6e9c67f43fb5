//! 門市 API 的 HTTP 擷取
//!
//! 只發一次 GET，不重試。回應必須是記錄清單（或包在 `records_key` 底下的清單），
//! 否則整批視為失敗。

use crate::domain::model::RawRecord;
use crate::domain::ports::RecordSource;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 300;

/// 憑證所在的環境變數名稱
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialEnv {
    pub accept_env: String,
    pub content_type_env: String,
    pub api_key_env: String,
    pub api_key_header: String,
}

impl Default for CredentialEnv {
    fn default() -> Self {
        Self {
            accept_env: "accept".to_string(),
            content_type_env: "Content_Type".to_string(),
            api_key_env: "x_api_key".to_string(),
            api_key_header: "x-api-key".to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub accept: String,
    pub content_type: String,
    pub api_key: String,
    pub api_key_header: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("accept", &self.accept)
            .field("content_type", &self.content_type)
            .field("api_key", &"***")
            .field("api_key_header", &self.api_key_header)
            .finish()
    }
}

impl Credentials {
    pub fn from_env(names: &CredentialEnv) -> Result<Self> {
        Self::resolve(names, |name| std::env::var(name).ok())
    }

    /// 用指定的查詢函式取值，缺少或空白的變數一律報錯
    pub fn resolve<F>(names: &CredentialEnv, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| EtlError::MissingConfigError {
                    field: format!("environment variable '{}'", name),
                })
        };

        Ok(Self {
            accept: require(names.accept_env.as_str())?,
            content_type: require(names.content_type_env.as_str())?,
            api_key: require(names.api_key_env.as_str())?,
            api_key_header: names.api_key_header.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub endpoint: String,
    pub records_key: Option<String>,
    pub parameters: BTreeMap<String, String>,
    pub timeout: Duration,
    pub credentials: Credentials,
}

impl FetcherConfig {
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: endpoint.into(),
            records_key: None,
            parameters: BTreeMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            credentials,
        }
    }

    pub fn with_records_key(mut self, key: impl Into<String>) -> Self {
        self.records_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }
}

impl Validate for FetcherConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("source.endpoint", &self.endpoint)?;
        validation::validate_range(
            "source.timeout_seconds",
            self.timeout.as_secs(),
            1,
            MAX_TIMEOUT_SECS,
        )?;

        if let Some(key) = &self.records_key {
            validation::validate_non_empty_string("source.records_key", key)?;
        }

        let credentials = &self.credentials;
        HeaderName::from_bytes(credentials.api_key_header.as_bytes()).map_err(|e| {
            EtlError::InvalidConfigValueError {
                field: "source.credentials.api_key_header".to_string(),
                value: credentials.api_key_header.clone(),
                reason: e.to_string(),
            }
        })?;
        for (field, value) in [
            ("accept", &credentials.accept),
            ("content_type", &credentials.content_type),
            ("api_key", &credentials.api_key),
        ] {
            HeaderValue::from_str(value).map_err(|e| EtlError::InvalidConfigValueError {
                field: format!("credentials.{}", field),
                value: "<redacted>".to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

pub struct HttpFetcher {
    config: FetcherConfig,
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl RecordSource for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let credentials = &self.config.credentials;

        let mut request = self
            .client
            .get(&self.config.endpoint)
            .header(ACCEPT, &credentials.accept)
            .header(CONTENT_TYPE, &credentials.content_type)
            .header(credentials.api_key_header.as_str(), &credentials.api_key);

        if !self.config.parameters.is_empty() {
            request = request.query(&self.config.parameters);
        }

        tracing::debug!("📡 Making API request to: {}", self.config.endpoint);
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("📡 API response status: {}", status);

        if !status.is_success() {
            return Err(EtlError::HttpStatusError {
                status: status.as_u16(),
                endpoint: self.config.endpoint.clone(),
            });
        }

        let body = response.bytes().await?;
        decode_records(&body, self.config.records_key.as_deref())
    }
}

/// 解析回應內容並攤平巢狀物件
pub fn decode_records(body: &[u8], records_key: Option<&str>) -> Result<Vec<RawRecord>> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| EtlError::format(format!("response is not valid JSON: {}", e)))?;

    let items = match (records_key, payload) {
        (None, Value::Array(items)) => items,
        (None, other) => {
            return Err(EtlError::format(format!(
                "expected a list of records, got {}",
                kind_of(&other)
            )));
        }
        (Some(key), Value::Object(mut envelope)) => match envelope.remove(key) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(EtlError::format(format!(
                    "'{}' should hold a list of records, got {}",
                    key,
                    kind_of(&other)
                )));
            }
            None => {
                return Err(EtlError::format(format!(
                    "response has no '{}' field",
                    key
                )));
            }
        },
        (Some(key), other) => {
            return Err(EtlError::format(format!(
                "expected an object containing '{}', got {}",
                key,
                kind_of(&other)
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(object) => {
                let mut flat = Map::new();
                flatten_into(&mut flat, "", object).map_err(|field| {
                    EtlError::format(format!(
                        "record {} has field '{}' both as a dotted key and as a nested object",
                        index, field
                    ))
                })?;
                Ok(RawRecord::new(flat))
            }
            other => Err(EtlError::format(format!(
                "record {} is {}, not an object",
                index,
                kind_of(&other)
            ))),
        })
        .collect()
}

/// `{"empresa": {"id": 1}}` 變成 `{"empresa.id": 1}`；陣列保持原樣
///
/// 攤平後撞名時回傳該欄位名稱，不覆寫既有的值。
fn flatten_into(
    target: &mut Map<String, Value>,
    prefix: &str,
    object: Map<String, Value>,
) -> std::result::Result<(), String> {
    for (key, value) in object {
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(target, &path, nested)?,
            other => {
                if target.contains_key(&path) {
                    return Err(path);
                }
                target.insert(path, other);
            }
        }
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_credentials_from_lookup() {
        let vars = env(&[
            ("accept", "application/json"),
            ("Content_Type", "application/json"),
            ("x_api_key", "secret"),
        ]);
        let credentials =
            Credentials::resolve(&CredentialEnv::default(), |name| vars.get(name).cloned()).unwrap();

        assert_eq!(credentials.api_key, "secret");
        assert_eq!(credentials.api_key_header, "x-api-key");
        assert!(!format!("{credentials:?}").contains("secret"));
    }

    #[test]
    fn test_missing_credential_fails_fast() {
        let vars = env(&[("accept", "application/json"), ("x_api_key", "  ")]);
        let err = Credentials::resolve(&CredentialEnv::default(), |name| vars.get(name).cloned())
            .unwrap_err();

        match err {
            EtlError::MissingConfigError { field } => assert!(field.contains("Content_Type")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_top_level_list_and_flatten() {
        let body = json!([
            {"id": 1, "empresa": {"id": 9, "nome": "Acme"}, "cameras": [1, 2]},
            {"id": 2, "fuso_horario": {"info": {"utc": -3}}}
        ])
        .to_string();

        let records = decode_records(body.as_bytes(), None).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("empresa.id"), Some(&json!(9)));
        assert_eq!(records[0].get("empresa.nome"), Some(&json!("Acme")));
        assert_eq!(records[0].get("cameras"), Some(&json!([1, 2])));
        assert_eq!(records[1].get("fuso_horario.info.utc"), Some(&json!(-3)));
    }

    #[test]
    fn test_decode_rejects_dotted_key_clash() {
        let body = json!([{"empresa.id": 1, "empresa": {"id": 2}}]).to_string();
        let err = decode_records(body.as_bytes(), None).unwrap_err();

        match err {
            EtlError::FormatError { message } => assert!(message.contains("empresa.id")),
            other => panic!("unexpected error: {other:?}"),
        }

        let reversed = json!([{"empresa": {"id": 2}, "empresa.id": 1}]).to_string();
        assert!(matches!(
            decode_records(reversed.as_bytes(), None),
            Err(EtlError::FormatError { .. })
        ));
    }

    #[test]
    fn test_decode_with_records_key() {
        let body = json!({"total": 1, "unidades": [{"id": 5}]}).to_string();
        let records = decode_records(body.as_bytes(), Some("unidades")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("id"), Some(&json!(5)));
    }

    #[test]
    fn test_decode_rejects_unexpected_shapes() {
        let cases: Vec<(String, Option<&str>)> = vec![
            ("not json".to_string(), None),
            (json!({"id": 1}).to_string(), None),
            (json!([1, 2]).to_string(), None),
            (json!([{"id": 1}, "oops"]).to_string(), None),
            (json!({"other": []}).to_string(), Some("unidades")),
            (json!({"unidades": {"id": 1}}).to_string(), Some("unidades")),
            (json!([{"id": 1}]).to_string(), Some("unidades")),
        ];

        for (body, key) in cases {
            let err = decode_records(body.as_bytes(), key).unwrap_err();
            assert!(
                matches!(err, EtlError::FormatError { .. }),
                "body {body} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_fetcher_config_validation() {
        let credentials = Credentials {
            accept: "application/json".to_string(),
            content_type: "application/json".to_string(),
            api_key: "k".to_string(),
            api_key_header: "x-api-key".to_string(),
        };

        let config = FetcherConfig::new("https://api.example.com/unidades", credentials.clone());
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        assert!(FetcherConfig::new("not-a-url", credentials.clone())
            .validate()
            .is_err());
        assert!(FetcherConfig::new("https://api.example.com", credentials.clone())
            .with_timeout(Duration::from_secs(0))
            .validate()
            .is_err());

        let bad_header = Credentials {
            api_key_header: "x api key".to_string(),
            ..credentials
        };
        assert!(FetcherConfig::new("https://api.example.com", bad_header)
            .validate()
            .is_err());
    }
}
