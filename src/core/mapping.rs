//! 欄位對照表載入器
//!
//! 對照表是 JSON 物件，每一組 `"來源欄位": "標準欄位"`。為了相容舊版的
//! `columns.json`，也接受含有 `columns_stores` 區段的分段格式。
//!
//! 解析時保留重複的鍵，所以同一個來源欄位對到兩個不同目標會直接報錯，
//! 而不是默默採用最後一筆。

use crate::utils::error::{EtlError, Result, Stage};
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

const STORES_SECTION: &str = "columns_stores";

/// 驗證過、不可變的欄位對照表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    renames: BTreeMap<String, String>,
}

impl FieldMapping {
    /// 從 (來源, 目標) 配對建立對照表並檢查一致性
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut renames: BTreeMap<String, String> = BTreeMap::new();

        for (source, target) in pairs {
            let source = source.into();
            let target = target.into();

            if let Some(existing) = renames.get(&source) {
                if existing != &target {
                    return Err(EtlError::config(format!(
                        "source field '{}' is mapped to both '{}' and '{}'",
                        source, existing, target
                    )));
                }
                continue;
            }
            renames.insert(source, target);
        }

        // 兩個來源欄位不可改成同一個名稱
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for (source, target) in &renames {
            if let Some(other) = owners.insert(target.as_str(), source.as_str()) {
                return Err(EtlError::schema(
                    Stage::Configuration,
                    format!(
                        "canonical field '{}' is produced by both '{}' and '{}'",
                        target, other, source
                    ),
                ));
            }
        }

        Ok(Self { renames })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let root: OrderedPairs<MappingValue> = serde_json::from_str(content)
            .map_err(|e| EtlError::config(format!("invalid mapping JSON: {}", e)))?;

        let pairs = Self::select_pairs(root.0)?;
        Self::from_pairs(pairs)
    }

    fn select_pairs(entries: Vec<(String, MappingValue)>) -> Result<Vec<(String, String)>> {
        if entries
            .iter()
            .all(|(_, value)| matches!(value, MappingValue::Target(_)))
        {
            return Ok(entries
                .into_iter()
                .filter_map(|(key, value)| match value {
                    MappingValue::Target(target) => Some((key, target)),
                    _ => None,
                })
                .collect());
        }

        // 分段格式的根層只能放區段
        if let Some((key, _)) = entries
            .iter()
            .find(|(_, value)| matches!(value, MappingValue::Target(_)))
        {
            return Err(EtlError::config(format!(
                "mapping mixes the plain pair '{}' with sections; put it inside '{}'",
                key, STORES_SECTION
            )));
        }

        let mut sections = entries
            .into_iter()
            .filter(|(key, _)| key == STORES_SECTION)
            .map(|(_, value)| value);

        match (sections.next(), sections.next()) {
            (Some(MappingValue::Section(section)), None) => Ok(section.0),
            (Some(_), None) => Err(EtlError::config(format!(
                "mapping section '{}' must be an object of string pairs",
                STORES_SECTION
            ))),
            (Some(_), Some(_)) => Err(EtlError::config(format!(
                "mapping section '{}' appears more than once",
                STORES_SECTION
            ))),
            (None, _) => Err(EtlError::config(format!(
                "mapping values must be strings, or the file must contain a '{}' section",
                STORES_SECTION
            ))),
        }
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.renames.get(source).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }
}

/// 讀取對照表檔案。檔案不存在或格式錯誤都算設定錯誤。
pub fn load_mapping<P: AsRef<Path>>(path: P) -> Result<FieldMapping> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        EtlError::config(format!(
            "cannot read mapping file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let mapping = FieldMapping::from_json_str(&content)?;
    if mapping.is_empty() {
        tracing::warn!(
            "⚠️ Mapping file {} has no renames; API field names are kept as-is",
            path.display()
        );
    }
    tracing::debug!(
        "Loaded {} field renames from {}",
        mapping.len(),
        path.display()
    );
    Ok(mapping)
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum MappingValue {
    Target(String),
    Section(OrderedPairs<String>),
    #[allow(dead_code)]
    Other(Value),
}

/// 保留原始順序與重複鍵的 JSON 物件
struct OrderedPairs<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedPairs<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PairsVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
            type Value = OrderedPairs<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, V>()? {
                    pairs.push((key, value));
                }
                Ok(OrderedPairs(pairs))
            }
        }

        deserializer.deserialize_map(PairsVisitor(PhantomData))
    }
}
