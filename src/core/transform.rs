use crate::core::mapping::FieldMapping;
use crate::domain::model::{CanonicalRecord, RawRecord};
use crate::utils::error::{EtlError, Result, Stage};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 依對照表改名。沒有對照的欄位保留原名。
///
/// 只有在兩個欄位改名後撞名時才失敗，缺欄位不是錯誤。
pub fn transform(record: &RawRecord, mapping: &FieldMapping) -> Result<CanonicalRecord> {
    let mut data = Map::with_capacity(record.len());

    for (key, value) in &record.data {
        let name = mapping.get(key).unwrap_or(key.as_str());
        if data.insert(name.to_string(), value.clone()).is_some() {
            return Err(EtlError::schema(
                Stage::Transform,
                format!(
                    "field '{}' appears twice after renaming (last source: '{}')",
                    name, key
                ),
            ));
        }
    }

    Ok(CanonicalRecord::new(data))
}

/// 改名後的值整理規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalizer {
    /// 只保留數字並轉成整數，例如郵遞區號 "01310-100" -> 1310100
    Digits,
    /// 陣列或物件轉成 JSON 文字
    Text,
}

impl Normalizer {
    pub fn apply(&self, value: Value) -> Value {
        match (self, value) {
            (Normalizer::Digits, Value::String(text)) => {
                let digits: String = text.chars().filter(char::is_ascii_digit).collect();
                digits
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or(Value::Null)
            }
            (Normalizer::Text, value @ (Value::Array(_) | Value::Object(_))) => {
                Value::String(value.to_string())
            }
            (_, value) => value,
        }
    }
}

pub fn normalize(mut record: CanonicalRecord, normalizers: &BTreeMap<String, Normalizer>) -> CanonicalRecord {
    for (field, normalizer) in normalizers {
        if let Some(value) = record.data.get_mut(field) {
            *value = normalizer.apply(value.take());
        }
    }
    record
}
