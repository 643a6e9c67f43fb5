use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// 一筆門市資料，欄位順序與 API 回應一致
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// API 回傳、尚未改名的資料
pub type RawRecord = Record;

/// 依照欄位對照表改名後的資料
pub type CanonicalRecord = Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableGroup {
    Stores,
    Companies,
    Timezones,
    Segments,
}

impl TableGroup {
    pub const ALL: [TableGroup; 4] = [
        TableGroup::Stores,
        TableGroup::Companies,
        TableGroup::Timezones,
        TableGroup::Segments,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TableGroup::Stores => "stores",
            TableGroup::Companies => "companies",
            TableGroup::Timezones => "timezones",
            TableGroup::Segments => "segments",
        }
    }
}

impl std::fmt::Display for TableGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 單一輸出表。缺少的欄位直接省略，不補 null。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputTable {
    pub group: TableGroup,
    /// 此表宣告的欄位順序，由分類表提供
    #[serde(skip)]
    declared_columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl OutputTable {
    pub fn new(group: TableGroup, declared_columns: Vec<String>) -> Self {
        Self {
            group,
            declared_columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Map<String, Value>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Map<String, Value>> {
        self.rows.iter()
    }

    pub fn declared_columns(&self) -> &[String] {
        &self.declared_columns
    }

    /// 穩定的欄位集合：宣告順序中至少出現在一列的欄位
    pub fn columns(&self) -> Vec<&str> {
        self.declared_columns
            .iter()
            .filter(|column| self.rows.iter().any(|row| row.contains_key(column.as_str())))
            .map(String::as_str)
            .collect()
    }

    /// 去除重複列，保留第一次出現的順序
    pub fn distinct(&self) -> OutputTable {
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| seen.insert(Value::Object((*row).clone()).to_string()))
            .cloned()
            .collect();

        OutputTable {
            group: self.group,
            declared_columns: self.declared_columns.clone(),
            rows,
        }
    }
}

impl<'a> IntoIterator for &'a OutputTable {
    type Item = &'a Map<String, Value>;
    type IntoIter = std::slice::Iter<'a, Map<String, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// 拆分後的四張表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitTables {
    pub stores: OutputTable,
    pub companies: OutputTable,
    pub timezones: OutputTable,
    pub segments: OutputTable,
}

impl SplitTables {
    pub fn table(&self, group: TableGroup) -> &OutputTable {
        match group {
            TableGroup::Stores => &self.stores,
            TableGroup::Companies => &self.companies,
            TableGroup::Timezones => &self.timezones,
            TableGroup::Segments => &self.segments,
        }
    }

    pub fn table_mut(&mut self, group: TableGroup) -> &mut OutputTable {
        match group {
            TableGroup::Stores => &mut self.stores,
            TableGroup::Companies => &mut self.companies,
            TableGroup::Timezones => &mut self.timezones,
            TableGroup::Segments => &mut self.segments,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutputTable> {
        TableGroup::ALL.into_iter().map(move |group| self.table(group))
    }

    pub fn distinct(&self) -> SplitTables {
        SplitTables {
            stores: self.stores.distinct(),
            companies: self.companies.distinct(),
            timezones: self.timezones.distinct(),
            segments: self.segments.distinct(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub canonical_records: Vec<CanonicalRecord>,
    pub tables: SplitTables,
}
