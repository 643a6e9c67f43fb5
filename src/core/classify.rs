//! 標準欄位 -> 輸出表 的分類表

use crate::domain::model::{CanonicalRecord, TableGroup};
use crate::utils::error::{EtlError, Result, Stage};
use std::collections::{BTreeSet, HashMap};

const STORE_FIELDS: &[&str] = &[
    "id",
    "name",
    "code",
    "document",
    "address",
    "number",
    "complement",
    "district",
    "city",
    "state",
    "postal_code",
    "latitude",
    "longitude",
    "cameras",
    "status",
    "created_at",
    "updated_at",
];

const COMPANY_FIELDS: &[&str] = &["company_id", "company_name", "company_document"];

const TIMEZONE_FIELDS: &[&str] = &["timezone_id", "timezone", "timezone_offset"];

const SEGMENT_FIELDS: &[&str] = &["segment_id", "segment_name"];

/// 每個標準欄位只屬於一張表；不在表內的欄位不會輸出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    groups: HashMap<String, TableGroup>,
    columns: HashMap<TableGroup, Vec<String>>,
}

impl Classification {
    pub fn from_groups<I, F, S>(groups: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TableGroup, F)>,
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classification = Classification {
            groups: HashMap::new(),
            columns: TableGroup::ALL
                .into_iter()
                .map(|group| (group, Vec::new()))
                .collect(),
        };

        for (group, fields) in groups {
            for field in fields {
                let field = field.into();
                match classification.groups.get(&field) {
                    Some(existing) if *existing == group => continue,
                    Some(existing) => {
                        return Err(EtlError::schema(
                            Stage::Configuration,
                            format!(
                                "field '{}' is assigned to both '{}' and '{}'",
                                field, existing, group
                            ),
                        ));
                    }
                    None => {}
                }
                classification.groups.insert(field.clone(), group);
                classification
                    .columns
                    .entry(group)
                    .or_default()
                    .push(field);
            }
        }

        Ok(classification)
    }

    pub fn group_of(&self, field: &str) -> Option<TableGroup> {
        self.groups.get(field).copied()
    }

    /// 該表宣告的欄位順序
    pub fn columns(&self, group: TableGroup) -> &[String] {
        self.columns.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 找出不屬於任何表、會被捨棄的欄位
    pub fn unclassified_fields<'a, I>(&self, records: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a CanonicalRecord>,
    {
        records
            .into_iter()
            .flat_map(|record| record.data.keys())
            .filter(|field| self.group_of(field).is_none())
            .cloned()
            .collect()
    }
}

impl Default for Classification {
    fn default() -> Self {
        let mut groups = HashMap::new();
        let mut columns = HashMap::new();

        for (group, fields) in [
            (TableGroup::Stores, STORE_FIELDS),
            (TableGroup::Companies, COMPANY_FIELDS),
            (TableGroup::Timezones, TIMEZONE_FIELDS),
            (TableGroup::Segments, SEGMENT_FIELDS),
        ] {
            for field in fields {
                groups.insert(field.to_string(), group);
            }
            columns.insert(group, fields.iter().map(|f| f.to_string()).collect());
        }

        Self { groups, columns }
    }
}
