use crate::core::classify::Classification;
use crate::domain::model::{CanonicalRecord, OutputTable, SplitTables, TableGroup};
use serde_json::Map;

/// 把標準化後的記錄拆成四張表。
///
/// 每筆記錄在每張表各產生一列，第 i 列都對應第 i 筆記錄。缺少的欄位直接省略。
pub fn assemble<'a, I>(records: I, classification: &Classification) -> SplitTables
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let empty_table = |group| OutputTable::new(group, classification.columns(group).to_vec());
    let mut tables = SplitTables {
        stores: empty_table(TableGroup::Stores),
        companies: empty_table(TableGroup::Companies),
        timezones: empty_table(TableGroup::Timezones),
        segments: empty_table(TableGroup::Segments),
    };

    for record in records {
        for group in TableGroup::ALL {
            let row: Map<_, _> = classification
                .columns(group)
                .iter()
                .filter_map(|column| {
                    record
                        .get(column)
                        .map(|value| (column.clone(), value.clone()))
                })
                .collect();
            tables.table_mut(group).push_row(row);
        }
    }

    tables
}
