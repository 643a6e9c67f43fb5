use crate::core::assemble::assemble;
use crate::core::classify::Classification;
use crate::core::mapping::FieldMapping;
use crate::core::transform::{normalize, transform, Normalizer};
use crate::domain::model::{OutputTable, Record, SplitTables, TransformResult};
use crate::domain::ports::{Pipeline, RecordSource, Storage};
use crate::utils::error::{EtlError, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::str::FromStr;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const DEFAULT_BUNDLE_NAME: &str = "stores_output.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 2] = ["csv", "json"];
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(EtlError::InvalidConfigValueError {
                field: "load.output_formats".to_string(),
                value: other.to_string(),
                reason: format!("Unsupported format. Valid formats: {}", Self::NAMES.join(", ")),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSettings {
    pub output_path: String,
    pub formats: Vec<OutputFormat>,
    pub filename: String,
    /// 輸出前去除重複列（對應舊流程的 drop_duplicates）
    pub deduplicate: bool,
}

impl LoadSettings {
    pub fn new(output_path: String) -> Self {
        Self {
            output_path,
            formats: vec![OutputFormat::Csv],
            filename: DEFAULT_BUNDLE_NAME.to_string(),
            deduplicate: false,
        }
    }

    pub fn with_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_filename(mut self, filename: String) -> Self {
        self.filename = filename;
        self
    }

    pub fn with_deduplicate(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }
}

/// 門市資料的 ETL 流程：擷取、改名、拆表、打包
pub struct StorePipeline<F: RecordSource, S: Storage> {
    source: F,
    storage: S,
    mapping: FieldMapping,
    classification: Classification,
    normalizers: BTreeMap<String, Normalizer>,
    settings: LoadSettings,
}

impl<F: RecordSource, S: Storage> StorePipeline<F, S> {
    pub fn new(source: F, storage: S, mapping: FieldMapping, settings: LoadSettings) -> Self {
        Self {
            source,
            storage,
            mapping,
            classification: Classification::default(),
            normalizers: BTreeMap::new(),
            settings,
        }
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn with_normalizers(mut self, normalizers: BTreeMap<String, Normalizer>) -> Self {
        self.normalizers = normalizers;
        self
    }

    fn build_bundle(&self, tables: &SplitTables, record_count: usize) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for format in &self.settings.formats {
            match format {
                OutputFormat::Csv => {
                    for table in tables.iter() {
                        zip.start_file(format!("{}.csv", table.group), options)?;
                        zip.write_all(&table_to_csv(table)?)?;
                    }
                }
                OutputFormat::Json => {
                    let document: Map<String, Value> = tables
                        .iter()
                        .map(|table| {
                            let rows = table.iter().cloned().map(Value::Object).collect();
                            (table.group.to_string(), Value::Array(rows))
                        })
                        .collect();
                    zip.start_file("tables.json", options)?;
                    zip.write_all(serde_json::to_string_pretty(&document)?.as_bytes())?;
                }
            }
        }

        let row_counts: Map<String, Value> = tables
            .iter()
            .map(|table| (table.group.to_string(), json!(table.len())))
            .collect();
        let manifest = json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "records": record_count,
            "deduplicated": self.settings.deduplicate,
            "tables": row_counts,
        });
        zip.start_file("manifest.json", options)?;
        zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// 標頭是表的欄位集合；缺少的欄位與 null 都輸出空字串
///
/// 沒有任何一列帶值時只輸出宣告的標頭，沒有宣告欄位則輸出空檔案。
pub fn table_to_csv(table: &OutputTable) -> Result<Vec<u8>> {
    let columns = table.columns();
    if columns.is_empty() {
        let declared = table.declared_columns();
        if declared.is_empty() {
            return Ok(Vec::new());
        }
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(declared)?;
        return writer
            .into_inner()
            .map_err(|e| EtlError::IoError(e.into_error()));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;

    for row in table {
        let cells = columns.iter().map(|column| match row.get(*column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        });
        writer.write_record(cells)?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

#[async_trait::async_trait]
impl<F: RecordSource, S: Storage> Pipeline for StorePipeline<F, S> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let records = self.source.fetch().await?;
        tracing::info!("📊 Extracted {} records", records.len());
        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        tracing::info!("🔧 Renaming fields on {} records", data.len());

        let canonical_records = data
            .iter()
            .map(|record| {
                transform(record, &self.mapping).map(|renamed| normalize(renamed, &self.normalizers))
            })
            .collect::<Result<Vec<_>>>()?;

        let dropped = self.classification.unclassified_fields(&canonical_records);
        if !dropped.is_empty() {
            tracing::warn!(
                "⚠️ {} fields belong to no table and are left out: {}",
                dropped.len(),
                dropped.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        let tables = assemble(&canonical_records, &self.classification);
        tracing::info!(
            "✅ Split into stores={}, companies={}, timezones={}, segments={} rows",
            tables.stores.len(),
            tables.companies.len(),
            tables.timezones.len(),
            tables.segments.len()
        );

        Ok(TransformResult {
            canonical_records,
            tables,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let tables = if self.settings.deduplicate {
            tracing::debug!("Removing repeated rows before writing");
            result.tables.distinct()
        } else {
            result.tables
        };

        let bundle = self.build_bundle(&tables, result.canonical_records.len())?;
        tracing::debug!("Writing ZIP file ({} bytes) to storage", bundle.len());
        self.storage
            .write_file(&self.settings.filename, &bundle)
            .await?;

        let output_path = format!("{}/{}", self.settings.output_path, self.settings.filename);
        tracing::info!("📦 Output saved: {}", output_path);
        Ok(output_path)
    }
}
