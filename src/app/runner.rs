//! 依 TOML 設定執行一次完整流程
//!
//! 對照表、分類表與憑證都在發出請求之前檢查完畢，任何一項失敗都不會連線。

use crate::app::fetcher::{Credentials, HttpFetcher};
use crate::app::pipelines::store_pipeline::StorePipeline;
use crate::config::cli::LocalStorage;
use crate::config::toml_config::TomlConfig;
use crate::core::etl::EtlEngine;
use crate::core::mapping::{load_mapping, FieldMapping};
use crate::utils::error::Result;
use crate::utils::validation::Validate;

/// 執行流程並回傳輸出檔路徑；`dry_run` 時只做檢查，回傳 `None`
pub async fn run_from_config<L>(
    config: &TomlConfig,
    lookup: L,
    dry_run: bool,
) -> Result<Option<String>>
where
    L: Fn(&str) -> Option<String>,
{
    config.validate()?;

    let mapping = load_mapping(&config.transform.mapping_path)?;
    let classification = config.classification()?;
    let settings = config.load_settings()?;
    let credentials = Credentials::resolve(&config.source.credentials, lookup)?;
    let fetcher = HttpFetcher::new(config.fetcher_config(credentials))?;

    display_config_summary(config, &mapping);

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - configuration, mapping and credentials are valid");
        return Ok(None);
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = StorePipeline::new(fetcher, storage, mapping, settings)
        .with_classification(classification)
        .with_normalizers(config.normalizers());

    EtlEngine::new(pipeline).run().await.map(Some)
}

fn display_config_summary(config: &TomlConfig, mapping: &FieldMapping) {
    tracing::info!("📋 Pipeline: {}", config.pipeline.name);
    if let Some(description) = &config.pipeline.description {
        tracing::info!("   {}", description);
    }
    tracing::info!("🌐 Endpoint: {}", config.source.endpoint);
    tracing::info!("⏱️ Timeout: {:?}", config.timeout());
    tracing::info!(
        "🗺️ Mapping: {} ({} renames)",
        config.transform.mapping_path,
        mapping.len()
    );
    tracing::info!(
        "💾 Output: {} as {}",
        config.load.output_path,
        config.load.output_formats.join(", ")
    );
}
