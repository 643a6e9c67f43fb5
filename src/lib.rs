pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::fetcher::{CredentialEnv, Credentials, FetcherConfig, HttpFetcher};
pub use app::pipelines::store_pipeline::{LoadSettings, OutputFormat, StorePipeline};
pub use app::runner::run_from_config;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use crate::core::{etl::EtlEngine, mapping::{load_mapping, FieldMapping}};
pub use utils::error::{EtlError, Result};
