pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "stores-etl")]
#[command(about = "Fetch store records, rename their fields and split them into stores, companies, timezones and segments tables")]
pub struct CliConfig {
    /// Path to the TOML pipeline configuration
    #[arg(short, long, default_value = "stores-etl.toml")]
    pub config: String,

    /// Override transform.mapping_path
    #[arg(long)]
    pub mapping: Option<String>,

    /// Override load.output_path
    #[arg(long)]
    pub output_path: Option<String>,

    /// Validate configuration, mapping and credentials without calling the API
    #[arg(long)]
    pub dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
