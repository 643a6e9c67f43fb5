use clap::Parser;
use stores_etl::utils::error::{EtlError, ErrorSeverity};
use stores_etl::utils::logger;
use stores_etl::{run_from_config, CliConfig, TomlConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = CliConfig::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting stores-etl");
    tracing::debug!("CLI args: {:?}", args);

    match run(&args).await {
        Ok(Some(output_path)) => {
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(
                "❌ ETL run failed at {} stage: {} (Category: {:?}, Severity: {:?})",
                e.stage(),
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            std::process::exit(exit_code(&e));
        }
    }
}

async fn run(args: &CliConfig) -> Result<Option<String>, EtlError> {
    tracing::info!("📁 Loading configuration from: {}", args.config);
    let mut config = TomlConfig::from_file(&args.config)?;

    if let Some(mapping) = &args.mapping {
        config.transform.mapping_path = mapping.clone();
    }
    if let Some(output_path) = &args.output_path {
        config.load.output_path = output_path.clone();
    }

    run_from_config(&config, |name| std::env::var(name).ok(), args.dry_run).await
}

fn exit_code(error: &EtlError) -> i32 {
    match error.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
