use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use faultline_core::{BaseError, ErrorCategory, ErrorContext, ErrorSeverity};
use faultline_service::{Config, Faultline};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "faultline",
    about = "Exercise the faultline error handling pipeline",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, help = "Path to a TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Also write logs to the default log file")]
    log_file: bool,

    #[arg(long, help = "Filter for internal diagnostics", default_value = "warn")]
    trace: String,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Raise errors through a fully wired service and print metrics")]
    Simulate {
        #[arg(long, help = "Error category (e.g. connection, filesystem)")]
        category: ErrorCategory,

        #[arg(long, help = "Error severity", default_value = "medium")]
        severity: ErrorSeverity,

        #[arg(long, help = "Number of errors to raise", default_value_t = 1)]
        count: u32,

        #[arg(long, help = "Error code; defaults to SIMULATED_<CATEGORY>")]
        code: Option<String>,

        #[arg(long = "detail", help = "Detail entry as key=value, repeatable")]
        details: Vec<String>,
    },

    #[command(about = "Print the effective configuration as TOML")]
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so command output stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.trace)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_overrides(|key| std::env::var(key).ok())?;
            config
        }
        None => Config::load()?,
    };
    if cli.log_file && config.logging.file_path.is_none() {
        config.logging.file_path = Some(Config::default_log_path());
    }

    match cli.command {
        Commands::Simulate {
            category,
            severity,
            count,
            code,
            details,
        } => simulate(config, category, severity, count, code, details).await,
        Commands::Config => {
            config.validate()?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn simulate(
    config: Config,
    category: ErrorCategory,
    severity: ErrorSeverity,
    count: u32,
    code: Option<String>,
    details: Vec<String>,
) -> Result<()> {
    let code = code.unwrap_or_else(|| {
        format!("SIMULATED_{}", category.as_str().replace('-', "_").to_uppercase())
    });
    let details = parse_details(&details)?;
    let service = Faultline::init(config).await?;

    for i in 1..=count {
        let mut builder = BaseError::builder(category, code.as_str())
            .severity(severity)
            .context(ErrorContext::new().operation("simulate").add("iteration", i))
            .technical_message(format!("Simulated {category} failure {i} of {count}"));
        for (key, value) in &details {
            builder = builder.detail(key.clone(), value.clone());
        }
        service.handle_error(builder.build()).await;
    }

    let metrics = service.metrics();
    service.close().await;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}

/// Parse `key=value` pairs; values that are valid JSON keep their type
fn parse_details(raw: &[String]) -> Result<Vec<(String, Value)>> {
    raw.iter()
        .map(|pair| {
            let Some((key, value)) = pair.split_once('=') else {
                bail!("Invalid detail '{pair}', expected key=value");
            };
            let value = serde_json::from_str(value)
                .unwrap_or_else(|_| Value::String(value.to_string()));
            Ok((key.trim().to_string(), value))
        })
        .collect()
}
