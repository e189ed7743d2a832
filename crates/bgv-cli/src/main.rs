use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::validate::ValidateArgs;
use commands::UsageError;

#[derive(Parser)]
#[command(name = "bgv")]
#[command(about = "Blue/green switch validator: reconcile producer publishes against consumer deliveries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect producer/consumer records, reconcile, print the report and a verdict
    Validate(ValidateArgs),

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> environment -> run overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Optional: .env.local may hold token env vars and BGV_LOKI_URL.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();
    let verbose = matches!(&cli.cmd, Commands::Validate(args) if args.verbose);
    init_tracing(verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<UsageError>() {
            Some(usage) => {
                eprintln!("usage error: {usage}");
                ExitCode::from(2)
            }
            None => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Commands::Validate(args) => commands::validate::run(args).await,

        Commands::ConfigHash { paths } => {
            let loaded = bgv_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(())
        }
    }
}

/// Logs go to stderr so the text report on stdout stays clean.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
