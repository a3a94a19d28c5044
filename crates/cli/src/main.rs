mod config_commands;
mod inspect_commands;
mod launcher;
mod share_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    sharebridge_config::ShareBridgeConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "sharebridge", about = "ShareBridge: hand shared items to a receiving app")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Explicit config file (skips discovery).
    #[arg(long, global = true, env = "SHAREBRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Share files, media, text and links with the receiving app.
    Share(share_commands::ShareArgs),
    /// Print the batch currently stored for the receiving app.
    Inspect,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Initialise tracing. Logs go to stderr so stdout stays machine-readable.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ShareBridgeConfig> {
    match cli.config {
        Some(ref path) => sharebridge_config::load_config(path),
        None => Ok(sharebridge_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "sharebridge starting");

    match cli.command {
        Commands::Share(ref args) => {
            let config = load_config(&cli)?;
            share_commands::handle_share(args, &config).await
        },
        Commands::Inspect => {
            let config = load_config(&cli)?;
            inspect_commands::handle_inspect(&config).await
        },
        Commands::Config { ref action } => {
            config_commands::handle_config(action, cli.config.as_deref(), || load_config(&cli))
        },
    }
}
