mod scoreboard_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "chainball", about = "Chainball scoreboard gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the usual locations.
    #[arg(long, global = true, env = "CHAINBALL_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue one call to the scoreboard server.
    Call {
        /// Call name (see `chainball calls`).
        name: String,
        /// Parameters as key=value; values are parsed as JSON when possible.
        args: Vec<String>,
    },
    /// List the calls the gateway knows, with their default parameters.
    Calls,
    /// Print game, player, score and tournament status in one go.
    Status,
    /// Stream scoreboard events.
    Events {
        /// Stop after this many events.
        #[arg(long)]
        count: Option<usize>,
    },
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chainball starting");

    let config = chainball_config::load_or_discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Call { name, args } => scoreboard_commands::call(&config, &name, &args).await,
        Commands::Calls => scoreboard_commands::list_calls(),
        Commands::Status => scoreboard_commands::status(&config).await,
        Commands::Events { count } => scoreboard_commands::events(&config, count).await,
    }
}
