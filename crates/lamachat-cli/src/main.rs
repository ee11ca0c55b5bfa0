mod prompt;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lamachat_core::{stop_command, AppContext, LamaConfig, SessionController};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use tui::TuiFrontend;

/// Chat with local Ollama models from the terminal.
#[derive(Parser)]
#[command(name = "lamachat", version)]
struct Cli {
    /// Ollama server URL, overrides the config file
    #[arg(long, global = true)]
    host: Option<String>,

    /// Write debug logs to ~/.lamachat/logs/debug.log
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stop the running Ollama server
    Stop {
        /// Skip the confirmation prompt
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
}

/// Keeps the non-blocking file writer alive until `main` returns.
fn init_tracing(debug: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Console output would corrupt the TUI, so it always goes to a sink.
    let console = fmt::layer()
        .with_writer(std::io::sink)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    if !debug {
        tracing_subscriber::registry().with(console).init();
        return None;
    }

    let log_dir = LamaConfig::resolve_path("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let appender = tracing_appender::rolling::daily(&log_dir, "debug.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug,hyper_util=info,reqwest=info"));
    tracing_subscriber::registry().with(console).with(file).init();
    Some(guard)
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = LamaConfig::load()?;
    if let Some(host) = cli.host.as_deref() {
        config = config.with_base_url(host);
    }
    info!(base_url = %config.base_url, "starting lamachat");

    let mut ctx = AppContext::new(config);
    let mut frontend = TuiFrontend;
    match cli.command {
        Some(Commands::Stop { yes }) => stop_command(&mut ctx, &mut frontend, yes).await?,
        None => SessionController::new(ctx, frontend).run().await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_guard = init_tracing(cli.debug);

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        drop(log_guard);
        std::process::exit(1);
    }
}
