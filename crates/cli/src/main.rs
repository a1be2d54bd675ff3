mod sync_command;
mod terminal_prompt;

use std::path::PathBuf;

use {
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "envsync", about = "envsync: sync secrets and settings across repositories", version)]
struct Cli {
    /// Config file, or the directory to look for one in (defaults to the
    /// current directory).
    path: Option<PathBuf>,

    /// Let plugins report what they would change without changing it.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Never prompt for secrets; unresolved ones stay unresolved.
    #[arg(long, env = "ENVSYNC_NO_PROMPT", default_value_t = false)]
    no_prompt: bool,

    /// Save prompted secrets to the first writable secret store.
    #[arg(long, default_value_t = false)]
    persist: bool,

    /// Forget all needed secrets in writable stores before resolving them.
    #[arg(long, default_value_t = false)]
    reset: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "ENVSYNC_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
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

    info!(version = env!("CARGO_PKG_VERSION"), "envsync starting");

    let path = match cli.path.clone() {
        Some(path) => path,
        None => std::env::current_dir()?,
    };

    sync_command::run(&path, sync_command::SyncOptions {
        dry_run: cli.dry_run,
        prompt: !cli.no_prompt,
        persist: cli.persist,
        reset: cli.reset,
    })
    .await
}
