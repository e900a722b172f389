//! poolclaw — bounded coordination pool for isolated agent workers
//!
//! Usage:
//!   poolclaw                               → serve (config from ./poolclaw.toml if present)
//!   poolclaw --config pool.toml --size 4   → serve with 4 workers created at startup
//!   poolclaw dump-config                   → print the default config as TOML
//!   poolclaw version                       → show version

use clap::{Parser, Subcommand};
use poolclaw_gateway::{start_gateway, GatewayConfig};
use poolclaw_scheduler::{PoolConfig, PoolRuntime};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "poolclaw.toml";

#[derive(Parser)]
#[command(
    name = "poolclaw",
    about = "Bounded coordination pool for isolated agent workers",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Port for the gateway server
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address for the gateway server
    #[arg(short, long)]
    bind: Option<String>,

    /// Auth token (or set POOLCLAW_GATEWAY_TOKEN)
    #[arg(short, long)]
    token: Option<String>,

    /// Workers to create at startup (1-16)
    #[arg(short, long)]
    size: Option<usize>,

    /// POST each task to this URL instead of completing it immediately
    #[arg(long)]
    webhook: Option<String>,

    /// Append every state transition to this JSONL file
    #[arg(long)]
    audit: Option<PathBuf>,

    /// Write logs to a file (in addition to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Emit stderr logs as JSON lines
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective config as TOML
    DumpConfig,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::DumpConfig) => {
            let config = load_config(&cli);
            print!("{}", config.to_toml());
        }

        Some(Commands::Version) => {
            println!("poolclaw v{}", env!("CARGO_PKG_VERSION"));
        }

        None => {
            let _guard = init_tracing(cli.log_file.as_deref(), cli.log_json)?;
            serve(&cli).await?;
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>, json: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "poolclaw=info,poolclaw_scheduler=info,poolclaw_gateway=info,tower_http=info"
                    .into()
            }),
        )
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with(file_layer)
        .init();
    Ok(guard)
}

fn load_config(cli: &Cli) -> PoolConfig {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = PoolConfig::load(&path);
    apply_overrides(cli, &mut config);
    config
}

/// CLI flags win over the config file.
fn apply_overrides(cli: &Cli, config: &mut PoolConfig) {
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if let Some(bind) = &cli.bind {
        config.gateway.bind = bind.clone();
    }
    if let Some(token) = &cli.token {
        config.gateway.token = Some(token.clone());
    }
    if let Some(size) = cli.size {
        config.pool.initial_size = size;
    }
    if let Some(url) = &cli.webhook {
        config.executor.webhook_url = Some(url.clone());
    }
    if let Some(path) = &cli.audit {
        config.audit.path = Some(path.clone());
    }
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli);
    config.validate()?;

    let board = config.dependency_board();
    let executor = config.build_executor();
    let pool = config.build_pool(board.clone());
    if let Some(path) = &config.audit.path {
        info!("Audit log: {}", path.display());
    }

    let (handle, _runtime) = PoolRuntime::spawn(pool, executor);
    if config.pool.initial_size > 0 {
        handle.initialize(config.pool.initial_size).await?;
    } else {
        info!("No initial pool; waiting for pool.initialize");
    }

    let gateway = GatewayConfig {
        port: config.gateway.port,
        bind: config.gateway.bind.clone(),
        token: config.gateway.token.clone(),
    };

    tokio::select! {
        result = start_gateway(gateway, handle.clone(), board) => result?,
        _ = tokio::signal::ctrl_c() => {
            let report = handle.shutdown().await?;
            info!(
                "Interrupted: cancelled {} tasks, destroyed {} workers",
                report.cancelled_tasks, report.workers_destroyed
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.toml");
        std::fs::write(
            &path,
            "[pool]\ninitial_size = 2\n\n[gateway]\nport = 9000\nbind = \"0.0.0.0\"\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "poolclaw",
            "--config",
            path.to_str().unwrap(),
            "--size",
            "6",
            "--webhook",
            "http://localhost:7000/run",
        ]);
        let config = load_config(&cli);
        assert_eq!(config.pool.initial_size, 6);
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.bind, "0.0.0.0");
        assert_eq!(
            config.executor.webhook_url.as_deref(),
            Some("http://localhost:7000/run")
        );
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::parse_from(["poolclaw", "dump-config"]);
        assert!(matches!(cli.command, Some(Commands::DumpConfig)));
        let cli = Cli::parse_from(["poolclaw", "version"]);
        assert!(matches!(cli.command, Some(Commands::Version)));
        let cli = Cli::parse_from(["poolclaw", "--port", "1234"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.port, Some(1234));
    }

    #[test]
    fn oversized_pool_fails_validation() {
        let cli = Cli::parse_from(["poolclaw", "--config", "/nonexistent.toml", "--size", "40"]);
        assert!(load_config(&cli).validate().is_err());
    }
}
