use clap::{Parser, Subcommand};
use querygate_adapter_pg::PostgresPool;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod routes;
mod state;

#[derive(Parser, Debug)]
#[command(name = "querygate", version, about = "Role-gated SQL query gateway")]
struct Cli {
    /// Path to the TOML config file (default: $QUERYGATE_CONFIG or ./querygate.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "querygate_runtime=debug". Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP gateway (default).
    Serve {
        /// Override `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Print an Argon2 hash for the users table (credential_scheme = "argon2").
    HashPassword {
        /// Password to hash. Read from QUERYGATE_PASSWORD when omitted.
        #[arg(env = "QUERYGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Load and validate the configuration, then print it with secrets masked.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.cmd.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => serve(config::config_path(cli.config), bind).await,
        Command::HashPassword { password } => {
            if password.is_empty() {
                anyhow::bail!("password must not be empty");
            }
            let hash = querygate_runtime::hash_password(&password)
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            println!("{}", hash);
            Ok(())
        }
        Command::CheckConfig => {
            let cfg = config::load_config(&config::config_path(cli.config))?;
            print!("{}", cfg.to_redacted_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config_path: PathBuf, bind: Option<String>) -> anyhow::Result<()> {
    let mut cfg = config::load_config(&config_path)?;
    if let Some(bind) = bind {
        cfg.server.bind = bind;
        cfg.validate()?;
    }

    // Connections are opened on first use so the gateway can start before
    // the database; failures surface per request as 500s.
    let pool = PostgresPool::connect_lazy(&cfg.upstream)?;
    tracing::info!(
        host = %cfg.upstream.host,
        database = %cfg.upstream.database,
        credential_scheme = ?cfg.auth.credential_scheme,
        "upstream pool configured"
    );

    let state = Arc::new(state::AppState::new(Arc::new(pool.clone()), &cfg));
    let app = routes::router(state, &cfg.server);

    let addr = cfg.server.socket_addr().map_err(anyhow::Error::msg)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("querygate listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("querygate stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
