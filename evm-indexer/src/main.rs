use std::process::ExitCode;
use std::time::Duration;

use derive_more::Display;
use evm_indexer::{Config, IndexerError, IndexerRepo, Repo, Scheduler};
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// How long the loop gets to observe the stop signal before the process exits
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(2);

#[derive(Debug, Display)]
enum AppError {
    #[display("{_0}")]
    Indexer(IndexerError),
    #[display("failed to install signal handler: {_0}")]
    Signal(std::io::Error),
    #[display("indexer task failed: {_0}")]
    Task(JoinError),
}

impl From<IndexerError> for AppError {
    fn from(value: IndexerError) -> Self {
        AppError::Indexer(value)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "Indexer exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let config = Config::from_env().map_err(IndexerError::from)?;

    migrate(&config).await?;

    let mut scheduler = Scheduler::from_config(config)?;
    let handle = scheduler.handle();
    let mut indexing = tokio::spawn(async move { scheduler.run().await });

    tokio::select! {
        signal = shutdown_signal() => {
            let signal = signal.map_err(AppError::Signal)?;
            info!(signal, "Shutting down");
        }
        result = &mut indexing => {
            return result.map_err(AppError::Task)?.map_err(AppError::from);
        }
    }

    handle.stop();

    match timeout(SHUTDOWN_GRACE_PERIOD, indexing).await {
        Ok(result) => result.map_err(AppError::Task)?.map_err(AppError::from),
        Err(_) => {
            warn!(
                grace_period_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
                "Indexer did not stop in time"
            );
            Ok(())
        }
    }
}

async fn migrate(config: &Config) -> Result<(), IndexerError> {
    let pool = config.repo.get_pool(1).await?;
    let mut conn = IndexerRepo::get_conn(&pool).await?;

    IndexerRepo::migrate(&mut conn).await?;
    info!("Migrations applied");

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;

    Ok("Ctrl+C")
}
