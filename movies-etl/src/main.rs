use std::env;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use movies_etl::{Dependencies, EtlError, Settings};

#[derive(Parser)]
#[command(name = "movies-etl")]
#[command(
    about = "Keeps the movies search indices in sync with the catalog database",
    long_about = None
)]
struct Cli {
    /// Rewind every stream's watermark before running, forcing a full resync
    #[arg(long)]
    reset_state: bool,

    /// Run a single pass over all streams and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = %e, "Movies ETL failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), EtlError> {
    let settings = Settings::from_env()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let deps = Dependencies::new(&settings, shutdown_rx).await?;

    if cli.reset_state {
        deps.orchestrator.reset().await?;
    }

    if cli.once {
        let tick = deps.orchestrator.run_tick().await;
        for failure in &tick.failures {
            warn!(
                stream = %failure.stream,
                class = ?failure.class(),
                error = %failure.error,
                "Stream did not finish"
            );
        }
        return Ok(());
    }

    deps.orchestrator.run().await;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
