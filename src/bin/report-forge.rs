use anyhow::Result;
use clap::Parser;
use report_forge::observability::service_resources_metrics::collect_process_metrics;
use report_forge::server;
use report_forge::utils::config_loader;
use report_forge::utils::logging::{self, LogLevel};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "report-forge.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args, load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level)?;

    // -------------------------------
    // 2. Shutdown on SIGINT / SIGTERM
    // -------------------------------

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    // -------------------------------
    // 3. Start http server and process metrics
    // -------------------------------

    let service_metrics = tokio::spawn(collect_process_metrics(service_config.settings.metrics.is_enabled));

    info!("Service starting...");
    server::server::start(&service_config, shutdown).await?;
    service_metrics.abort();

    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received: closing HTTP server"),
        _ = terminate => info!("SIGTERM received: closing HTTP server"),
    }
    shutdown.cancel();
}
