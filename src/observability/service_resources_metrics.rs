use crate::observability::metrics::get_metrics;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::time::Duration;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::time::sleep;

const SCRAPE_INTERVAL: Duration = Duration::from_secs(5);

/// Periodically publishes cpu / memory / uptime of this process. Never returns when enabled.
pub async fn collect_process_metrics(is_metrics_enabled: bool) -> Result<()> {
    if !is_metrics_enabled {
        return Ok(());
    }
    let metrics = get_metrics().await;
    let pid = sysinfo::get_current_pid().map_err(|e| anyhow!("cannot resolve own pid: {}", e))?;
    let mut sys = System::new();

    let started_at = Utc::now().timestamp();
    metrics.process_start_time.set(started_at);

    loop {
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        if let Some(process) = sys.process(pid) {
            metrics.process_cpu_usage.set(process.cpu_usage().into());
            metrics.process_memory_usage.set(process.memory() as i64);
        }
        metrics.process_uptime.set(Utc::now().timestamp() - started_at);

        sleep(SCRAPE_INTERVAL).await;
    }
}
