use std::sync::Arc;

use clap::Parser;
use heapwatch::{
    init_telemetry,
    scheduler::{SamplingScheduler, SchedulerOptions},
    settings::config::{load_env_files, Settings},
    stop_flag,
};
use heapwatch_core::{
    jolokia::{JolokiaClient, JolokiaMetricSource, JolokiaSnapshotSink},
    record::CsvRecordSink,
};
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "heapwatch")]
#[command(about = "Record JVM heap and class-loading metrics to CSV and capture heap dumps")]
#[clap(version)]
struct Cli {
    /// Jolokia endpoint of the JVM, e.g. http://localhost:8778/jolokia
    endpoint: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_files = load_env_files();
    init_telemetry::init_telemetry_and_tracing()?;
    for path in &env_files {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let settings = Settings::new()?;
    let options = SchedulerOptions::from_settings(&settings)?;

    let client = JolokiaClient::connect(&cli.endpoint, &settings.endpoint).await?;

    let scheduler = SamplingScheduler::new(
        Arc::new(JolokiaMetricSource::new(client.clone())),
        Arc::new(JolokiaSnapshotSink::new(client)),
        Box::new(CsvRecordSink::new(settings.output.csv_path.clone())),
        options,
    );

    let stop_flag = stop_flag::StopFlag::new();
    stop_flag::register_signal_handler(&stop_flag);

    scheduler.start().await?;
    stop_flag.wait().await;

    if let Some(stats) = scheduler.stop().await {
        let uptime = chrono::Utc::now() - stats.started_at;
        info!(
            uptime_secs = uptime.num_seconds(),
            samples_written = stats.samples_written,
            snapshots_captured = stats.snapshots_captured,
            "Monitoring finished"
        );
    }

    Ok(())
}
