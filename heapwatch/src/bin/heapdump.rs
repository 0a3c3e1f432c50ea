use clap::Parser;
use heapwatch::{
    init_telemetry,
    scheduler::snapshot_path,
    settings::config::{load_env_files, Settings},
};
use heapwatch_core::{
    jolokia::{JolokiaClient, JolokiaSnapshotSink},
    Clock, SnapshotSink, SystemClock,
};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "heapdump")]
#[command(about = "Capture a single heap dump of a JVM through its Jolokia endpoint")]
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
    let client = JolokiaClient::connect(&cli.endpoint, &settings.endpoint).await?;
    let sink = JolokiaSnapshotSink::new(client);

    let path = snapshot_path(&settings.output.heap_dump_dir, SystemClock.now());
    match sink.capture(&path).await {
        Ok(()) => info!(path = %path.display(), "Heap dump complete"),
        Err(e) if e.dump_written() => {
            warn!(path = %path.display(), error = %e, "Heap dump written with restricted permissions")
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
