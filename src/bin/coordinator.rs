use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use minimr::mr::coordinator::{Coordinator, CoordinatorConfig};

/// Dispatch map and reduce tasks to workers until every output is produced.
#[derive(Debug, Parser)]
#[command(name = "coordinator")]
struct Args {
    /// Input files, one map task per file.
    #[arg(required = true)]
    files: Vec<String>,

    /// Hostname or IP to listen on.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 50051)]
    port: u16,

    /// Number of reduce tasks; defaults to the number of input files.
    #[arg(long, default_value_t = 0)]
    n_reduce: u32,

    /// Milliseconds to wait for worker tasks.
    #[arg(long, default_value_t = 5000)]
    task_wait_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = CoordinatorConfig {
        host: args.host,
        port: args.port,
        n_reduce: args.n_reduce,
        task_wait_ms: args.task_wait_ms,
    };
    Coordinator::new(args.files, config).start().await
}
