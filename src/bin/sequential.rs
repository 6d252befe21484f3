use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use minimr::mr::app::{Indexer, MapReduceApp, WordCount};
use minimr::mr::io::DiskBlobstore;
use minimr::mr::sequential::run_sequential;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum App {
    WordCount,
    Indexer,
}

/// Run the in-process reference runner over the input files.
#[derive(Debug, Parser)]
#[command(name = "sequential")]
struct Args {
    /// Input files.
    #[arg(required = true)]
    files: Vec<String>,

    /// Which MapReduce program to run.
    #[arg(long, value_enum, default_value_t = App::WordCount)]
    app: App,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let app: Box<dyn MapReduceApp> = match args.app {
        App::WordCount => Box::new(WordCount::new()),
        App::Indexer => Box::new(Indexer::new()),
    };

    run_sequential(app.as_ref(), &args.files, &DiskBlobstore)
}
