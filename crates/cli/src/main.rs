mod cli;
mod fetcher;
mod trace;

use anyhow::bail;
use clap::Parser;
use cli::Cli;
use config::Config;
use engine::PrefetchManager;
use engine::cache::MemoryCache;
use fetcher::FileFetcher;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_log::AsTrace;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.log_level_filter().as_trace())
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    debug!(config = ?cli);

    let config = match &cli.conffile {
        Some(path) => Config::load(path)?,
        None => Config::new(),
    };

    if cli.print_config {
        print_config(&config)?;
        return Ok(());
    }
    let Some(trace_path) = &cli.trace else {
        bail!("a trace file is required unless --print-config is given");
    };

    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(FileFetcher::new(&cli.root, config.window.chunk_size));
    let manager = PrefetchManager::new(config, cache.clone(), fetcher)?;

    let stats = trace::replay(&manager, &cli.root, trace_path).await?;
    info!(
        accesses = stats.accesses,
        scheduled = stats.scheduled,
        skipped = stats.skipped,
        "trace replayed"
    );

    manager.shutdown(true).await;

    let metrics = manager.metrics();
    info!(
        completed = metrics.pool.completed,
        failed = metrics.pool.failed,
        cached_objects = cache.len(),
        sample_failures = metrics.sample_failures,
        "prefetch engine drained"
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_config(config: &Config) -> anyhow::Result<()> {
    println!("{}", config.to_toml_string()?);
    Ok(())
}
