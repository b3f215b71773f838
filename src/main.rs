use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chargebook::config::Config;
use chargebook::state::JsonFileStateStore;
use chargebook::store::MemoryDocumentStore;
use chargebook::sync::SyncOrchestrator;

/// Runs one sync attempt per provider and exits. Scheduling (cron, systemd
/// timers) lives outside this binary.
#[derive(Parser)]
#[command(name = "chargebook")]
#[command(about = "Sync procedure prices from transparency providers")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "providers.toml")]
    config: PathBuf,

    /// Directory holding per-provider sync cursors
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Providers to sync; defaults to every enabled provider
    providers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    config.validate()?;

    // The memory store is a stand-in for the external document backend;
    // synced records vanish at exit while the cursor persists. Deployments
    // with a durable backend plug it in behind the same trait.
    let documents = Arc::new(MemoryDocumentStore::new());
    let state = Arc::new(JsonFileStateStore::new(&cli.data_dir));

    let mut orchestrator =
        SyncOrchestrator::new(documents, state).with_retry_config(config.retry_config());
    for (name, source) in config.enabled_providers() {
        orchestrator = orchestrator.with_provider(Arc::new(source.build_client(name)));
    }

    let names: Vec<String> = if cli.providers.is_empty() {
        config
            .enabled_providers()
            .map(|(name, _)| name.clone())
            .collect()
    } else {
        cli.providers.clone()
    };

    if names.is_empty() {
        println!("No providers configured in {}", cli.config.display());
        return Ok(());
    }

    let mut failures = 0usize;
    for name in &names {
        let outcome = orchestrator.sync(name).await;
        if outcome.success {
            println!("{name}: ok ({} records)", outcome.records_processed);
        } else {
            failures += 1;
            println!(
                "{name}: failed: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} syncs failed", names.len());
    }
    Ok(())
}
