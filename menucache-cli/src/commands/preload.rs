//! `preload` command: warm the cache for one restaurant from a fixture.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use menucache::connection::{ConnectionHint, QualityDetector};
use menucache::preload::{PreloadRequest, Preloader};

use super::common::{coordinator_with_fixture, StaticProbe};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct PreloadArgs {
    /// Restaurant to preload
    #[arg(long)]
    pub restaurant: String,

    /// Fixture JSON file serving as the data source
    #[arg(long)]
    pub fixture: PathBuf,

    /// Refetch even when fresh entries are cached
    #[arg(long)]
    pub force: bool,

    /// Simulated fetch latency in milliseconds
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Simulated probe round-trip time in milliseconds
    #[arg(long)]
    pub rtt_ms: Option<u64>,

    /// Connection-type hint ("4g", "3g", "2g", "slow-2g"); overrides RTT
    #[arg(long)]
    pub connection: Option<String>,

    /// Start with the offline flag set
    #[arg(long)]
    pub offline: bool,
}

pub async fn run(
    cache_dir: PathBuf,
    quota_mb: Option<u64>,
    args: PreloadArgs,
) -> Result<(), CliError> {
    let hint = match &args.connection {
        Some(raw) => Some(
            ConnectionHint::parse(raw)
                .ok_or_else(|| CliError::Preload(format!("unknown connection hint: {raw}")))?,
        ),
        None => None,
    };

    let (coordinator, _source) =
        coordinator_with_fixture(&cache_dir, quota_mb, &args.fixture, args.latency_ms).await?;

    let status = coordinator.status();
    status.set_online(!args.offline);

    let detector = QualityDetector::new(status, Arc::new(StaticProbe::new(args.rtt_ms, hint)));
    let preloader = Arc::new(Preloader::new(Arc::clone(&coordinator), detector));

    preloader.subscribe(|state| {
        println!(
            "  [{:>3}%] {:?}{}",
            state.progress,
            state.stage,
            state
                .error
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default()
        );
    });

    println!("Preloading restaurant '{}'...", args.restaurant);
    let request = PreloadRequest::new(&args.restaurant).with_force_refresh(args.force);
    preloader
        .preload(request)
        .await
        .map_err(|e| CliError::Preload(e.to_string()))?;

    let diagnostics = coordinator.diagnostics().await;
    println!();
    println!("{}", diagnostics.metrics.format());
    println!(
        "Cached entries in memory: {} ({:.1} KB)",
        diagnostics.memory_entry_count,
        diagnostics.memory_used_bytes as f64 / 1024.0
    );
    Ok(())
}
