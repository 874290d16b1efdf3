//! `stats` command: print a diagnostics report for a cache directory.

use std::path::PathBuf;

use super::common::coordinator_readonly;
use crate::error::CliError;

pub async fn run(cache_dir: PathBuf, quota_mb: Option<u64>) -> Result<(), CliError> {
    let coordinator = coordinator_readonly(&cache_dir, quota_mb).await?;

    println!("Cache directory: {}", cache_dir.display());
    println!();
    print!("{}", coordinator.diagnostics().await.format());
    Ok(())
}
