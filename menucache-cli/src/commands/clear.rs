//! `clear` command: drop cached entries for one restaurant, or everything.

use std::path::PathBuf;

use clap::Args;
use menucache::store::PersistentStore;

use super::common::open_store;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Restaurant whose entries to remove
    #[arg(long, conflicts_with = "all")]
    pub restaurant: Option<String>,

    /// Remove every cached entry
    #[arg(long)]
    pub all: bool,
}

pub async fn run(cache_dir: PathBuf, args: ClearArgs) -> Result<(), CliError> {
    let store = open_store(&cache_dir, None).await?;
    let before = store.estimate_usage().await.used_bytes;

    match (&args.restaurant, args.all) {
        (Some(restaurant), _) => {
            println!("Clearing entries for restaurant '{restaurant}'...");
            store.remove_scope(restaurant).await;
        }
        (None, true) => {
            println!("Clearing all cached entries...");
            for meta in store.scan().await {
                store.remove(&meta.key).await;
            }
        }
        (None, false) => {
            return Err(CliError::Store(
                "pass --restaurant <id> or --all".to_string(),
            ));
        }
    }

    let after = store.estimate_usage().await.used_bytes;
    println!(
        "Freed {:.1} KB ({:.1} KB remaining)",
        before.saturating_sub(after) as f64 / 1024.0,
        after as f64 / 1024.0
    );
    Ok(())
}
