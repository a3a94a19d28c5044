use std::sync::Arc;

use anyhow::Result;

use {
    sharebridge_config::ShareBridgeConfig,
    sharebridge_ingest::{Batch, HandoffStore, SuiteDefaults},
};

/// Print the stored batch as JSON on stdout.
pub async fn handle_inspect(config: &ShareBridgeConfig) -> Result<()> {
    let suite = SuiteDefaults::open(config.defaults_dir(), &config.share.app_group_id).await?;
    eprintln!("Reading {}", suite.path().display());
    let handoff = HandoffStore::new(Arc::new(suite), config.share.shared_key.clone());

    let Some(batch) = handoff.read().await? else {
        eprintln!("No batch stored under \"{}\".", handoff.key());
        return Ok(());
    };

    eprintln!("{} item(s), tag {}", batch.len(), batch.redirect_tag());
    let json = match batch {
        Batch::Media(ref items) => serde_json::to_string_pretty(items)?,
        Batch::Text(ref items) => serde_json::to_string_pretty(items)?,
    };
    println!("{json}");
    Ok(())
}
