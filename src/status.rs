// System status display — backend, policy version, last update.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::policy::PolicyStore;

/// Display system status to the terminal.
pub async fn show(store: &PolicyStore, config: &Config) -> Result<()> {
    if config.uses_postgres() {
        println!("Database: PostgreSQL");
    } else if !Path::new(&config.db_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `edugate init` to set up the database.");
        return Ok(());
    } else {
        let file_size = std::fs::metadata(&config.db_path)
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "unknown".to_string());
        println!("Database: {} ({})", config.db_path, file_size);
    }

    let tables = store.database().table_count().await?;
    println!("Tables: {tables}");

    let policy = store.current().await?;
    println!(
        "Policy: v{} ({})",
        policy.version,
        if policy.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "Last updated: {} by {}",
        policy.last_updated.format("%Y-%m-%d %H:%M:%S UTC"),
        policy.updated_by.as_deref().unwrap_or("(default)")
    );
    println!(
        "Word lists: {} banned, {} educational",
        policy.banned_words.len(),
        policy.educational_words.len()
    );
    println!("Scorer: {:?} (timeout {:?})", config.scorer_backend, config.scorer_timeout);

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
