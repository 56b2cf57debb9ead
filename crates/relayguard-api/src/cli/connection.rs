//! CLI commands for the ops surface: registry status and connection listing.

use crate::state::AppState;

/// `rguard status` - print registry and detector statistics.
pub async fn status(state: &AppState, json: bool) -> anyhow::Result<()> {
    let registry = state.router.ownership().stats().await;
    let detector = state.router.detector().stats();

    if json {
        let out = serde_json::json!({
            "registry": registry,
            "detector": detector,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {} Registry", console::style("◆").cyan());
    println!("    active connections: {}", registry.active_count);
    println!("    total connections:  {}", registry.total_count);
    println!(
        "    last update:        {}",
        registry
            .last_update
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| "never".to_string())
    );
    println!("    storage size:       {} bytes", registry.storage_size_bytes);
    println!();
    println!("  {} Loop detector", console::style("◆").cyan());
    println!("    tracked chats:      {}", detector.tracked_chats);
    println!("    tracked messages:   {}", detector.tracked_messages);
    println!("    live fingerprints:  {}", detector.live_fingerprints);
    println!(
        "    min interval:       {:.1}s",
        detector.min_message_interval_secs
    );
    println!("    duplicate window:   {}s", detector.duplicate_window_secs);
    println!();

    Ok(())
}

/// `rguard connections` - list active business connections.
pub async fn connections(state: &AppState, json: bool) -> anyhow::Result<()> {
    let records = state.router.ownership().list_active().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!();
        println!("  No active business connections.");
        println!();
        return Ok(());
    }

    println!();
    for record in &records {
        let owner = record
            .owner_name
            .as_deref()
            .unwrap_or("(unknown)")
            .to_string();
        let handle = record
            .owner_username
            .as_deref()
            .map(|u| format!(" @{u}"))
            .unwrap_or_default();
        println!(
            "  {} {}{}  owner_id={}  updated {}",
            console::style("●").green(),
            console::style(owner).bold(),
            handle,
            record.owner_user_id,
            record.updated_at.to_rfc3339(),
        );
        println!("    {}", console::style(&record.connection_id).dim());
    }
    println!();

    Ok(())
}
