//! Event command handlers.

use almaport_client::api::{Status, events};
use almaport_client::config::Config;
use anyhow::Result;

use super::{api_error, new_client};

pub async fn list(config: &Config, statuses: &[Status]) -> Result<()> {
    let client = new_client(config)?;
    let listed = events::list_filtered(&client, statuses)
        .await
        .map_err(|e| api_error(&client, e))?;

    if listed.is_empty() {
        println!("No events found.");
        return Ok(());
    }

    for event in listed {
        let status = event.status_or_default().as_str();
        let seats = match event.slots_left() {
            Some(0) => "  [full]".to_string(),
            Some(left) => format!("  [{left} seats left]"),
            None => String::new(),
        };
        println!(
            "{}  {}  {}  {}{}",
            event.id, status, event.event_date, event.title, seats
        );
    }
    Ok(())
}

pub async fn register(config: &Config, event_id: i64) -> Result<()> {
    let client = new_client(config)?;
    events::register(&client, event_id)
        .await
        .map_err(|e| api_error(&client, e))?;

    println!("✓ Registered for event {event_id}");
    Ok(())
}
