//! Contact command handlers.

use almaport_client::api::contact::{self, CATEGORIES, ContactMessage};
use almaport_client::config::Config;
use anyhow::Result;

use super::{api_error, new_client};

pub async fn send(config: &Config, message: &ContactMessage) -> Result<()> {
    if !CATEGORIES.contains(&message.category.as_str()) {
        anyhow::bail!(
            "Unknown category '{}'. Expected one of: {}",
            message.category,
            CATEGORIES.join(", ")
        );
    }

    let client = new_client(config)?;
    contact::send(&client, message)
        .await
        .map_err(|e| api_error(&client, e))?;

    println!("✓ Message sent");
    Ok(())
}
