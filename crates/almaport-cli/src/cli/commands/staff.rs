//! Executive team command handlers.

use almaport_client::api::staff;
use almaport_client::config::Config;
use anyhow::Result;

use super::{api_error, new_client};

pub async fn list(config: &Config) -> Result<()> {
    let client = new_client(config)?;
    let roster = staff::list(&client)
        .await
        .map_err(|e| api_error(&client, e))?;

    if roster.is_empty() {
        println!("No team members found.");
        return Ok(());
    }

    for member in roster {
        let contact = member
            .email
            .as_deref()
            .or(member.phone.as_deref())
            .unwrap_or("-");
        println!("{}  {}  {}", member.name, member.position, contact);
    }
    Ok(())
}
