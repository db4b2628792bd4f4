//! Activity command handlers.

use almaport_client::api::{Status, activities};
use almaport_client::config::Config;
use anyhow::Result;

use super::{api_error, new_client};

pub async fn list(config: &Config, statuses: &[Status]) -> Result<()> {
    let client = new_client(config)?;
    let listed = activities::list_filtered(&client, statuses)
        .await
        .map_err(|e| api_error(&client, e))?;

    if listed.is_empty() {
        println!("No activities found.");
        return Ok(());
    }

    for activity in listed {
        let status = activity.status_or_default().as_str();
        let project = activity
            .project
            .as_ref()
            .map_or("-", |project| project.title.as_str());
        println!(
            "{}  {}  {}  {}  ({})",
            activity.id, status, activity.activity_date, activity.title, project
        );
    }
    Ok(())
}
