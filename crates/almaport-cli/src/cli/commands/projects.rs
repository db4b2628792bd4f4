//! Project command handlers.

use almaport_client::api::{Status, projects};
use almaport_client::config::Config;
use anyhow::Result;

use super::{api_error, new_client};

pub async fn list(config: &Config, statuses: &[Status]) -> Result<()> {
    let client = new_client(config)?;
    let listed = projects::list_filtered(&client, statuses)
        .await
        .map_err(|e| api_error(&client, e))?;

    if listed.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    for project in listed {
        let status = project.status.map_or("-", Status::as_str);
        let progress = project
            .progress
            .map_or(String::new(), |p| format!("  {p:.0}%"));
        let funding = match (&project.raised_amount, &project.budget) {
            (Some(raised), Some(budget)) => format!("  raised {raised} of {budget}"),
            _ => String::new(),
        };
        println!(
            "{}  {}  {}{}{}",
            project.id, status, project.title, progress, funding
        );
    }
    Ok(())
}
