//! Gallery command handlers.

use almaport_client::api::gallery;
use almaport_client::config::Config;
use anyhow::Result;

use super::{api_error, new_client};

pub async fn list(config: &Config) -> Result<()> {
    let client = new_client(config)?;
    let images = gallery::list(&client)
        .await
        .map_err(|e| api_error(&client, e))?;

    if images.is_empty() {
        println!("No images found.");
        return Ok(());
    }

    for image in images {
        let caption = image.caption.as_deref().unwrap_or("-");
        let project = image
            .project
            .as_ref()
            .map_or("-", |project| project.title.as_str());
        println!("{}  {}  ({})", image.image, caption, project);
    }
    Ok(())
}
