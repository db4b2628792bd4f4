//! Project gallery resource.

use serde::{Deserialize, Serialize};

use super::ProjectRef;
use crate::error::ApiResult;
use crate::session::SessionClient;

const PROJECT_IMAGES_PATH: &str = "/api/project-images/";

/// A photo from a project's gallery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryImage {
    pub image: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub project: Option<ProjectRef>,
}

/// Fetches every gallery image.
pub async fn list(client: &SessionClient) -> ApiResult<Vec<GalleryImage>> {
    client.get_json(PROJECT_IMAGES_PATH).await
}

/// Keeps the images attached to one project.
pub fn filter_by_project(images: Vec<GalleryImage>, project_id: i64) -> Vec<GalleryImage> {
    images
        .into_iter()
        .filter(|image| {
            image
                .project
                .as_ref()
                .is_some_and(|project| project.id == project_id)
        })
        .collect()
}
