//! Projects resource.

use serde::{Deserialize, Serialize};

use super::{Status, filter_by_status};
use crate::error::ApiResult;
use crate::session::SessionClient;

const PROJECTS_PATH: &str = "/api/projects/";

/// An association project.
///
/// `budget` and `raised_amount` are decimal strings as serialized by the
/// backend; they are surfaced verbatim rather than parsed into floats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    /// Human-readable label the backend derives from `status`.
    #[serde(default)]
    pub status_display: Option<String>,
    /// Completion percentage, 0-100.
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub raised_amount: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Project {
    /// Whether the project is raising funds.
    pub fn has_funding_goal(&self) -> bool {
        self.budget.is_some()
    }
}

/// Fetches every project.
pub async fn list(client: &SessionClient) -> ApiResult<Vec<Project>> {
    client.get_json(PROJECTS_PATH).await
}

/// Fetches projects, keeping only the given statuses (empty keeps all).
pub async fn list_filtered(client: &SessionClient, statuses: &[Status]) -> ApiResult<Vec<Project>> {
    let projects = list(client).await?;
    Ok(filter_by_status(projects, statuses, |project| project.status))
}
