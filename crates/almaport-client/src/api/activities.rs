//! Activities resource.

use serde::{Deserialize, Serialize};

use super::{ProjectRef, Status, filter_by_status};
use crate::error::ApiResult;
use crate::session::SessionClient;

const ACTIVITIES_PATH: &str = "/api/activities/";

/// An activity run under a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub activity_date: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Parent project, when the activity belongs to one.
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub attendees_expected: Option<u32>,
    #[serde(default)]
    pub attendees_count: Option<u32>,
}

impl Activity {
    /// Status used for filtering and display. Activities the backend
    /// ships without one read as upcoming.
    pub fn status_or_default(&self) -> Status {
        self.status.unwrap_or(Status::Upcoming)
    }
}

/// Fetches every activity.
pub async fn list(client: &SessionClient) -> ApiResult<Vec<Activity>> {
    client.get_json(ACTIVITIES_PATH).await
}

/// Fetches activities, keeping only the given statuses (empty keeps all).
pub async fn list_filtered(
    client: &SessionClient,
    statuses: &[Status],
) -> ApiResult<Vec<Activity>> {
    let activities = list(client).await?;
    Ok(filter_by_status(activities, statuses, |activity| {
        Some(activity.status_or_default())
    }))
}
