//! Events resource: listing and registration.

use serde::{Deserialize, Serialize};

use super::{Status, filter_by_status};
use crate::error::ApiResult;
use crate::session::SessionClient;

const EVENTS_PATH: &str = "/api/events/";
const REGISTRATIONS_PATH: &str = "/api/registrations/";

/// An association event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_date: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    /// Total seats, when the event is capped.
    #[serde(default)]
    pub slots: Option<u32>,
    #[serde(default)]
    pub attendees_count: Option<u32>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub gallery_images: Vec<String>,
}

impl Event {
    /// Status used for filtering and display. Events the backend ships
    /// without one read as upcoming.
    pub fn status_or_default(&self) -> Status {
        self.status.unwrap_or(Status::Upcoming)
    }

    /// Seats still open, when the event is capped.
    pub fn slots_left(&self) -> Option<u32> {
        let slots = self.slots?;
        Some(slots.saturating_sub(self.attendees_count.unwrap_or(0)))
    }

    pub fn is_full(&self) -> bool {
        self.slots_left() == Some(0)
    }
}

#[derive(Debug, Serialize)]
struct RegistrationRequest {
    event: i64,
}

/// Fetches every event.
pub async fn list(client: &SessionClient) -> ApiResult<Vec<Event>> {
    client.get_json(EVENTS_PATH).await
}

/// Fetches events, keeping only the given statuses (empty keeps all).
pub async fn list_filtered(client: &SessionClient, statuses: &[Status]) -> ApiResult<Vec<Event>> {
    let events = list(client).await?;
    Ok(filter_by_status(events, statuses, |event| {
        Some(event.status_or_default())
    }))
}

/// Registers the signed-in member for an event.
pub async fn register(client: &SessionClient, event_id: i64) -> ApiResult<()> {
    client
        .post_unit(REGISTRATIONS_PATH, &RegistrationRequest { event: event_id })
        .await
}
