//! Contact messages resource.

use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::session::SessionClient;

const CONTACT_MESSAGES_PATH: &str = "/api/contact-messages/";

/// Category used when the sender does not pick one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Categories the backend accepts.
pub const CATEGORIES: [&str; 5] = ["general", "alumni", "events", "donations", "careers"];

/// An outbound message to the association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub category: String,
}

impl ContactMessage {
    /// Builds a message in the default category.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            subject: subject.into(),
            message: message.into(),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// Replaces the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// Submits a contact message.
pub async fn send(client: &SessionClient, message: &ContactMessage) -> ApiResult<()> {
    client.post_unit(CONTACT_MESSAGES_PATH, message).await
}
