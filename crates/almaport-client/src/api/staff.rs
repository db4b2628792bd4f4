//! Executive team resource.

use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::session::SessionClient;

const EXECUTIVE_TEAM_PATH: &str = "/api/executive-team/";

/// A member of the association's executive team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub name: String,
    pub position: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub term_start: Option<String>,
    #[serde(default)]
    pub term_end: Option<String>,
}

/// Fetches the executive team roster.
pub async fn list(client: &SessionClient) -> ApiResult<Vec<StaffMember>> {
    client.get_json(EXECUTIVE_TEAM_PATH).await
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Contact details and term dates are optional.
    #[test]
    fn test_staff_member_minimal() {
        let member: StaffMember =
            serde_json::from_str(r#"{ "name": "Ada Mensah", "position": "President" }"#).unwrap();

        assert_eq!(member.name, "Ada Mensah");
        assert_eq!(member.email, None);
        assert_eq!(member.term_start, None);
    }
}
