//! Typed bindings for the portal's REST resources.
//!
//! Each submodule pairs the response models for one resource with the
//! calls that fetch or submit them through a [`SessionClient`]. Listing
//! filters run client-side after one fetch.
//!
//! [`SessionClient`]: crate::session::SessionClient

pub mod activities;
pub mod contact;
pub mod events;
pub mod gallery;
pub mod projects;
pub mod staff;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the listing resources.
///
/// `Pending` only appears on projects. Values the backend adds later
/// deserialize as `Other` instead of failing the whole list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
    Postponed,
    Archived,
    #[serde(other)]
    Other,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Postponed => "postponed",
            Self::Archived => "archived",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "postponed" => Ok(Self::Postponed),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Unknown status: {value}")),
        }
    }
}

/// Reference to a project from another resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: i64,
    pub title: String,
}

/// Keeps the items whose status is in `statuses`.
///
/// An empty filter set means "all". With a non-empty set, items that
/// report no status are dropped.
pub fn filter_by_status<T>(
    items: Vec<T>,
    statuses: &[Status],
    status_of: impl Fn(&T) -> Option<Status>,
) -> Vec<T> {
    if statuses.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| status_of(item).is_some_and(|status| statuses.contains(&status)))
        .collect()
}
