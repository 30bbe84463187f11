//! Guest identity and the read-only wedding record

use crate::de::{lenient_date, null_as_default};
use crate::types::ActivityId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RSVP answer; `Pending` is the initial sentinel set on import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    /// No answer yet
    #[default]
    Pending,
    /// Attending
    Confirmed,
    /// Not attending
    Declined,
    /// Undecided
    Maybe,
}

impl RsvpStatus {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::Pending => "pending",
            RsvpStatus::Confirmed => "confirmed",
            RsvpStatus::Declined => "declined",
            RsvpStatus::Maybe => "maybe",
        }
    }

    /// Whether the guest has answered at all
    #[inline]
    #[must_use]
    pub fn is_answered(&self) -> bool {
        !matches!(self, RsvpStatus::Pending)
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RsvpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RsvpStatus::Pending),
            "confirmed" => Ok(RsvpStatus::Confirmed),
            "declined" => Ok(RsvpStatus::Declined),
            "maybe" => Ok(RsvpStatus::Maybe),
            other => Err(format!("unknown rsvp status: {other}")),
        }
    }
}

fn one() -> u32 {
    1
}

/// Invited guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub rsvp_status: RsvpStatus,
    #[serde(default = "one")]
    pub number_of_attendees: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
    /// Legacy flat registration list; absent on newer payloads
    #[serde(default)]
    pub registered_activities: Option<Vec<ActivityId>>,
}

impl Guest {
    /// Display name
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Wedding description shown on the portal landing page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Wedding {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub bride_name: String,
    #[serde(default)]
    pub groom_name: String,
    #[serde(default, with = "lenient_date")]
    pub wedding_date: Option<NaiveDate>,
    #[serde(default)]
    pub venue_name: Option<String>,
    #[serde(default)]
    pub venue_address: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub welcome_message: Option<String>,
    #[serde(default)]
    pub our_story: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gallery_image_urls: Vec<String>,
}
