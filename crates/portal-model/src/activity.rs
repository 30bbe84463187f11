//! Activities and registration records

use crate::de::lenient_date;
use crate::types::ActivityId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Optional side event (welcome dinner, excursion, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Embedded registration evidence; `None` on payloads that use the id list
    #[serde(default)]
    pub is_registered: Option<bool>,
}

/// Legacy registration row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRegistration {
    pub activity_id: ActivityId,
    #[serde(default)]
    pub registered_at: Option<String>,
}

/// Narrow response to a register/unregister call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRegistrationStatus {
    pub activity_id: ActivityId,
    pub is_registered: bool,
}
