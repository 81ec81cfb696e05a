use chrono::{DateTime, Utc};
use mongodb::bson::{to_bson, Bson};
use rocket::form::FromFormField;
use serde::{Deserialize, Serialize};

/// Who an election is for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "snake_case")]
pub enum ElectionLevel {
    /// Open to the whole university, subject to course/year eligibility.
    #[field(value = "university")]
    University,
    /// Restricted to members of the owning organization.
    #[field(value = "organization")]
    Organization,
}

impl From<ElectionLevel> for Bson {
    fn from(level: ElectionLevel) -> Self {
        to_bson(&level).expect("Serialisation is infallible")
    }
}

/// Where an election is in its lifecycle, derived from its start and end times.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    /// Not started yet; still editable.
    Upcoming,
    /// Voting is open.
    Ongoing,
    /// Voting has closed.
    Ended,
}

impl ElectionStatus {
    /// Work out the status at time `now`.
    pub fn at(start_time: DateTime<Utc>, end_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < start_time {
            Self::Upcoming
        } else if now < end_time {
            Self::Ongoing
        } else {
            Self::Ended
        }
    }
}
