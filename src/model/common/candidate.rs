use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Moderation state of a candidacy. Admins may move a candidate between any two states.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    /// Applied, awaiting moderation. Not shown on the ballot.
    Pending,
    /// On the ballot.
    Approved,
    /// Removed from the ballot.
    Disqualified,
}

impl From<CandidateStatus> for Bson {
    fn from(status: CandidateStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
