use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

mod ballot_box;
mod reconciler;

pub use ballot_box::BallotBox;
pub use reconciler::reconcile_has_voted;

/// One voter's choice for one position. `candidate_id` is absent for an abstention.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VoteCore {
    pub user_id: Id,
    pub election_id: Id,
    pub position_id: Id,
    pub candidate_id: Option<Id>,
}

/// A vote without an ID.
pub type NewVote = VoteCore;

with_id! {
    /// A vote from the database, with its unique ID.
    Vote { vote: VoteCore }
}

/// Marks that a voter has cast their ballot in an election.
/// Unique per (voter, election), which is what prevents a second ballot.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VotingSessionCore {
    pub user_id: Id,
    pub election_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl VotingSessionCore {
    pub fn new(user_id: Id, election_id: Id) -> Self {
        Self {
            user_id,
            election_id,
            cast_at: Utc::now(),
        }
    }
}

/// A voting session without an ID.
pub type NewVotingSession = VotingSessionCore;

with_id! {
    /// A voting session from the database, with its unique ID.
    VotingSession { session: VotingSessionCore }
}
