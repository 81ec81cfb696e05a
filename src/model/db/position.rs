use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core position data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PositionCore {
    /// Owning election.
    pub election_id: Id,
    pub title: String,
    pub description: String,
    /// How many non-disqualified candidates may run.
    pub max_candidates: u32,
    /// How many candidates win the position.
    pub max_winners: u32,
    /// Must every ballot include this position?
    pub required: bool,
}

/// A position without an ID.
pub type NewPosition = PositionCore;

with_id! {
    /// A position from the database, with its unique ID.
    Position { position: PositionCore }
}
