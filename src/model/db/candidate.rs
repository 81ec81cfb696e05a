use serde::{Deserialize, Serialize};

use crate::model::{
    common::{candidate::CandidateStatus, email::Email},
    mongodb::Id,
};

/// Core candidate data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct CandidateCore {
    pub election_id: Id,
    pub position_id: Id,
    pub name: String,
    pub email: Email,
    pub course_year: String,
    pub status: CandidateStatus,
    pub platform: String,
    pub achievements: String,
    pub picture_url: Option<String>,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

with_id! {
    /// A candidate from the database, with its unique ID.
    Candidate { candidate: CandidateCore }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::db::position::Position;

    const NAMES: [&str; 4] = ["Andres Bonifacio", "Gabriela Silang", "Apolinario Mabini", "Melchora Aquino"];

    impl CandidateCore {
        /// The `i`th approved example candidate for the given position.
        pub fn example(position: &Position, i: usize) -> Self {
            let name = NAMES[i % NAMES.len()];
            let email = format!(
                "{}.{}@students.campus.edu",
                name.split(' ').next().unwrap_or("candidate").to_lowercase(),
                i
            );
            Self {
                election_id: position.election_id,
                position_id: position.id,
                name: name.to_string(),
                email: email.parse().unwrap(),
                course_year: "BSCS-4".to_string(),
                status: CandidateStatus::Approved,
                platform: "Transparency and service.".to_string(),
                achievements: "Dean's lister".to_string(),
                picture_url: None,
            }
        }
    }
}
