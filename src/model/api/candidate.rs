use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::{candidate::CandidateStatus, email::Email},
    db::{
        candidate::{Candidate, CandidateCore},
        position::Position,
        voter::VoterCore,
    },
};

/// A candidate entered directly by an admin. Admin-entered candidates start approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub position_id: ApiId,
    pub name: String,
    pub email: Email,
    pub course_year: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub achievements: String,
    #[serde(default)]
    pub picture_url: Option<String>,
}

impl CandidateSpec {
    pub fn into_candidate(self, position: &Position) -> CandidateCore {
        CandidateCore {
            election_id: position.election_id,
            position_id: position.id,
            name: self.name.trim().to_string(),
            email: self.email,
            course_year: self.course_year.trim().to_string(),
            status: CandidateStatus::Approved,
            platform: self.platform,
            achievements: self.achievements,
            picture_url: self.picture_url,
        }
    }
}

/// A voter's application to run for a position. Applications start pending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidacyApplication {
    pub position_id: ApiId,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub achievements: String,
    #[serde(default)]
    pub picture_url: Option<String>,
}

impl CandidacyApplication {
    pub fn into_candidate(self, position: &Position, voter: &VoterCore) -> CandidateCore {
        CandidateCore {
            election_id: position.election_id,
            position_id: position.id,
            name: voter.display_name(),
            email: voter.email.clone(),
            course_year: voter.course_year.clone(),
            status: CandidateStatus::Pending,
            platform: self.platform,
            achievements: self.achievements,
            picture_url: self.picture_url,
        }
    }
}

/// New moderation status for a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CandidateStatusUpdate {
    pub status: CandidateStatus,
}

/// A candidate as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub position_id: ApiId,
    pub name: String,
    pub email: Email,
    pub course_year: String,
    pub status: CandidateStatus,
    pub platform: String,
    pub achievements: String,
    pub picture_url: Option<String>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        let core = candidate.candidate;
        Self {
            id: candidate.id.into(),
            election_id: core.election_id.into(),
            position_id: core.position_id.into(),
            name: core.name,
            email: core.email,
            course_year: core.course_year,
            status: core.status,
            platform: core.platform,
            achievements: core.achievements,
            picture_url: core.picture_url,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::mongodb::Id;

    impl CandidateSpec {
        pub fn example(position_id: Id) -> Self {
            Self {
                position_id: position_id.into(),
                name: "Andres Bonifacio".to_string(),
                email: "andres.bonifacio@students.campus.edu".parse().unwrap(),
                course_year: "BSCS-4".to_string(),
                platform: "Transparency and service.".to_string(),
                achievements: "Dean's lister".to_string(),
                picture_url: None,
            }
        }
    }

    impl CandidacyApplication {
        pub fn example(position_id: Id) -> Self {
            Self {
                position_id: position_id.into(),
                platform: "More study spaces.".to_string(),
                achievements: "Class president".to_string(),
                picture_url: Some("https://campus.edu/pictures/juan.png".to_string()),
            }
        }
    }
}
