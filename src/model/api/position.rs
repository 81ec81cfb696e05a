use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDescription, id::ApiId},
    db::position::{Position, PositionCore},
    mongodb::Id,
};

/// A position specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub max_candidates: u32,
    #[serde(default = "one")]
    pub max_winners: u32,
    #[serde(default)]
    pub required: bool,
}

fn one() -> u32 {
    1
}

impl PositionSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Position title must not be empty".to_string());
        }
        if self.max_winners < 1 {
            return Err("A position must have at least one winner".to_string());
        }
        if self.max_candidates < self.max_winners {
            return Err("A position must allow at least as many candidates as winners".to_string());
        }
        Ok(())
    }

    /// Attach this spec to its election.
    pub fn into_position(self, election_id: Id) -> PositionCore {
        PositionCore {
            election_id,
            title: self.title.trim().to_string(),
            description: self.description,
            max_candidates: self.max_candidates,
            max_winners: self.max_winners,
            required: self.required,
        }
    }
}

/// A position as returned by the API, with its visible candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub title: String,
    pub description: String,
    pub max_candidates: u32,
    pub max_winners: u32,
    pub required: bool,
    pub candidates: Vec<CandidateDescription>,
}

impl PositionDescription {
    pub fn new(position: Position, candidates: Vec<CandidateDescription>) -> Self {
        Self {
            id: position.id.into(),
            election_id: position.election_id.into(),
            title: position.position.title,
            description: position.position.description,
            max_candidates: position.position.max_candidates,
            max_winners: position.position.max_winners,
            required: position.position.required,
            candidates,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winners_and_candidates_checked() {
        assert!(PositionSpec::example().validate().is_ok());

        let mut spec = PositionSpec::example();
        spec.max_winners = 0;
        assert!(spec.validate().is_err());

        let mut spec = PositionSpec::example_optional();
        spec.max_candidates = 1;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn max_winners_defaults_to_one() {
        let spec: PositionSpec = rocket::serde::json::serde_json::from_str(
            r#"{"title": "Treasurer", "max_candidates": 3}"#,
        )
        .unwrap();
        assert_eq!(spec.max_winners, 1);
        assert!(!spec.required);
    }
}
