use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, common::email::Email, db::voter::Voter};

/// The logged-in voter's own profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterProfile {
    pub id: ApiId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub course_year: String,
    pub department_org: String,
    pub has_voted: bool,
    /// Has the voter set a password, i.e. can they log in without a PIN?
    pub has_password: bool,
}

impl From<Voter> for VoterProfile {
    fn from(voter: Voter) -> Self {
        let core = voter.voter;
        Self {
            id: voter.id.into(),
            email: core.email,
            first_name: core.first_name,
            last_name: core.last_name,
            course_year: core.course_year,
            department_org: core.department_org,
            has_voted: core.has_voted,
            has_password: core.password_hash.is_some(),
        }
    }
}

/// The editable part of a voter profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub course_year: String,
    pub department_org: String,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if self.course_year.trim().is_empty() {
            return Err("Course/year must not be empty".to_string());
        }
        Ok(())
    }
}
