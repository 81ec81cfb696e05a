use serde::{Deserialize, Serialize};

use crate::model::common::{email::Email, password::verify_password};

/// Core voter profile data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Institutional email; unique per voter.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// Course and year level, e.g. "BSCS-3".
    pub course_year: String,
    /// Department or organization the voter belongs to.
    pub department_org: String,
    /// Cached signal that the voter has cast a ballot. The votes themselves are authoritative.
    pub has_voted: bool,
    /// Argon2 hash; absent until the voter sets a password after PIN verification.
    pub password_hash: Option<String>,
}

impl VoterCore {
    /// Create a fresh voter profile for a verified email.
    pub fn new(email: Email) -> Self {
        Self {
            email,
            first_name: String::new(),
            last_name: String::new(),
            course_year: String::new(),
            department_org: String::new(),
            has_voted: false,
            password_hash: None,
        }
    }

    /// Check whether the given password is correct.
    /// A voter who never set a password cannot log in with one.
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash
            .as_deref()
            .map(|hash| verify_password(hash, password))
            .unwrap_or(false)
    }

    /// Name to show next to the voter's comments.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.to_string()
        } else {
            name.to_string()
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

with_id! {
    /// A voter from the database, with its unique ID.
    Voter { voter: VoterCore }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoterCore {
        pub fn example() -> Self {
            Self {
                first_name: "Juan".to_string(),
                last_name: "Dela Cruz".to_string(),
                course_year: "BSCS-3".to_string(),
                department_org: "Computer Society".to_string(),
                ..Self::new(Email::example())
            }
        }

        pub fn example2() -> Self {
            Self {
                first_name: "Maria".to_string(),
                last_name: "Santos".to_string(),
                course_year: "BSN-1".to_string(),
                department_org: "Nursing Guild".to_string(),
                ..Self::new(Email::example2())
            }
        }
    }
}
