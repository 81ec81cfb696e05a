use serde::{Deserialize, Serialize};

use crate::model::{api::otp::Code, common::email::Email};

/// Request a PIN for an institutional email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterChallengeRequest {
    pub email: Email,
}

/// Answer a PIN challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoterVerifyRequest {
    pub code: Code,
}

/// Log in with a previously set password.
#[derive(Clone, Serialize, Deserialize)]
pub struct VoterLoginRequest {
    pub email: Email,
    pub password: String,
}

/// Set or replace the logged-in voter's password.
#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

#[cfg(test)]
mod examples {
    use super::*;

    impl VoterChallengeRequest {
        pub fn example() -> Self {
            Self {
                email: Email::example(),
            }
        }

        pub fn example2() -> Self {
            Self {
                email: Email::example2(),
            }
        }
    }

    impl VoterVerifyRequest {
        pub fn example(code: Code) -> Self {
            Self { code }
        }
    }

    impl PasswordRequest {
        pub fn example() -> Self {
            Self {
                password: "mabuhay-2024".to_string(),
            }
        }
    }
}
