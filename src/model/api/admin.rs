use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{
    common::password::{hash_password, is_acceptable},
    db::admin::NewAdmin,
};

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = Error;

    /// Convert [`AdminCredentials`] to a new admin by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        let username = cred.username.trim();
        if username.is_empty() || !is_acceptable(&cred.password) {
            return Err(Error::bad_request("Illegal admin credentials"));
        }
        Ok(Self {
            username: username.to_string(),
            password_hash: hash_password(&cred.password)?,
        })
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl AdminCredentials {
        pub fn example1() -> Self {
            Self {
                username: "comelec-chair".into(),
                password: "ballots4ever".into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "osa-officer".into(),
                password: "totallysecurepassword".into(),
            }
        }

        pub fn example3() -> Self {
            Self {
                username: "registrar".into(),
                password: "foobarbaz".into(),
            }
        }

        pub fn empty() -> Self {
            Self {
                username: "".into(),
                password: "".into(),
            }
        }
    }
}
