use chrono::{DateTime, Duration, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::otp::Code,
    common::{
        email::Email,
        password::{hash_password, verify_password},
    },
};

/// Wrong answers a PIN challenge survives. The next wrong answer deletes it.
pub const MAX_PIN_ATTEMPTS: u32 = 5;

/// An outstanding PIN challenge, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinChallengeCore {
    pub email: Email,
    /// Argon2 hash of the PIN that was sent.
    pub code_hash: String,
    /// Wrong answers so far.
    pub attempts: u32,
    /// A TTL index removes the document some time after this.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub expires_at: DateTime<Utc>,
}

impl PinChallengeCore {
    /// A challenge for `code`, answerable for `ttl`.
    pub fn new(email: Email, code: &Code, ttl: Duration) -> Result<Self, argon2::Error> {
        Ok(Self {
            email,
            code_hash: hash_password(&code.to_string())?,
            attempts: 0,
            expires_at: Utc::now() + ttl,
        })
    }

    pub fn matches(&self, code: &Code) -> bool {
        verify_password(&self.code_hash, &code.to_string())
    }

    /// Can this challenge still be answered?
    pub fn is_live(&self) -> bool {
        self.attempts < MAX_PIN_ATTEMPTS && Utc::now() < self.expires_at
    }
}

/// A PIN challenge without an ID.
pub type NewPinChallenge = PinChallengeCore;

with_id! {
    /// A PIN challenge from the database, with its unique ID.
    PinChallenge { challenge: PinChallengeCore }
}
