use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::IntoOutcome,
    request::{self, FromRequest},
    Request,
};
use thiserror::Error;

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    common::email::Email,
    db::challenge::{PinChallenge, MAX_PIN_ATTEMPTS},
    mongodb::{Coll, Id},
};

use super::code::Code;

pub const CHALLENGE_COOKIE: &str = "challenge";

/// The PIN challenge a client is answering.
///
/// The cookie only names the stored [`PinChallenge`]; the PIN hash and the
/// count of wrong answers stay on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    pub id: Id,
}

impl Challenge {
    /// Encode into a cookie that lapses after the configured PIN lifetime.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        Cookie::build(CHALLENGE_COOKIE, self.id.to_string())
            .max_age(rocket::time::Duration::seconds(
                config.otp_ttl().num_seconds(),
            ))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    pub fn from_cookie(cookie: &Cookie<'_>) -> Option<Self> {
        cookie.value().parse().ok().map(|id| Self { id })
    }

    /// Check an answer, returning the challenged email if it is right.
    ///
    /// A right answer consumes the challenge. Every wrong answer is counted,
    /// and the challenge is deleted once [`MAX_PIN_ATTEMPTS`] have been used.
    pub async fn answer(
        &self,
        challenges: &Coll<PinChallenge>,
        code: &Code,
    ) -> Result<Email, ChallengeError> {
        let challenge = challenges
            .find_one(self.id.as_doc(), None)
            .await?
            .filter(|challenge| challenge.is_live())
            .ok_or(ChallengeError::Missing)?;

        if challenge.matches(code) {
            // A concurrent answer may already have used it.
            let consumed = challenges.delete_one(self.id.as_doc(), None).await?;
            return if consumed.deleted_count == 1 {
                Ok(challenge.challenge.email)
            } else {
                Err(ChallengeError::Missing)
            };
        }

        let counted = challenges
            .find_one_and_update(
                doc! { "_id": self.id, "attempts": { "$lt": MAX_PIN_ATTEMPTS } },
                doc! { "$inc": { "attempts": 1 } },
                FindOneAndUpdateOptions::builder()
                    .return_document(ReturnDocument::After)
                    .build(),
            )
            .await?;
        match counted {
            Some(challenge) if challenge.attempts < MAX_PIN_ATTEMPTS => {
                Err(ChallengeError::Incorrect)
            }
            _ => {
                challenges.delete_one(self.id.as_doc(), None).await?;
                warn!("PIN challenge for {} used up", challenge.email);
                Err(ChallengeError::TooManyAttempts)
            }
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Challenge {
    type Error = ChallengeError;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        req.cookies()
            .get_private(CHALLENGE_COOKIE)
            .and_then(|cookie| Challenge::from_cookie(&cookie))
            .into_outcome((Status::Unauthorized, ChallengeError::Missing))
    }
}

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("No PIN has been requested, or it has expired")]
    Missing,
    #[error("Incorrect PIN")]
    Incorrect,
    #[error("Too many incorrect PINs; request a new one")]
    TooManyAttempts,
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ChallengeError> for Error {
    fn from(err: ChallengeError) -> Self {
        match err {
            ChallengeError::Db(err) => Self::Db(err),
            err => Self::Status(Status::Unauthorized, err.to_string()),
        }
    }
}
