use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, serde::json::Json, Catcher, Request};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Message returned to a voter who tries to vote twice in the same election.
pub const ALREADY_VOTED: &str = "You have already voted in this election";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("You have already voted in this election")]
    AlreadyVoted,
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    /// Shorthand for a 404 naming the missing resource.
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    /// Shorthand for a 400 validation failure.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, msg.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) => Status::InternalServerError,
            Self::AlreadyVoted => Status::BadRequest,
            Self::Status(status, _) => *status,
        }
    }
}

/// The JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.class().is_server_error() {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).respond_to(req)
    }
}

/// Error catchers, so requests that never reach a handler still get an [`ErrorBody`].
pub fn catchers() -> Vec<Catcher> {
    catchers![unprocessable, fallback]
}

/// Bodies that parse as JSON but not as the expected request type.
#[catch(422)]
fn unprocessable(req: &Request) -> (Status, Json<ErrorBody>) {
    debug!("Rejected malformed body for {} {}", req.method(), req.uri());
    let body = ErrorBody {
        error: "Malformed request: check the ids, field names and values".to_string(),
    };
    (Status::UnprocessableEntity, Json(body))
}

#[catch(default)]
fn fallback(status: Status, _req: &Request) -> (Status, Json<ErrorBody>) {
    let body = ErrorBody {
        error: status.reason_lossy().to_string(),
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_voted_is_a_bad_request() {
        assert_eq!(Error::AlreadyVoted.status(), Status::BadRequest);
        assert_eq!(Error::AlreadyVoted.to_string(), ALREADY_VOTED);
    }

    #[test]
    fn status_errors_keep_their_message() {
        let err = Error::not_found("Election 42".to_string());
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.to_string(), "Election 42 not found");

        let err = Error::bad_request("Ballot is empty");
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(err.to_string(), "Ballot is empty");
    }

    #[test]
    fn expired_tokens_are_unauthorized() {
        let err = Error::Jwt(JwtErrorKind::ExpiredSignature.into());
        assert_eq!(err.status(), Status::Unauthorized);
        let err = Error::Jwt(JwtErrorKind::InvalidToken.into());
        assert_eq!(err.status(), Status::BadRequest);
    }
}
