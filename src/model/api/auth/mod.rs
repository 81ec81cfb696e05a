mod request;
mod token;
mod user;

pub use request::{PasswordRequest, VoterChallengeRequest, VoterLoginRequest, VoterVerifyRequest};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Rights, User};
