//! One-time PIN challenges used to prove ownership of an institutional email.

mod challenge;
mod code;

pub use challenge::{Challenge, ChallengeError, CHALLENGE_COOKIE};
pub use code::{Code, CodeError, CODE_LENGTH};
