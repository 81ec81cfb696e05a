//! Types shared between the API and DB representations.

pub mod candidate;
pub mod choice;
pub mod election;
pub mod email;
pub mod password;
