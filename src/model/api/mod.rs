//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Vote submission and status use camelCase keys; everything else uses snake_case.

pub mod admin;
pub mod auth;
pub mod candidate;
pub mod election;
pub mod id;
pub mod otp;
pub mod pagination;
pub mod position;
pub mod post;
pub mod vote;
pub mod voter;
