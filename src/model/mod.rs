//! Data types, split by where they live: the database, the API, or both.

pub mod api;
pub mod ballot;
pub mod common;
pub mod db;
pub mod mongodb;
