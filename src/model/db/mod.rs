//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//!
//! Each document comes in two forms: the `New*` core data without an ID, which
//! is what gets inserted, and the stored form which pairs the core with its `_id`.

/// Define the stored form of a document: its core data flattened next to the `_id`.
macro_rules! with_id {
    ($(#[$meta:meta])* $name:ident { $field:ident: $core:ty }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            #[serde(rename = "_id")]
            pub id: $crate::model::mongodb::Id,
            #[serde(flatten)]
            pub $field: $core,
        }

        impl std::ops::Deref for $name {
            type Target = $core;

            fn deref(&self) -> &Self::Target {
                &self.$field
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.$field
            }
        }
    };
}

pub mod admin;
pub mod candidate;
pub mod challenge;
pub mod comment;
pub mod election;
pub mod position;
pub mod post;
pub mod vote;
pub mod voter;
