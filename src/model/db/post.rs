use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

/// An announcement published by an admin.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PostCore {
    pub title: String,
    pub body: String,
    /// Username of the publishing admin.
    pub author: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A post without an ID.
pub type NewPost = PostCore;

with_id! {
    /// A post from the database, with its unique ID.
    Post { post: PostCore }
}
