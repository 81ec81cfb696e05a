use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{api::auth::Rights, mongodb::Id};

/// A comment on a post, optionally replying to another comment on the same post.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct CommentCore {
    pub post_id: Id,
    /// The comment being replied to, if any.
    pub parent_id: Option<Id>,
    /// ID of the voter or admin who wrote it.
    pub author_id: Id,
    pub author_rights: Rights,
    pub author_name: String,
    pub body: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A comment without an ID.
pub type NewComment = CommentCore;

with_id! {
    /// A comment from the database, with its unique ID.
    Comment { comment: CommentCore }
}
