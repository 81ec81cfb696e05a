use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{auth::Rights, id::ApiId},
    db::{
        comment::Comment,
        post::{Post, PostCore},
    },
    mongodb::Id,
};

/// An announcement, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSpec {
    pub title: String,
    pub body: String,
}

impl PostSpec {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() || self.body.trim().is_empty() {
            return Err("Posts need a title and a body".to_string());
        }
        Ok(())
    }

    pub fn into_post(self, author: String) -> PostCore {
        PostCore {
            title: self.title.trim().to_string(),
            body: self.body,
            author,
            created_at: Utc::now(),
        }
    }
}

/// A post as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDescription {
    pub id: ApiId,
    pub title: String,
    pub body: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for PostDescription {
    fn from(post: Post) -> Self {
        Self {
            id: post.id.into(),
            title: post.post.title,
            body: post.post.body,
            author: post.post.author,
            created_at: post.post.created_at,
        }
    }
}

/// A post together with its comment threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithComments {
    #[serde(flatten)]
    pub post: PostDescription,
    pub comments: Vec<CommentThread>,
}

/// A new comment, optionally replying to another comment on the same post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentSpec {
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<ApiId>,
}

/// A comment and, recursively, its replies in the order they were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentThread {
    pub id: ApiId,
    pub parent_id: Option<ApiId>,
    pub author_id: ApiId,
    pub author_rights: Rights,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Arrange a post's comments into threads.
    ///
    /// Comments whose parent is missing are shown at the top level rather than dropped.
    pub fn build(mut comments: Vec<Comment>) -> Vec<CommentThread> {
        comments.sort_by_key(|c| (c.created_at, c.id));
        let ids = comments.iter().map(|c| c.id).collect::<Vec<_>>();
        let mut children: HashMap<Option<Id>, Vec<Comment>> = HashMap::new();
        for comment in comments {
            let parent = comment.parent_id.filter(|parent| ids.contains(parent));
            children.entry(parent).or_default().push(comment);
        }
        Self::attach(None, &mut children)
    }

    fn attach(parent: Option<Id>, children: &mut HashMap<Option<Id>, Vec<Comment>>) -> Vec<Self> {
        children
            .remove(&parent)
            .unwrap_or_default()
            .into_iter()
            .map(|comment| {
                let replies = Self::attach(Some(comment.id), children);
                let core = comment.comment;
                Self {
                    id: comment.id.into(),
                    parent_id: core.parent_id.map(Into::into),
                    author_id: core.author_id.into(),
                    author_rights: core.author_rights,
                    author_name: core.author_name,
                    body: core.body,
                    created_at: core.created_at,
                    replies,
                }
            })
            .collect()
    }
}
