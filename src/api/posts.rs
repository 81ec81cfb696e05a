use chrono::Utc;
use mongodb::{
    bson::{doc, Bson},
    options::FindOptions,
    Client,
};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Rights, User},
        pagination::{Paginated, Pagination},
        post::{CommentSpec, CommentThread, PostDescription, PostSpec, PostWithComments},
    },
    db::{
        admin::Admin,
        comment::{Comment, NewComment},
        post::Post,
        voter::Voter,
    },
    mongodb::{Coll, Id},
};

pub fn routes() -> Vec<Route> {
    routes![
        list_posts,
        get_post,
        create_post,
        delete_post,
        add_comment,
        delete_comment,
    ]
}

#[get("/posts")]
async fn list_posts(
    pagination: Pagination,
    posts: Coll<Post>,
) -> Result<Json<Paginated<PostDescription>>> {
    let total = posts.count_documents(None, None).await?;
    let newest_first = FindOptions::builder()
        .sort(doc! { "created_at": -1, "_id": -1 })
        .skip(pagination.skip())
        .limit(pagination.page_size() as i64)
        .build();
    let page: Vec<PostDescription> = posts
        .find(None, newest_first)
        .await?
        .map_ok(PostDescription::from)
        .try_collect()
        .await?;
    Ok(Json(pagination.result(page, total)))
}

#[get("/posts/<post_id>")]
async fn get_post(
    post_id: Id,
    posts: Coll<Post>,
    comments: Coll<Comment>,
) -> Result<Json<PostWithComments>> {
    let post = post_by_id(&posts, post_id).await?;
    let comments: Vec<Comment> = comments
        .find(doc! { "post_id": post_id }, None)
        .await?
        .try_collect()
        .await?;
    Ok(Json(PostWithComments {
        post: post.into(),
        comments: CommentThread::build(comments),
    }))
}

#[post("/posts", data = "<spec>", format = "json")]
async fn create_post(
    token: AuthToken<Admin>,
    spec: Json<PostSpec>,
    admins: Coll<Admin>,
    posts: Coll<Post>,
) -> Result<Json<PostDescription>> {
    spec.validate().map_err(Error::bad_request)?;
    let admin = admins
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Admin {}", token.id)))?;

    let post = Post {
        id: Id::new(),
        post: spec.into_inner().into_post(admin.display_name()),
    };
    posts.insert_one(&post, None).await?;
    Ok(Json(post.into()))
}

/// Delete a post together with all of its comments.
#[delete("/posts/<post_id>")]
async fn delete_post(
    _token: AuthToken<Admin>,
    post_id: Id,
    posts: Coll<Post>,
    comments: Coll<Comment>,
    db_client: &State<Client>,
) -> Result<()> {
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    let result = posts
        .delete_one_with_session(post_id.as_doc(), None, &mut session)
        .await?;
    if result.deleted_count == 0 {
        session.abort_transaction().await?;
        return Err(Error::not_found(format!("Post {post_id}")));
    }
    comments
        .delete_many_with_session(doc! { "post_id": post_id }, None, &mut session)
        .await?;

    session.commit_transaction().await?;
    Ok(())
}

/// Comment on a post as whoever is logged in, admin or voter.
#[post("/posts/<post_id>/comments", data = "<spec>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn add_comment(
    post_id: Id,
    spec: Json<CommentSpec>,
    voter: Option<AuthToken<Voter>>,
    admin: Option<AuthToken<Admin>>,
    posts: Coll<Post>,
    comments: Coll<Comment>,
    voters: Coll<Voter>,
    admins: Coll<Admin>,
) -> Result<Json<CommentThread>> {
    let (author_id, author_rights, author_name) = match (admin, voter) {
        (Some(token), _) => (token.id, Rights::Admin, author_name(&admins, token.id).await?),
        (None, Some(token)) => (token.id, Rights::Voter, author_name(&voters, token.id).await?),
        (None, None) => {
            return Err(Error::Status(
                Status::Unauthorized,
                "Log in to comment".to_string(),
            ))
        }
    };

    let spec = spec.into_inner();
    if spec.body.trim().is_empty() {
        return Err(Error::bad_request("Comments must not be empty"));
    }
    post_by_id(&posts, post_id).await?;
    let parent_id = spec.parent_id.map(Id::from);
    if let Some(parent_id) = parent_id {
        let filter = doc! { "_id": parent_id, "post_id": post_id };
        if comments.find_one(filter, None).await?.is_none() {
            return Err(Error::bad_request(format!(
                "Comment {parent_id} is not on post {post_id}"
            )));
        }
    }

    let comment = Comment {
        id: Id::new(),
        comment: NewComment {
            post_id,
            parent_id,
            author_id,
            author_rights,
            author_name,
            body: spec.body,
            created_at: Utc::now(),
        },
    };
    comments.insert_one(&comment, None).await?;

    let mut threads = CommentThread::build(vec![comment]);
    threads
        .pop()
        .map(Json)
        .ok_or_else(|| Error::Status(Status::InternalServerError, "Comment lost".to_string()))
}

/// Delete a comment and every reply beneath it. Voters may only delete their own.
#[delete("/comments/<comment_id>")]
async fn delete_comment(
    comment_id: Id,
    voter: Option<AuthToken<Voter>>,
    admin: Option<AuthToken<Admin>>,
    comments: Coll<Comment>,
) -> Result<()> {
    let comment = comments
        .find_one(comment_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Comment {comment_id}")))?;

    let allowed = match (admin, voter) {
        (Some(_), _) => true,
        (None, Some(token)) => {
            comment.author_rights == Rights::Voter && comment.author_id == token.id
        }
        (None, None) => {
            return Err(Error::Status(
                Status::Unauthorized,
                "Log in to delete comments".to_string(),
            ))
        }
    };
    if !allowed {
        return Err(Error::Status(
            Status::Forbidden,
            "You can only delete your own comments".to_string(),
        ));
    }

    // Walk down the reply tree one level at a time.
    let mut doomed = vec![comment.id];
    let mut frontier = vec![comment.id];
    while !frontier.is_empty() {
        let filter = doc! {
            "post_id": comment.post_id,
            "parent_id": { "$in": frontier.iter().copied().map(Bson::from).collect::<Vec<_>>() },
        };
        frontier = comments
            .find(filter, None)
            .await?
            .map_ok(|reply| reply.id)
            .try_collect()
            .await?;
        doomed.extend(&frontier);
    }

    let ids = doomed.into_iter().map(Bson::from).collect::<Vec<_>>();
    let result = comments
        .delete_many(doc! { "_id": { "$in": ids } }, None)
        .await?;
    debug!(
        "Deleted comment {comment_id} and {} replies",
        result.deleted_count.saturating_sub(1)
    );
    Ok(())
}

async fn post_by_id(posts: &Coll<Post>, post_id: Id) -> Result<Post> {
    posts
        .find_one(post_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Post {post_id}")))
}

async fn author_name<U: User>(users: &Coll<U>, id: Id) -> Result<String> {
    users
        .find_one(id.as_doc(), None)
        .await?
        .map(|user| user.display_name())
        .ok_or_else(|| Error::not_found(format!("{} {id}", U::RIGHTS)))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::ContentType,
        local::asynchronous::{Client, LocalResponse},
        serde::json::{serde_json, serde_json::json},
    };

    use crate::model::{api::id::ApiId, db::post::NewPost};

    use super::*;

    async fn insert_posts(db: &Database, count: usize) -> Vec<Post> {
        let start = Utc::now() - chrono::Duration::hours(count as i64);
        let posts = (0..count)
            .map(|i| Post {
                id: Id::new(),
                post: NewPost {
                    title: format!("Announcement {i}"),
                    body: "Polling stations open at 8am.".to_string(),
                    author: "comelec-chair".to_string(),
                    created_at: start + chrono::Duration::hours(i as i64),
                },
            })
            .collect::<Vec<_>>();
        Coll::<Post>::from_db(db)
            .insert_many(&posts, None)
            .await
            .unwrap();
        posts
    }

    async fn comment<'c>(
        client: &'c Client,
        post_id: Id,
        parent_id: Option<Id>,
    ) -> LocalResponse<'c> {
        let spec = CommentSpec {
            body: "See you there!".to_string(),
            parent_id: parent_id.map(ApiId::from),
        };
        client
            .post(uri!(add_comment(post_id)))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await
    }

    async fn comment_id(response: LocalResponse<'_>) -> Id {
        assert_eq!(Status::Ok, response.status());
        let thread: CommentThread =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        thread.id.into()
    }

    #[backend_test]
    async fn posts_are_paginated_newest_first(client: Client, db: Database) {
        let posts = insert_posts(&db, 5).await;

        let response = client.get("/posts?page_num=1&page_size=2").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let page: Paginated<PostDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(*page.items[0].id, posts[4].id);
        assert_eq!(*page.items[1].id, posts[3].id);

        let response = client.get("/posts?page_num=3&page_size=2").dispatch().await;
        let page: Paginated<PostDescription> =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(*page.items[0].id, posts[0].id);

        let response = client.get("/posts?page_size=0").dispatch().await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test(admin)]
    async fn admin_publishes_and_deletes(client: Client, db: Database) {
        let spec = PostSpec {
            title: "Debate schedule".to_string(),
            body: "The presidential debate is on Friday.".to_string(),
        };
        let response = client
            .post(uri!(create_post))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let post: PostDescription =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(post.title, spec.title);
        assert_eq!(post.author, "comelec-chair");

        let post_id: Id = post.id.into();
        comment_id(comment(&client, post_id, None).await).await;

        let response = client.delete(uri!(delete_post(post_id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let remaining = Coll::<Comment>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        let response = client.get(uri!(get_post(post_id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client.delete(uri!(delete_post(post_id))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(voter)]
    async fn voters_cannot_publish(client: Client) {
        let spec = PostSpec {
            title: "Vote for me".to_string(),
            body: "Please.".to_string(),
        };
        let response = client
            .post(uri!(create_post))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(voter)]
    async fn threaded_comments(client: Client, db: Database) {
        let posts = insert_posts(&db, 2).await;
        let post_id = posts[0].id;

        let top = comment_id(comment(&client, post_id, None).await).await;
        let reply = comment_id(comment(&client, post_id, Some(top)).await).await;
        comment_id(comment(&client, post_id, Some(reply)).await).await;

        // Replies must stay on the same post.
        let response = comment(&client, posts[1].id, Some(top)).await;
        assert_eq!(Status::BadRequest, response.status());
        let response = comment(&client, Id::new(), None).await;
        assert_eq!(Status::NotFound, response.status());

        let response = client.get(uri!(get_post(post_id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let post: PostWithComments =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(post.comments.len(), 1);
        let thread = &post.comments[0];
        assert_eq!(*thread.id, top);
        assert_eq!(thread.author_rights, Rights::Voter);
        assert_eq!(*thread.replies[0].id, reply);
        assert_eq!(thread.replies[0].replies.len(), 1);

        // Deleting the top comment takes the whole thread with it.
        let response = client.delete(uri!(delete_comment(top))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let remaining = Coll::<Comment>::from_db(&db)
            .count_documents(None, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[backend_test]
    async fn anonymous_cannot_comment(client: Client, db: Database) {
        let posts = insert_posts(&db, 1).await;
        let response = comment(&client, posts[0].id, None).await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(voter)]
    async fn voters_only_delete_their_own(client: Client, db: Database) {
        let posts = insert_posts(&db, 1).await;
        let theirs = Comment {
            id: Id::new(),
            comment: NewComment {
                post_id: posts[0].id,
                parent_id: None,
                author_id: Id::new(),
                author_rights: Rights::Voter,
                author_name: "Maria Santos".to_string(),
                body: "First!".to_string(),
                created_at: Utc::now(),
            },
        };
        Coll::<Comment>::from_db(&db)
            .insert_one(&theirs, None)
            .await
            .unwrap();

        let response = client.delete(uri!(delete_comment(theirs.id))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());

        let mine = comment_id(comment(&client, posts[0].id, None).await).await;
        let response = client.delete(uri!(delete_comment(mine))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }
}
