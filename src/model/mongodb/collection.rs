use std::ops::Deref;

use std::time::Duration;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    admin::{Admin, NewAdmin},
    candidate::{Candidate, NewCandidate},
    challenge::{NewPinChallenge, PinChallenge},
    comment::{Comment, NewComment},
    election::{Election, NewElection},
    position::{NewPosition, Position},
    post::{NewPost, Post},
    vote::{NewVote, NewVotingSession, Vote, VotingSession},
    voter::{NewVoter, Voter},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

/// Register both the stored and the insertable form of a document with a collection name.
macro_rules! collection {
    ($name:literal: $($ty:ty),+) => {
        $(
            impl MongoCollection for $ty {
                const NAME: &'static str = $name;
            }
        )+
    };
}

collection!("admins": Admin, NewAdmin);
collection!("voters": Voter, NewVoter);
collection!("elections": Election, NewElection);
collection!("positions": Position, NewPosition);
collection!("candidates": Candidate, NewCandidate);
collection!("votes": Vote, NewVote);
collection!("challenges": PinChallenge, NewPinChallenge);
collection!("voting_sessions": VotingSession, NewVotingSession);
collection!("posts": Post, NewPost);
collection!("comments": Comment, NewComment);

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Voter collection.
    let voter_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<Voter>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // Admin collection.
    let admin_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<Admin>::from_db(db)
        .create_index(admin_index, None)
        .await?;

    // Position collection.
    let position_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .build();
    Coll::<Position>::from_db(db)
        .create_index(position_index, None)
        .await?;

    // Candidate collection: one application per person per position.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"position_id": 1, "email": 1})
        .options(unique.clone())
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    // Vote collection: at most one vote per voter per position.
    let vote_index = IndexModel::builder()
        .keys(doc! {"user_id": 1, "election_id": 1, "position_id": 1})
        .options(unique.clone())
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // Voting session collection: at most one voting pass per voter per election.
    let session_index = IndexModel::builder()
        .keys(doc! {"user_id": 1, "election_id": 1})
        .options(unique.clone())
        .build();
    Coll::<VotingSession>::from_db(db)
        .create_index(session_index, None)
        .await?;

    // Comment collection.
    let comment_index = IndexModel::builder()
        .keys(doc! {"post_id": 1, "created_at": 1})
        .build();
    Coll::<Comment>::from_db(db)
        .create_index(comment_index, None)
        .await?;

    // Challenge collection: looked up by email, dropped once expired.
    let challenges = Coll::<PinChallenge>::from_db(db);
    let challenge_email_index = IndexModel::builder().keys(doc! {"email": 1}).build();
    challenges.create_index(challenge_email_index, None).await?;
    let challenge_expiry_index = IndexModel::builder()
        .keys(doc! {"expires_at": 1})
        .options(
            IndexOptions::builder()
                .expire_after(Duration::ZERO)
                .build(),
        )
        .build();
    challenges.create_index(challenge_expiry_index, None).await?;

    Ok(())
}
