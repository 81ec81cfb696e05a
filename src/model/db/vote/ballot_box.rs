use std::collections::HashMap;

use chrono::Utc;
use mongodb::{
    bson::doc,
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::FindOptions,
    Client, Database,
};
use rocket::{
    futures::TryStreamExt,
    request::{self, FromRequest, Request},
    tokio::time::{sleep, Duration},
    State,
};

use crate::error::{Error, Result};
use crate::model::{
    ballot::{Ballot, BallotError},
    common::{candidate::CandidateStatus, choice::Choice},
    db::{candidate::Candidate, election::Election, position::Position, voter::Voter},
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::{NewVotingSession, Vote};

/// How many times a transaction is attempted before a transient error is given up on.
const MAX_ATTEMPTS: u64 = 20;
/// How many times an unknown commit result is retried within one attempt.
const MAX_COMMIT_RETRIES: u32 = 3;

/// Records ballots and answers whether a voter has voted.
///
/// Casting is atomic per (voter, election): the voting session and all vote rows
/// are written in a single transaction, and the unique index on voting sessions
/// guarantees that only one of any number of concurrent casts commits.
#[derive(Clone)]
pub struct BallotBox {
    client: Client,
    db: Database,
}

impl BallotBox {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }

    /// Cast a ballot for `voter_id` in `election_id`, returning the recorded votes.
    ///
    /// Fails with [`Error::AlreadyVoted`] if the voter already has a ballot in this
    /// election, in which case nothing is written.
    pub async fn cast(
        &self,
        voter_id: Option<Id>,
        election_id: Id,
        selections: HashMap<Id, Choice>,
    ) -> Result<Vec<Vote>> {
        // Cheap checks first: no queries for a request that can never succeed.
        let voter_id = voter_id.ok_or(BallotError::MissingVoter)?;
        let ballot = Ballot::new(election_id, selections)?;

        let voter = Coll::<Voter>::from_db(&self.db)
            .find_one(voter_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Voter {voter_id}")))?;
        let election = Coll::<Election>::from_db(&self.db)
            .find_one(election_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
        let positions: Vec<Position> = Coll::<Position>::from_db(&self.db)
            .find(doc! { "election_id": election_id }, None)
            .await?
            .try_collect()
            .await?;
        let candidates: Vec<Candidate> = Coll::<Candidate>::from_db(&self.db)
            .find(
                doc! { "election_id": election_id, "status": CandidateStatus::Approved },
                None,
            )
            .await?
            .try_collect()
            .await?;

        ballot.check(&voter, &election, &positions, &candidates, Utc::now())?;

        let votes = ballot.into_votes(voter_id);
        self.record(&NewVotingSession::new(voter_id, election_id), &votes)
            .await?;
        info!(
            "Voter {voter_id} cast {} vote(s) in election {election_id}",
            votes.len()
        );

        mark_voted(&Coll::from_db(&self.db), voter_id).await;

        Ok(votes)
    }

    /// The votes the voter has recorded in the election, ordered by position.
    /// Empty if they have not voted.
    pub async fn status(&self, voter_id: Id, election_id: Id) -> Result<Vec<Vote>> {
        let filter = doc! {
            "user_id": voter_id,
            "election_id": election_id,
        };
        let options = FindOptions::builder()
            .sort(doc! { "position_id": 1 })
            .build();
        let votes = Coll::<Vote>::from_db(&self.db)
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(votes)
    }

    /// Write the session and the votes in one transaction, retrying transient failures.
    async fn record(&self, session: &NewVotingSession, votes: &[Vote]) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_record(session, votes).await {
                Ok(()) => return Ok(()),
                Err(err) if is_duplicate_key_error(&err) => return Err(Error::AlreadyVoted),
                Err(err)
                    if attempt < MAX_ATTEMPTS && err.contains_label(TRANSIENT_TRANSACTION_ERROR) =>
                {
                    debug!(
                        "Transient error recording ballot of voter {} (attempt {attempt}): {err}",
                        session.user_id
                    );
                    sleep(Duration::from_millis((10 * attempt).min(200))).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn try_record(
        &self,
        session: &NewVotingSession,
        votes: &[Vote],
    ) -> std::result::Result<(), DbError> {
        let mut db_session = self.client.start_session(None).await?;
        db_session.start_transaction(None).await?;

        Coll::<NewVotingSession>::from_db(&self.db)
            .insert_one_with_session(session, None, &mut db_session)
            .await?;
        Coll::<Vote>::from_db(&self.db)
            .insert_many_with_session(votes, None, &mut db_session)
            .await?;

        let mut retries = 0;
        loop {
            match db_session.commit_transaction().await {
                Ok(()) => return Ok(()),
                Err(err)
                    if retries < MAX_COMMIT_RETRIES
                        && err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) =>
                {
                    retries += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Set the voter's `has_voted` flag after their ballot has been committed.
///
/// The flag is only a cache of the voting session, so a failure is logged and
/// left for the reconciler to repair. Returns whether the flag was written.
pub(super) async fn mark_voted(voters: &Coll<Voter>, voter_id: Id) -> bool {
    let set_flag = voters
        .update_one(
            voter_id.as_doc(),
            doc! { "$set": { "has_voted": true } },
            None,
        )
        .await;
    match set_flag {
        Ok(_) => true,
        Err(err) => {
            warn!("Failed to set has_voted for voter {voter_id}: {err}");
            false
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BallotBox {
    type Error = ();

    /// Build a ballot box from the managed database connection.
    ///
    /// Panics iff the [`Client`] or [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let client = req.guard::<&State<Client>>().await.unwrap();
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(BallotBox::new(client.inner().clone(), db.inner().clone()))
    }
}

#[cfg(test)]
mod tests {
    use rocket::{local::asynchronous::Client, tokio};

    use super::*;
    use crate::model::db::{
        candidate::NewCandidate,
        election::NewElection,
        position::NewPosition,
        vote::VotingSession,
        voter::NewVoter,
    };

    /// An ongoing election with a required and an optional position, two approved
    /// candidates each, and a registered voter.
    struct Seeded {
        voter: Voter,
        election: Election,
        positions: Vec<Position>,
        candidates: Vec<Candidate>,
    }

    impl Seeded {
        fn full_ballot(&self) -> HashMap<Id, Choice> {
            HashMap::from_iter(vec![
                (self.positions[0].id, Choice::Candidate(self.candidates[0].id)),
                (self.positions[1].id, Choice::Candidate(self.candidates[2].id)),
            ])
        }
    }

    async fn seed(db: &Database, election: NewElection) -> Seeded {
        let voter = Voter {
            id: Id::new(),
            voter: NewVoter::example(),
        };
        Coll::<Voter>::from_db(db)
            .insert_one(&voter, None)
            .await
            .unwrap();

        let election = Election {
            id: Id::new(),
            election,
        };
        Coll::<Election>::from_db(db)
            .insert_one(&election, None)
            .await
            .unwrap();

        let positions = vec![
            Position {
                id: Id::new(),
                position: NewPosition::example(election.id),
            },
            Position {
                id: Id::new(),
                position: NewPosition::example_optional(election.id),
            },
        ];
        Coll::<Position>::from_db(db)
            .insert_many(&positions, None)
            .await
            .unwrap();

        let mut candidates = Vec::new();
        for position in &positions {
            for i in 0..2 {
                candidates.push(Candidate {
                    id: Id::new(),
                    candidate: NewCandidate::example(position, i),
                });
            }
        }
        Coll::<Candidate>::from_db(db)
            .insert_many(&candidates, None)
            .await
            .unwrap();

        Seeded {
            voter,
            election,
            positions,
            candidates,
        }
    }

    fn ballot_box(client: &Client, db: &Database) -> BallotBox {
        let mongo = client.rocket().state::<mongodb::Client>().unwrap();
        BallotBox::new(mongo.clone(), db.clone())
    }

    async fn count(db: &Database, voter_id: Id, election_id: Id) -> (u64, u64) {
        let filter = doc! { "user_id": voter_id, "election_id": election_id };
        let sessions = Coll::<VotingSession>::from_db(db)
            .count_documents(filter.clone(), None)
            .await
            .unwrap();
        let votes = Coll::<Vote>::from_db(db)
            .count_documents(filter, None)
            .await
            .unwrap();
        (sessions, votes)
    }

    #[backend_test]
    async fn cast_records_votes_and_flag(client: Client, db: Database, voters: Coll<Voter>) {
        let seeded = seed(&db, NewElection::ongoing_example()).await;
        let ballot_box = ballot_box(&client, &db);

        let votes = ballot_box
            .cast(Some(seeded.voter.id), seeded.election.id, seeded.full_ballot())
            .await
            .unwrap();
        assert_eq!(votes.len(), 2);

        assert_eq!(count(&db, seeded.voter.id, seeded.election.id).await, (1, 2));
        let voter = voters
            .find_one(seeded.voter.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert!(voter.has_voted);

        let status = ballot_box
            .status(seeded.voter.id, seeded.election.id)
            .await
            .unwrap();
        assert_eq!(status, votes);
    }

    #[backend_test]
    async fn flag_failure_keeps_the_ballot(client: Client, db: Database, voters: Coll<Voter>) {
        let seeded = seed(&db, NewElection::ongoing_example()).await;
        // Make every write of `has_voted: true` fail document validation.
        db.run_command(
            doc! {
                "collMod": "voters",
                "validator": { "has_voted": { "$ne": true } },
                "validationLevel": "strict",
                "validationAction": "error",
            },
            None,
        )
        .await
        .unwrap();
        assert!(!mark_voted(&voters, seeded.voter.id).await);

        let votes = ballot_box(&client, &db)
            .cast(Some(seeded.voter.id), seeded.election.id, seeded.full_ballot())
            .await
            .unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(count(&db, seeded.voter.id, seeded.election.id).await, (1, 2));

        let voter = voters
            .find_one(seeded.voter.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert!(!voter.has_voted);
    }

    #[backend_test]
    async fn second_cast_is_rejected(client: Client, db: Database) {
        let seeded = seed(&db, NewElection::ongoing_example()).await;
        let ballot_box = ballot_box(&client, &db);

        ballot_box
            .cast(Some(seeded.voter.id), seeded.election.id, seeded.full_ballot())
            .await
            .unwrap();

        // A different, otherwise valid ballot is still a second ballot.
        let mut other = seeded.full_ballot();
        other.insert(seeded.positions[0].id, Choice::Candidate(seeded.candidates[1].id));
        let err = ballot_box
            .cast(Some(seeded.voter.id), seeded.election.id, other)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted));

        assert_eq!(count(&db, seeded.voter.id, seeded.election.id).await, (1, 2));
        let status = ballot_box
            .status(seeded.voter.id, seeded.election.id)
            .await
            .unwrap();
        assert_eq!(status[0].candidate_id, Some(seeded.candidates[0].id));
    }

    #[backend_test]
    async fn concurrent_casts_record_exactly_one(client: Client, db: Database) {
        let seeded = seed(&db, NewElection::ongoing_example()).await;
        let ballot_box = ballot_box(&client, &db);

        let handles = (0..8)
            .map(|_| {
                let ballot_box = ballot_box.clone();
                let ballot = seeded.full_ballot();
                let voter_id = seeded.voter.id;
                let election_id = seeded.election.id;
                tokio::spawn(async move { ballot_box.cast(Some(voter_id), election_id, ballot).await })
            })
            .collect::<Vec<_>>();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(Error::AlreadyVoted) => {}
                Err(err) => panic!("Unexpected error: {err}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(count(&db, seeded.voter.id, seeded.election.id).await, (1, 2));
    }

    #[backend_test]
    async fn invalid_ballots_write_nothing(client: Client, db: Database) {
        let seeded = seed(&db, NewElection::ongoing_example()).await;
        let ballot_box = ballot_box(&client, &db);

        let err = ballot_box
            .cast(None, seeded.election.id, seeded.full_ballot())
            .await
            .unwrap_err();
        assert_eq!(err.status(), rocket::http::Status::BadRequest);

        let err = ballot_box
            .cast(Some(seeded.voter.id), seeded.election.id, HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), rocket::http::Status::BadRequest);

        let err = ballot_box
            .cast(Some(seeded.voter.id), Id::new(), seeded.full_ballot())
            .await
            .unwrap_err();
        assert_eq!(err.status(), rocket::http::Status::NotFound);

        let mut missing_required = seeded.full_ballot();
        missing_required.remove(&seeded.positions[0].id);
        let err = ballot_box
            .cast(Some(seeded.voter.id), seeded.election.id, missing_required)
            .await
            .unwrap_err();
        assert_eq!(err.status(), rocket::http::Status::BadRequest);

        assert_eq!(count(&db, seeded.voter.id, seeded.election.id).await, (0, 0));
    }

    #[backend_test]
    async fn closed_elections_reject_ballots(client: Client, db: Database) {
        let seeded = seed(&db, NewElection::ended_example()).await;
        let ballot_box = ballot_box(&client, &db);

        let err = ballot_box
            .cast(Some(seeded.voter.id), seeded.election.id, seeded.full_ballot())
            .await
            .unwrap_err();
        assert_eq!(err.status(), rocket::http::Status::BadRequest);
        assert_eq!(count(&db, seeded.voter.id, seeded.election.id).await, (0, 0));
    }

    #[backend_test]
    async fn status_is_per_voter_and_election(client: Client, db: Database) {
        let seeded = seed(&db, NewElection::ongoing_example()).await;
        let ballot_box = ballot_box(&client, &db);

        let status = ballot_box
            .status(seeded.voter.id, seeded.election.id)
            .await
            .unwrap();
        assert!(status.is_empty());

        ballot_box
            .cast(Some(seeded.voter.id), seeded.election.id, seeded.full_ballot())
            .await
            .unwrap();

        let other_voter = ballot_box
            .status(Id::new(), seeded.election.id)
            .await
            .unwrap();
        assert!(other_voter.is_empty());
        let other_election = ballot_box
            .status(seeded.voter.id, Id::new())
            .await
            .unwrap();
        assert!(other_election.is_empty());
    }
}
