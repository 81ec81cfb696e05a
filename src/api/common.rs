use mongodb::{bson::doc, options::FindOptions};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    api::{candidate::CandidateDescription, position::PositionDescription},
    common::candidate::CandidateStatus,
    db::{candidate::Candidate, election::Election, position::Position},
    mongodb::{Coll, Id},
};

/// Fetch an election, or 404.
pub async fn election_by_id(elections: &Coll<Election>, election_id: Id) -> Result<Election> {
    elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))
}

/// Fetch a position, or 404 if it does not exist or belongs to another election.
pub async fn position_in_election(
    positions: &Coll<Position>,
    election_id: Id,
    position_id: Id,
) -> Result<Position> {
    let filter = doc! {
        "_id": position_id,
        "election_id": election_id,
    };
    positions
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Position {position_id} in election {election_id}")))
}

/// Positions of an election with their approved candidates, as shown on the ballot.
pub async fn ballot_positions(
    positions: &Coll<Position>,
    candidates: &Coll<Candidate>,
    election_id: Id,
) -> Result<Vec<PositionDescription>> {
    let by_id = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let positions: Vec<Position> = positions
        .find(doc! { "election_id": election_id }, by_id)
        .await?
        .try_collect()
        .await?;

    let by_name = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let filter = doc! {
        "election_id": election_id,
        "status": CandidateStatus::Approved,
    };
    let approved: Vec<Candidate> = candidates.find(filter, by_name).await?.try_collect().await?;

    Ok(positions
        .into_iter()
        .map(|position| {
            let running = approved
                .iter()
                .filter(|c| c.position_id == position.id)
                .cloned()
                .map(CandidateDescription::from)
                .collect();
            PositionDescription::new(position, running)
        })
        .collect())
}

/// Number of candidates still in the running for a position.
pub async fn active_candidate_count(candidates: &Coll<Candidate>, position_id: Id) -> Result<u64> {
    let filter = doc! {
        "position_id": position_id,
        "status": { "$ne": CandidateStatus::Disqualified },
    };
    Ok(candidates.count_documents(filter, None).await?)
}

/// Reject a new candidate for a position that already has its maximum.
pub async fn check_capacity(candidates: &Coll<Candidate>, position: &Position) -> Result<()> {
    let count = active_candidate_count(candidates, position.id).await?;
    if count >= u64::from(position.max_candidates) {
        return Err(Error::bad_request(format!(
            "Position '{}' already has its maximum of {} candidates",
            position.title, position.max_candidates
        )));
    }
    Ok(())
}
