use rocket::{http::Status, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::logging::RequestTrace;
use crate::model::{
    api::{
        auth::AuthToken,
        vote::{SubmitVotesRequest, SubmitVotesResponse, VoteStatus},
    },
    ballot::BallotError,
    db::{vote::BallotBox, voter::Voter},
    mongodb::Id,
};

pub fn routes() -> Vec<Route> {
    routes![submit_votes, vote_status]
}

/// The `electionId` query of a status check.
#[derive(Debug, FromForm)]
struct StatusQuery {
    #[field(name = "electionId")]
    election_id: Id,
}

/// Cast the logged-in voter's ballot for one election.
///
/// A `userId` in the body is accepted for compatibility but must match the session.
#[post("/voter/votes", data = "<request>", format = "json")]
async fn submit_votes(
    token: Option<AuthToken<Voter>>,
    request: Json<SubmitVotesRequest>,
    ballot_box: BallotBox,
    trace: RequestTrace,
) -> Result<Json<SubmitVotesResponse>> {
    let voter_id = token.map(|token| token.id);
    if let (Some(claimed), Some(voter_id)) = (request.user_id, voter_id) {
        if *claimed != voter_id {
            return Err(Error::Status(
                Status::Unauthorized,
                "userId does not match the logged-in voter".to_string(),
            ));
        }
    }

    let election_id: Id = request.election_id.into();
    let votes = ballot_box
        .cast(voter_id, election_id, request.selections())
        .await?;
    debug!(
        "{trace} recorded {} votes in election {election_id} after {}ms",
        votes.len(),
        trace.elapsed().as_millis()
    );
    Ok(Json(SubmitVotesResponse::new(votes)))
}

/// Whether the logged-in voter has voted in an election, and their recorded votes.
#[get("/voter/votes?<query..>")]
async fn vote_status(
    token: Option<AuthToken<Voter>>,
    query: StatusQuery,
    ballot_box: BallotBox,
) -> Result<Json<VoteStatus>> {
    let voter_id = token
        .map(|token| token.id)
        .ok_or(BallotError::MissingVoter)?;
    let votes = ballot_box.status(voter_id, query.election_id).await?;
    Ok(Json(votes.into()))
}
