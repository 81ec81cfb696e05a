use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::AuthToken,
        candidate::CandidateDescription,
        election::{ElectionDescription, ElectionResults, ElectionSummary},
    },
    common::{
        candidate::CandidateStatus,
        election::{ElectionLevel, ElectionStatus},
    },
    db::{
        admin::Admin, candidate::Candidate, election::Election, position::Position, vote::Vote,
    },
    mongodb::{Coll, Id},
};

use super::common::{ballot_positions, election_by_id, position_in_election};

pub fn routes() -> Vec<Route> {
    routes![elections, election, position_candidates, election_results]
}

/// All elections, most recent first, optionally only those of one level.
#[get("/elections?<level>")]
async fn elections(
    level: Option<ElectionLevel>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionSummary>>> {
    let filter = level.map(|level| doc! { "level": level });
    let newest_first = FindOptions::builder()
        .sort(doc! { "start_time": -1, "_id": -1 })
        .build();
    let summaries: Vec<ElectionSummary> = elections
        .find(filter, newest_first)
        .await?
        .map_ok(ElectionSummary::from)
        .try_collect()
        .await?;
    Ok(Json(summaries))
}

#[get("/elections/<election_id>")]
async fn election(
    election_id: Id,
    elections: Coll<Election>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionDescription>> {
    let election = election_by_id(&elections, election_id).await?;
    let positions = ballot_positions(&positions, &candidates, election_id).await?;
    Ok(Json(ElectionDescription::new(election, positions)))
}

/// The approved candidates running for a position.
#[get("/elections/<election_id>/positions/<position_id>/candidates")]
async fn position_candidates(
    election_id: Id,
    position_id: Id,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDescription>>> {
    position_in_election(&positions, election_id, position_id).await?;
    let filter = doc! {
        "position_id": position_id,
        "status": CandidateStatus::Approved,
    };
    let by_name = FindOptions::builder().sort(doc! { "name": 1 }).build();
    let running: Vec<CandidateDescription> = candidates
        .find(filter, by_name)
        .await?
        .map_ok(CandidateDescription::from)
        .try_collect()
        .await?;
    Ok(Json(running))
}

/// Tallied results. Admins may watch them live; everyone else waits until voting closes.
#[get("/elections/<election_id>/results")]
async fn election_results(
    election_id: Id,
    admin: Option<AuthToken<Admin>>,
    elections: Coll<Election>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<ElectionResults>> {
    let election = election_by_id(&elections, election_id).await?;
    if admin.is_none() && election.status() != ElectionStatus::Ended {
        return Err(Error::Status(
            Status::Forbidden,
            "Results are available once voting has closed".to_string(),
        ));
    }

    let for_election = doc! { "election_id": election_id };
    let by_id = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let positions: Vec<Position> = positions
        .find(for_election.clone(), by_id)
        .await?
        .try_collect()
        .await?;
    let approved = doc! {
        "election_id": election_id,
        "status": CandidateStatus::Approved,
    };
    let candidates: Vec<Candidate> = candidates.find(approved, None).await?.try_collect().await?;
    let votes: Vec<Vote> = votes.find(for_election, None).await?.try_collect().await?;

    Ok(Json(ElectionResults::tally(
        &election,
        &positions,
        &candidates,
        &votes,
    )))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::Status,
        local::asynchronous::Client,
        serde::json::serde_json,
    };

    use crate::model::db::{
        candidate::NewCandidate,
        election::NewElection,
        position::NewPosition,
        vote::NewVote,
    };

    use super::*;

    async fn insert_election(db: &Database, election: NewElection) -> Election {
        let election = Election {
            id: Id::new(),
            election,
        };
        Coll::<Election>::from_db(db)
            .insert_one(&election, None)
            .await
            .unwrap();
        election
    }

    async fn insert_position(db: &Database, election: &Election) -> Position {
        let position = Position {
            id: Id::new(),
            position: NewPosition::example(election.id),
        };
        Coll::<Position>::from_db(db)
            .insert_one(&position, None)
            .await
            .unwrap();
        position
    }

    async fn insert_candidate(
        db: &Database,
        position: &Position,
        i: usize,
        status: CandidateStatus,
    ) -> Candidate {
        let mut candidate = Candidate {
            id: Id::new(),
            candidate: NewCandidate::example(position, i),
        };
        candidate.status = status;
        Coll::<Candidate>::from_db(db)
            .insert_one(&candidate, None)
            .await
            .unwrap();
        candidate
    }

    async fn get_json<T: serde::de::DeserializeOwned>(client: &Client, uri: String) -> T {
        let response = client.get(uri).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap()
    }

    #[backend_test]
    async fn list_and_filter_elections(client: Client, db: Database) {
        let university = insert_election(&db, NewElection::ongoing_example()).await;
        let upcoming = insert_election(&db, NewElection::upcoming_example()).await;
        let organization = insert_election(&db, NewElection::organization_example()).await;

        let all: Vec<ElectionSummary> = get_json(&client, "/elections".to_string()).await;
        assert_eq!(all.len(), 3);
        // Newest start first.
        assert_eq!(*all[0].id, upcoming.id);
        assert_eq!(all[0].status, ElectionStatus::Upcoming);

        let only_org: Vec<ElectionSummary> =
            get_json(&client, "/elections?level=organization".to_string()).await;
        assert_eq!(only_org.len(), 1);
        assert_eq!(*only_org[0].id, organization.id);

        let only_uni: Vec<ElectionSummary> =
            get_json(&client, "/elections?level=university".to_string()).await;
        assert_eq!(only_uni.len(), 2);
        assert!(only_uni.iter().any(|e| *e.id == university.id));
    }

    #[backend_test]
    async fn election_shows_only_approved_candidates(client: Client, db: Database) {
        let election = insert_election(&db, NewElection::upcoming_example()).await;
        let position = insert_position(&db, &election).await;
        let approved = insert_candidate(&db, &position, 0, CandidateStatus::Approved).await;
        insert_candidate(&db, &position, 1, CandidateStatus::Pending).await;
        insert_candidate(&db, &position, 2, CandidateStatus::Disqualified).await;

        let description: ElectionDescription =
            get_json(&client, uri!(election(election.id)).to_string()).await;
        assert_eq!(*description.summary.id, election.id);
        assert_eq!(description.positions.len(), 1);
        let shown = &description.positions[0].candidates;
        assert_eq!(shown.len(), 1);
        assert_eq!(*shown[0].id, approved.id);

        let running: Vec<CandidateDescription> = get_json(
            &client,
            uri!(position_candidates(election.id, position.id)).to_string(),
        )
        .await;
        assert_eq!(running, shown.clone());

        let response = client.get(uri!(election(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        // The position must belong to the election in the path.
        let other = insert_election(&db, NewElection::upcoming_example()).await;
        let response = client
            .get(uri!(position_candidates(other.id, position.id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    async fn voted_election(db: &Database, election: NewElection) -> (Election, Candidate) {
        let election = insert_election(db, election).await;
        let position = insert_position(db, &election).await;
        let winner = insert_candidate(db, &position, 0, CandidateStatus::Approved).await;
        let votes = (0..3)
            .map(|_| NewVote {
                user_id: Id::new(),
                election_id: election.id,
                position_id: position.id,
                candidate_id: Some(winner.id),
            })
            .collect::<Vec<_>>();
        Coll::<NewVote>::from_db(db)
            .insert_many(votes, None)
            .await
            .unwrap();
        (election, winner)
    }

    #[backend_test]
    async fn results_wait_for_the_end(client: Client, db: Database) {
        let (ongoing, _) = voted_election(&db, NewElection::ongoing_example()).await;
        let response = client
            .get(uri!(election_results(ongoing.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        let (ended, winner) = voted_election(&db, NewElection::ended_example()).await;
        let results: ElectionResults =
            get_json(&client, uri!(election_results(ended.id)).to_string()).await;
        assert_eq!(results.status, ElectionStatus::Ended);
        assert_eq!(results.turnout, 3);
        assert_eq!(results.positions[0].tallies[0].votes, 3);
        assert_eq!(results.positions[0].winners.len(), 1);
        assert_eq!(*results.positions[0].winners[0], winner.id);
    }

    #[backend_test(admin)]
    async fn admins_see_live_results(client: Client, db: Database) {
        let (ongoing, winner) = voted_election(&db, NewElection::ongoing_example()).await;
        let results: ElectionResults =
            get_json(&client, uri!(election_results(ongoing.id)).to_string()).await;
        assert_eq!(results.status, ElectionStatus::Ongoing);
        assert_eq!(*results.positions[0].tallies[0].candidate_id, winner.id);
    }
}
