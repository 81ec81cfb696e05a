use mongodb::{bson::doc, options::FindOptions, Client};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            admin::AdminCredentials,
            auth::AuthToken,
            candidate::{CandidateDescription, CandidateSpec, CandidateStatusUpdate},
            election::{ElectionDescription, ElectionSpec},
            position::{PositionDescription, PositionSpec},
        },
        db::{
            admin::{Admin, NewAdmin},
            candidate::Candidate,
            election::{Election, NewElection},
            position::{NewPosition, Position},
            vote::{Vote, VotingSession},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    scheduled_task::Reconciler,
};

use super::common::{
    active_candidate_count, ballot_positions, check_capacity, election_by_id,
    position_in_election,
};

pub fn routes() -> Vec<Route> {
    routes![
        get_admins,
        create_admin,
        delete_admin,
        create_election,
        modify_election,
        delete_election,
        create_position,
        modify_position,
        delete_position,
        create_candidate,
        all_candidates,
        set_candidate_status,
    ]
}

#[get("/admins")]
async fn get_admins(_token: AuthToken<Admin>, admins: Coll<Admin>) -> Result<Json<Vec<String>>> {
    let admin_names: Vec<String> = admins
        .find(None, None)
        .await?
        .map_ok(|admin| admin.admin.username)
        .try_collect()
        .await?;
    Ok(Json(admin_names))
}

#[post("/admins", data = "<new_admin>", format = "json")]
async fn create_admin(
    _token: AuthToken<Admin>,
    new_admin: Json<AdminCredentials>,
    admins: Coll<NewAdmin>,
) -> Result<()> {
    let admin: NewAdmin = new_admin.into_inner().try_into()?;
    match admins.insert_one(&admin, None).await {
        Ok(_) => {
            info!("Created admin '{}'", admin.username);
            Ok(())
        }
        Err(err) if is_duplicate_key_error(&err) => Err(Error::bad_request(format!(
            "Admin username already in use: {}",
            admin.username
        ))),
        Err(err) => Err(err.into()),
    }
}

#[delete("/admins", data = "<username>", format = "json")]
async fn delete_admin(
    _token: AuthToken<Admin>,
    username: String,
    admins: Coll<Admin>,
) -> Result<()> {
    // Prevent deleting the last admin.
    let count = admins.count_documents(None, None).await?;
    if count == 1 {
        return Err(Error::Status(
            Status::UnprocessableEntity,
            "Cannot delete last admin!".to_string(),
        ));
    }

    let result = admins
        .delete_one(doc! { "username": &username }, None)
        .await?;
    if result.deleted_count == 0 {
        Err(Error::not_found(format!("Admin {username}")))
    } else {
        info!("Deleted admin '{username}'");
        Ok(())
    }
}

/// Reject changes to an election whose voting has started.
fn ensure_editable(election: &Election) -> Result<()> {
    if election.is_editable() {
        Ok(())
    } else {
        Err(Error::bad_request(format!(
            "Cannot modify election {} once voting has started",
            election.id
        )))
    }
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    spec.validate().map_err(Error::bad_request)?;
    let election = Election {
        id: Id::new(),
        election: spec.into_inner().into(),
    };
    elections.insert_one(&election, None).await?;
    info!("Created election {} '{}'", election.id, election.name);
    Ok(Json(ElectionDescription::new(election, Vec::new())))
}

#[put("/elections/<election_id>", data = "<spec>", format = "json")]
async fn modify_election(
    _token: AuthToken<Admin>,
    election_id: Id,
    spec: Json<ElectionSpec>,
    new_elections: Coll<NewElection>,
    elections: Coll<Election>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionDescription>> {
    let election = election_by_id(&elections, election_id).await?;
    ensure_editable(&election)?;
    spec.validate().map_err(Error::bad_request)?;

    let new_election: NewElection = spec.into_inner().into();
    new_elections
        .replace_one(election_id.as_doc(), &new_election, None)
        .await?;

    let election = Election {
        id: election_id,
        election: new_election,
    };
    let positions = ballot_positions(&positions, &candidates, election_id).await?;
    Ok(Json(ElectionDescription::new(election, positions)))
}

/// Delete an election along with its positions, candidates, votes and voting sessions.
#[delete("/elections/<election_id>")]
#[allow(clippy::too_many_arguments)]
async fn delete_election(
    _token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    sessions: Coll<VotingSession>,
    db_client: &State<Client>,
    reconciler: &State<Reconciler>,
) -> Result<()> {
    election_by_id(&elections, election_id).await?;

    // Atomically delete the election and all associated data.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        elections
            .delete_one_with_session(election_id.as_doc(), None, &mut session)
            .await?;

        let filter = doc! {
            "election_id": election_id,
        };
        positions
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        candidates
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        votes
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        sessions
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
    }

    info!("Deleted election {election_id}");
    // Voters of the deleted election may now carry stale has-voted flags.
    if !reconciler.trigger_now().await {
        debug!("Has-voted reconciliation is off; flags stay as they are");
    }
    Ok(())
}

#[post("/elections/<election_id>/positions", data = "<spec>", format = "json")]
async fn create_position(
    _token: AuthToken<Admin>,
    election_id: Id,
    spec: Json<PositionSpec>,
    elections: Coll<Election>,
    positions: Coll<Position>,
) -> Result<Json<PositionDescription>> {
    let election = election_by_id(&elections, election_id).await?;
    ensure_editable(&election)?;
    spec.validate().map_err(Error::bad_request)?;

    let position = Position {
        id: Id::new(),
        position: spec.into_inner().into_position(election_id),
    };
    positions.insert_one(&position, None).await?;
    Ok(Json(PositionDescription::new(position, Vec::new())))
}

#[put(
    "/elections/<election_id>/positions/<position_id>",
    data = "<spec>",
    format = "json"
)]
#[allow(clippy::too_many_arguments)]
async fn modify_position(
    _token: AuthToken<Admin>,
    election_id: Id,
    position_id: Id,
    spec: Json<PositionSpec>,
    elections: Coll<Election>,
    positions: Coll<Position>,
    new_positions: Coll<NewPosition>,
    candidates: Coll<Candidate>,
) -> Result<Json<PositionDescription>> {
    let election = election_by_id(&elections, election_id).await?;
    ensure_editable(&election)?;
    position_in_election(&positions, election_id, position_id).await?;
    spec.validate().map_err(Error::bad_request)?;

    let running = active_candidate_count(&candidates, position_id).await?;
    if running > u64::from(spec.max_candidates) {
        return Err(Error::bad_request(format!(
            "Position already has {running} candidates"
        )));
    }

    let new_position = spec.into_inner().into_position(election_id);
    new_positions
        .replace_one(position_id.as_doc(), &new_position, None)
        .await?;
    let position = Position {
        id: position_id,
        position: new_position,
    };
    Ok(Json(PositionDescription::new(position, Vec::new())))
}

/// Delete a position and its candidates.
#[delete("/elections/<election_id>/positions/<position_id>")]
async fn delete_position(
    _token: AuthToken<Admin>,
    election_id: Id,
    position_id: Id,
    elections: Coll<Election>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    db_client: &State<Client>,
) -> Result<()> {
    let election = election_by_id(&elections, election_id).await?;
    ensure_editable(&election)?;
    position_in_election(&positions, election_id, position_id).await?;

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;
    positions
        .delete_one_with_session(position_id.as_doc(), None, &mut session)
        .await?;
    candidates
        .delete_many_with_session(doc! { "position_id": position_id }, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    Ok(())
}

/// Enter an approved candidate directly.
#[post("/elections/<election_id>/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    election_id: Id,
    spec: Json<CandidateSpec>,
    elections: Coll<Election>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let election = election_by_id(&elections, election_id).await?;
    ensure_editable(&election)?;
    if spec.name.trim().is_empty() {
        return Err(Error::bad_request("Candidate name must not be empty"));
    }
    let position = position_in_election(&positions, election_id, spec.position_id.into()).await?;
    check_capacity(&candidates, &position).await?;

    let candidate = Candidate {
        id: Id::new(),
        candidate: spec.into_inner().into_candidate(&position),
    };
    match candidates.insert_one(&candidate, None).await {
        Ok(_) => Ok(Json(candidate.into())),
        Err(err) if is_duplicate_key_error(&err) => Err(Error::bad_request(format!(
            "{} is already a candidate for '{}'",
            candidate.email, position.title
        ))),
        Err(err) => Err(err.into()),
    }
}

/// Every candidate in an election, whatever their status.
#[get("/elections/<election_id>/candidates/all")]
async fn all_candidates(
    _token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDescription>>> {
    election_by_id(&elections, election_id).await?;
    let by_position = FindOptions::builder()
        .sort(doc! { "position_id": 1, "name": 1 })
        .build();
    let all: Vec<CandidateDescription> = candidates
        .find(doc! { "election_id": election_id }, by_position)
        .await?
        .map_ok(CandidateDescription::from)
        .try_collect()
        .await?;
    Ok(Json(all))
}

#[put("/candidates/<candidate_id>/status", data = "<update>", format = "json")]
async fn set_candidate_status(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    update: Json<CandidateStatusUpdate>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let set_status = doc! {
        "$set": { "status": update.status }
    };
    let result = candidates
        .update_one(candidate_id.as_doc(), set_status, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Candidate {candidate_id}")));
    }
    info!("Candidate {candidate_id} is now {:?}", update.status);

    let candidate = candidates
        .find_one(candidate_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;
    Ok(Json(candidate.into()))
}
