use mongodb::bson::doc;
use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, PasswordRequest},
        candidate::{CandidacyApplication, CandidateDescription},
        voter::{ProfileUpdate, VoterProfile},
    },
    common::password::{hash_password, is_acceptable, MIN_PASSWORD_LENGTH},
    db::{
        candidate::Candidate,
        election::Election,
        position::Position,
        voter::Voter,
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::common::{check_capacity, election_by_id};

pub fn routes() -> Vec<Route> {
    routes![get_profile, update_profile, set_password, apply_for_position]
}

async fn voter_by_token(token: &AuthToken<Voter>, voters: &Coll<Voter>) -> Result<Voter> {
    voters
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Voter {}", token.id)))
}

#[get("/voter/profile")]
async fn get_profile(token: AuthToken<Voter>, voters: Coll<Voter>) -> Result<Json<VoterProfile>> {
    let voter = voter_by_token(&token, &voters).await?;
    Ok(Json(voter.into()))
}

#[put("/voter/profile", data = "<update>", format = "json")]
async fn update_profile(
    token: AuthToken<Voter>,
    update: Json<ProfileUpdate>,
    voters: Coll<Voter>,
) -> Result<Json<VoterProfile>> {
    update.validate().map_err(Error::bad_request)?;
    let course_year = update.course_year.trim();
    let department_org = update.department_org.trim();

    // Eligibility fields can be filled in once, never changed.
    let unfrozen = doc! {
        "_id": token.id,
        "course_year": { "$in": ["", course_year] },
        "department_org": { "$in": ["", department_org] },
    };
    let set = doc! {
        "$set": {
            "first_name": update.first_name.trim(),
            "last_name": update.last_name.trim(),
            "course_year": course_year,
            "department_org": department_org,
        }
    };
    let result = voters.update_one(unfrozen, set, None).await?;
    if result.matched_count == 0 {
        voter_by_token(&token, &voters).await?;
        return Err(Error::bad_request(
            "Course/year and department/organization cannot be changed once set",
        ));
    }

    let voter = voter_by_token(&token, &voters).await?;
    Ok(Json(voter.into()))
}

#[put("/voter/password", data = "<request>", format = "json")]
async fn set_password(
    token: AuthToken<Voter>,
    request: Json<PasswordRequest>,
    voters: Coll<Voter>,
) -> Result<()> {
    if !is_acceptable(&request.password) {
        return Err(Error::bad_request(format!(
            "Passwords must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    let password_hash = hash_password(&request.password)?;
    let update = doc! {
        "$set": { "password_hash": password_hash }
    };
    voters.update_one(token.id.as_doc(), update, None).await?;
    Ok(())
}

/// Apply to run for a position in an election that has not started yet.
#[post("/voter/candidacies", data = "<application>", format = "json")]
async fn apply_for_position(
    token: AuthToken<Voter>,
    application: Json<CandidacyApplication>,
    voters: Coll<Voter>,
    elections: Coll<Election>,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let voter = voter_by_token(&token, &voters).await?;
    let position_id: Id = application.position_id.into();
    let position = positions
        .find_one(position_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Position {position_id}")))?;

    let election = election_by_id(&elections, position.election_id).await?;
    if !election.is_editable() {
        return Err(Error::bad_request(
            "Candidacies close once voting has started",
        ));
    }
    election
        .check_eligibility(&voter)
        .map_err(|reason| Error::Status(rocket::http::Status::Forbidden, reason))?;
    check_capacity(&candidates, &position).await?;

    let candidate = Candidate {
        id: Id::new(),
        candidate: application.into_inner().into_candidate(&position, &voter),
    };
    match candidates.insert_one(&candidate, None).await {
        Ok(_) => {
            info!("Voter {} applied for position {}", voter.id, position.id);
            Ok(Json(candidate.into()))
        }
        Err(err) if is_duplicate_key_error(&err) => Err(Error::bad_request(format!(
            "You have already applied for '{}'",
            position.title
        ))),
        Err(err) => Err(err.into()),
    }
}
