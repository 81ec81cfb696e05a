use mongodb::{
    bson::{doc, Bson},
    Database,
};

use crate::error::Result;
use crate::model::{
    db::{vote::VotingSession, voter::Voter},
    mongodb::Coll,
};

/// Re-derive every voter's `has_voted` flag from the recorded voting sessions.
///
/// Stale flags are cleared before the sessions are read again for setting, so a
/// ballot committed while this runs ends up flagged rather than cleared.
/// Returns how many flags were set and how many were cleared.
pub async fn reconcile_has_voted(db: &Database) -> Result<(u64, u64)> {
    let sessions = Coll::<VotingSession>::from_db(db);
    let voters = Coll::<Voter>::from_db(db);

    let voted = sessions.distinct("user_id", None, None).await?;
    let cleared = clear_stale(&voters, voted).await?;
    let set = set_missing(&voters, &sessions).await?;

    if set > 0 || cleared > 0 {
        info!("Reconciled has_voted flags: {set} set, {cleared} cleared");
    }
    Ok((set, cleared))
}

/// Clear the flag of every flagged voter outside `voted`.
async fn clear_stale(voters: &Coll<Voter>, voted: Vec<Bson>) -> Result<u64> {
    let cleared = voters
        .update_many(
            doc! { "_id": { "$nin": voted }, "has_voted": true },
            doc! { "$set": { "has_voted": false } },
            None,
        )
        .await?
        .modified_count;
    Ok(cleared)
}

/// Flag every voter who has a voting session right now.
async fn set_missing(voters: &Coll<Voter>, sessions: &Coll<VotingSession>) -> Result<u64> {
    let voted = sessions.distinct("user_id", None, None).await?;
    let set = voters
        .update_many(
            doc! { "_id": { "$in": voted }, "has_voted": false },
            doc! { "$set": { "has_voted": true } },
            None,
        )
        .await?
        .modified_count;
    Ok(set)
}
