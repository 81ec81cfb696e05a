use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::choice::Choice,
    db::vote::Vote,
    mongodb::Id,
};

/// A voter's ballot: one candidate (or `"abstain"`) per position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVotesRequest {
    pub votes: HashMap<ApiId, Choice>,
    pub election_id: ApiId,
    /// Optional; must name the logged-in voter if present.
    #[serde(default)]
    pub user_id: Option<ApiId>,
}

impl SubmitVotesRequest {
    /// The selections keyed by database ID.
    pub fn selections(&self) -> HashMap<Id, Choice> {
        self.votes
            .iter()
            .map(|(position, choice)| (Id::from(*position), *choice))
            .collect()
    }
}

/// Successful ballot submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVotesResponse {
    pub success: bool,
    pub message: String,
    pub votes_submitted: Vec<VoteRecord>,
}

impl SubmitVotesResponse {
    pub fn new(votes: Vec<Vote>) -> Self {
        Self {
            success: true,
            message: "Votes submitted successfully".to_string(),
            votes_submitted: votes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Whether a voter has voted in an election, and what they recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
    pub votes: Vec<VoteRecord>,
    pub vote_count: usize,
}

impl From<Vec<Vote>> for VoteStatus {
    fn from(votes: Vec<Vote>) -> Self {
        Self {
            has_voted: !votes.is_empty(),
            vote_count: votes.len(),
            votes: votes.into_iter().map(Into::into).collect(),
        }
    }
}

/// One recorded vote. `candidateId` is `"abstain"` for an abstention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub id: ApiId,
    pub user_id: ApiId,
    pub election_id: ApiId,
    pub position_id: ApiId,
    pub candidate_id: Choice,
}

impl From<Vote> for VoteRecord {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            user_id: vote.user_id.into(),
            election_id: vote.election_id.into(),
            position_id: vote.position_id.into(),
            candidate_id: vote.candidate_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{serde_json, serde_json::json};

    use super::*;
    use crate::model::{common::choice::ABSTAIN, db::vote::NewVote};

    #[test]
    fn request_accepts_ids_and_abstain() {
        let (election, president, senator, candidate) = (Id::new(), Id::new(), Id::new(), Id::new());
        let body = json!({
            "electionId": election.to_string(),
            "votes": {
                president.to_string(): candidate.to_string(),
                senator.to_string(): ABSTAIN,
            },
        });
        let request: SubmitVotesRequest = serde_json::from_value(body).unwrap();
        assert_eq!(Id::from(request.election_id), election);
        assert_eq!(request.user_id, None);

        let selections = request.selections();
        assert_eq!(selections[&president], Choice::Candidate(candidate));
        assert_eq!(selections[&senator], Choice::Abstain);
    }

    #[test]
    fn record_uses_camel_case_and_hex() {
        let vote = Vote {
            id: Id::new(),
            vote: NewVote {
                user_id: Id::new(),
                election_id: Id::new(),
                position_id: Id::new(),
                candidate_id: None,
            },
        };
        let json = serde_json::to_value(VoteRecord::from(vote.clone())).unwrap();
        assert_eq!(json["id"], vote.id.to_string());
        assert_eq!(json["userId"], vote.user_id.to_string());
        assert_eq!(json["electionId"], vote.election_id.to_string());
        assert_eq!(json["positionId"], vote.position_id.to_string());
        assert_eq!(json["candidateId"], ABSTAIN);
    }

    #[test]
    fn status_counts_votes() {
        let status = VoteStatus::from(Vec::new());
        assert!(!status.has_voted);
        assert_eq!(status.vote_count, 0);
    }
}
