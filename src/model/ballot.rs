use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rocket::http::Status;
use thiserror::Error;

use crate::error::Error;
use crate::model::{
    common::{candidate::CandidateStatus, choice::Choice, election::ElectionStatus},
    db::{
        candidate::Candidate,
        election::Election,
        position::Position,
        vote::{NewVote, Vote},
        voter::Voter,
    },
    mongodb::Id,
};

/// A voter's selections for one election: one choice per position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    pub election_id: Id,
    pub selections: HashMap<Id, Choice>,
}

/// Reasons a ballot cannot be accepted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BallotError {
    #[error("Missing voter identity")]
    MissingVoter,
    #[error("No votes were submitted")]
    Empty,
    #[error("Election is not open for voting (status: {0:?})")]
    NotOngoing(ElectionStatus),
    #[error("Position {0} is not part of this election")]
    UnknownPosition(Id),
    #[error("Candidate {candidate} is not an approved candidate for position {position}")]
    UnknownCandidate { position: Id, candidate: Id },
    #[error("This election does not allow abstaining (position {0})")]
    AbstainNotAllowed(Id),
    #[error("A vote is required for: {}", .0.join(", "))]
    MissingRequired(Vec<String>),
    #[error("{0}")]
    NotEligible(String),
}

impl From<BallotError> for Error {
    fn from(err: BallotError) -> Self {
        let status = match err {
            BallotError::NotEligible(_) => Status::Forbidden,
            _ => Status::BadRequest,
        };
        Error::Status(status, err.to_string())
    }
}

impl Ballot {
    /// Create a ballot, rejecting an empty one outright.
    pub fn new(election_id: Id, selections: HashMap<Id, Choice>) -> Result<Self, BallotError> {
        if selections.is_empty() {
            return Err(BallotError::Empty);
        }
        Ok(Self {
            election_id,
            selections,
        })
    }

    /// Check this ballot against the election it is for, at time `now`.
    ///
    /// `positions` must be the election's positions and `candidates` its candidates;
    /// only approved candidates count as valid choices. Optional positions may be left out,
    /// required ones may not.
    pub fn check(
        &self,
        voter: &Voter,
        election: &Election,
        positions: &[Position],
        candidates: &[Candidate],
        now: DateTime<Utc>,
    ) -> Result<(), BallotError> {
        let status = election.status_at(now);
        if status != ElectionStatus::Ongoing {
            return Err(BallotError::NotOngoing(status));
        }
        election
            .check_eligibility(voter)
            .map_err(BallotError::NotEligible)?;

        let position_ids = positions
            .iter()
            .filter(|p| p.election_id == election.id)
            .map(|p| p.id)
            .collect::<HashSet<_>>();
        let approved = candidates
            .iter()
            .filter(|c| c.election_id == election.id && c.status == CandidateStatus::Approved)
            .map(|c| (c.id, c.position_id))
            .collect::<HashMap<_, _>>();

        for (position, choice) in &self.selections {
            if !position_ids.contains(position) {
                return Err(BallotError::UnknownPosition(*position));
            }
            match choice {
                Choice::Abstain if !election.allow_abstain => {
                    return Err(BallotError::AbstainNotAllowed(*position));
                }
                Choice::Abstain => {}
                Choice::Candidate(candidate) => {
                    if approved.get(candidate) != Some(position) {
                        return Err(BallotError::UnknownCandidate {
                            position: *position,
                            candidate: *candidate,
                        });
                    }
                }
            }
        }

        let mut missing = positions
            .iter()
            .filter(|p| p.election_id == election.id && p.required)
            .filter(|p| !self.selections.contains_key(&p.id))
            .map(|p| p.title.clone())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            missing.sort();
            return Err(BallotError::MissingRequired(missing));
        }

        Ok(())
    }

    /// Turn the selections into vote documents for the given voter, with fresh IDs.
    pub fn into_votes(self, voter_id: Id) -> Vec<Vote> {
        let election_id = self.election_id;
        let mut votes = self
            .selections
            .into_iter()
            .map(|(position_id, choice)| Vote {
                id: Id::new(),
                vote: NewVote {
                    user_id: voter_id,
                    election_id,
                    position_id,
                    candidate_id: choice.candidate(),
                },
            })
            .collect::<Vec<_>>();
        votes.sort_by_key(|v| v.position_id);
        votes
    }
}
