use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::election::ElectionStatus,
    db::{
        candidate::Candidate, election::Election, position::Position, vote::Vote,
    },
    mongodb::Id,
};

/// Vote counts for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTally {
    pub candidate_id: ApiId,
    pub name: String,
    pub votes: u64,
}

/// Vote counts for one position, most votes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionResults {
    pub position_id: ApiId,
    pub title: String,
    pub max_winners: u32,
    pub tallies: Vec<CandidateTally>,
    pub abstentions: u64,
    /// Up to `max_winners` candidates with the most votes. Candidates without votes never win.
    pub winners: Vec<ApiId>,
    /// Candidates level on votes for the last seat(s), when there are more of them than
    /// seats left. None of them are in `winners`; the tie is for the organizers to settle.
    pub tied: Vec<ApiId>,
}

/// Tallied results of an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: ApiId,
    pub status: ElectionStatus,
    /// Number of voters who cast a ballot.
    pub turnout: u64,
    pub positions: Vec<PositionResults>,
}

impl ElectionResults {
    /// Count `votes` for the election's `positions`, crediting only the given `candidates`.
    /// Positions keep the order they were given in.
    pub fn tally(
        election: &Election,
        positions: &[Position],
        candidates: &[Candidate],
        votes: &[Vote],
    ) -> Self {
        // (position, candidate) -> count; `None` candidate counts abstentions.
        let mut counts: HashMap<(Id, Option<Id>), u64> = HashMap::new();
        for vote in votes.iter().filter(|v| v.election_id == election.id) {
            *counts.entry((vote.position_id, vote.candidate_id)).or_default() += 1;
        }
        let mut voters = votes.iter().map(|v| v.user_id).collect::<Vec<_>>();
        voters.sort();
        voters.dedup();

        let positions = positions
            .iter()
            .map(|position| {
                let mut tallies = candidates
                    .iter()
                    .filter(|c| c.position_id == position.id)
                    .map(|c| CandidateTally {
                        candidate_id: c.id.into(),
                        name: c.name.clone(),
                        votes: counts.get(&(position.id, Some(c.id))).copied().unwrap_or(0),
                    })
                    .collect::<Vec<_>>();
                tallies.sort_by(|a, b| b.votes.cmp(&a.votes).then_with(|| a.name.cmp(&b.name)));
                let (winners, tied) = fill_seats(&tallies, position.max_winners as usize);
                PositionResults {
                    position_id: position.id.into(),
                    title: position.title.clone(),
                    max_winners: position.max_winners,
                    abstentions: counts.get(&(position.id, None)).copied().unwrap_or(0),
                    tallies,
                    winners,
                    tied,
                }
            })
            .collect();

        Self {
            election_id: election.id.into(),
            status: election.status(),
            turnout: voters.len() as u64,
            positions,
        }
    }
}

/// Split `tallies` (most votes first) into outright winners and candidates tied for the
/// remaining seats.
fn fill_seats(tallies: &[CandidateTally], seats: usize) -> (Vec<ApiId>, Vec<ApiId>) {
    let contenders = tallies.iter().filter(|t| t.votes > 0).collect::<Vec<_>>();
    let ids = |tallies: Vec<&CandidateTally>| tallies.iter().map(|t| t.candidate_id).collect();

    if seats == 0 {
        return (Vec::new(), Vec::new());
    }
    if contenders.len() <= seats || contenders[seats].votes < contenders[seats - 1].votes {
        return (ids(contenders.into_iter().take(seats).collect()), Vec::new());
    }
    let cutoff = contenders[seats - 1].votes;
    let (winners, tied): (Vec<_>, Vec<_>) = contenders
        .into_iter()
        .filter(|t| t.votes >= cutoff)
        .partition(|t| t.votes > cutoff);
    (ids(winners), ids(tied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::db::{
        candidate::NewCandidate, election::NewElection, position::NewPosition, vote::NewVote,
    };

    fn vote(election: &Election, position: &Position, candidate: Option<&Candidate>) -> Vote {
        Vote {
            id: Id::new(),
            vote: NewVote {
                user_id: Id::new(),
                election_id: election.id,
                position_id: position.id,
                candidate_id: candidate.map(|c| c.id),
            },
        }
    }

    #[test]
    fn counts_votes_and_picks_winners() {
        let election = Election {
            id: Id::new(),
            election: NewElection::ended_example(),
        };
        // Two winners, three candidates.
        let position = Position {
            id: Id::new(),
            position: NewPosition::example_optional(election.id),
        };
        let candidates = (0..3)
            .map(|i| Candidate {
                id: Id::new(),
                candidate: NewCandidate::example(&position, i),
            })
            .collect::<Vec<_>>();

        let votes = vec![
            vote(&election, &position, Some(&candidates[1])),
            vote(&election, &position, Some(&candidates[1])),
            vote(&election, &position, Some(&candidates[0])),
            vote(&election, &position, None),
        ];
        let results = ElectionResults::tally(&election, &[position.clone()], &candidates, &votes);

        assert_eq!(results.status, ElectionStatus::Ended);
        assert_eq!(results.turnout, 4);
        let position_results = &results.positions[0];
        assert_eq!(position_results.abstentions, 1);
        assert_eq!(
            position_results
                .tallies
                .iter()
                .map(|t| t.votes)
                .collect::<Vec<_>>(),
            vec![2, 1, 0]
        );
        assert_eq!(
            position_results.winners,
            vec![candidates[1].id.into(), candidates[0].id.into()]
        );
    }

    #[test]
    fn ties_at_the_cutoff_are_not_broken() {
        let election = Election {
            id: Id::new(),
            election: NewElection::ended_example(),
        };
        // Two seats.
        let position = Position {
            id: Id::new(),
            position: NewPosition::example_optional(election.id),
        };
        let candidates = (0..4)
            .map(|i| Candidate {
                id: Id::new(),
                candidate: NewCandidate::example(&position, i),
            })
            .collect::<Vec<_>>();

        let mut votes = Vec::new();
        for (candidate, count) in candidates.iter().zip([3, 0, 1, 1]) {
            for _ in 0..count {
                votes.push(vote(&election, &position, Some(candidate)));
            }
        }
        let results = ElectionResults::tally(&election, &[position.clone()], &candidates, &votes);
        let position_results = &results.positions[0];
        assert_eq!(position_results.winners, vec![candidates[0].id.into()]);
        let mut tied = position_results.tied.clone();
        tied.sort();
        let mut expected: Vec<ApiId> = vec![candidates[2].id.into(), candidates[3].id.into()];
        expected.sort();
        assert_eq!(tied, expected);

        // Breaking the tie settles the last seat.
        votes.push(vote(&election, &position, Some(&candidates[2])));
        let results = ElectionResults::tally(&election, &[position], &candidates, &votes);
        assert_eq!(
            results.positions[0].winners,
            vec![candidates[0].id.into(), candidates[2].id.into()]
        );
        assert!(results.positions[0].tied.is_empty());
    }

    #[test]
    fn no_votes_no_winners() {
        let election = Election {
            id: Id::new(),
            election: NewElection::ended_example(),
        };
        let position = Position {
            id: Id::new(),
            position: NewPosition::example(election.id),
        };
        let candidates = vec![Candidate {
            id: Id::new(),
            candidate: NewCandidate::example(&position, 0),
        }];
        let results = ElectionResults::tally(&election, &[position], &candidates, &[]);
        assert_eq!(results.turnout, 0);
        assert!(results.positions[0].winners.is_empty());
        assert!(results.positions[0].tied.is_empty());
        assert_eq!(results.positions[0].tallies[0].votes, 0);
    }
}
