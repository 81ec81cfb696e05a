use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Literal a voter sends instead of a candidate ID to abstain from a position.
pub const ABSTAIN: &str = "abstain";

/// What a voter picked for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Choice {
    Candidate(Id),
    Abstain,
}

impl Choice {
    /// The chosen candidate, or `None` for an abstention.
    pub fn candidate(&self) -> Option<Id> {
        match self {
            Self::Candidate(id) => Some(*id),
            Self::Abstain => None,
        }
    }
}

impl From<Option<Id>> for Choice {
    fn from(candidate: Option<Id>) -> Self {
        candidate.map_or(Self::Abstain, Self::Candidate)
    }
}

impl Display for Choice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Candidate(id) => write!(f, "{id}"),
            Self::Abstain => write!(f, "{ABSTAIN}"),
        }
    }
}

impl FromStr for Choice {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case(ABSTAIN) {
            Ok(Self::Abstain)
        } else {
            Ok(Self::Candidate(s.parse()?))
        }
    }
}

impl TryFrom<String> for Choice {
    type Error = mongodb::bson::oid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Choice> for String {
    fn from(choice: Choice) -> Self {
        choice.to_string()
    }
}
