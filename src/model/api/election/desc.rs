use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{id::ApiId, position::PositionDescription},
    common::election::{ElectionLevel, ElectionStatus},
    db::election::Election,
};

/// An election as listed by the API, without its positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ApiId,
    pub name: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub level: ElectionLevel,
    pub allow_abstain: bool,
    pub eligible_course_years: Vec<String>,
    pub organization_id: Option<String>,
    /// Derived from the start and end times when the response was built.
    pub status: ElectionStatus,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        let status = election.status();
        let core = election.election;
        Self {
            id: election.id.into(),
            name: core.name,
            description: core.description,
            start_time: core.start_time,
            end_time: core.end_time,
            level: core.level,
            allow_abstain: core.allow_abstain,
            eligible_course_years: core.eligible_course_years,
            organization_id: core.organization_id,
            status,
        }
    }
}

/// An election with its positions and their candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    #[serde(flatten)]
    pub summary: ElectionSummary,
    pub positions: Vec<PositionDescription>,
}

impl ElectionDescription {
    pub fn new(election: Election, positions: Vec<PositionDescription>) -> Self {
        Self {
            summary: election.into(),
            positions,
        }
    }
}
