use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{common::election::ElectionLevel, db::election::ElectionCore};

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub level: ElectionLevel,
    #[serde(default)]
    pub allow_abstain: bool,
    /// Course/year values allowed to vote. Empty or absent means everyone.
    #[serde(default)]
    pub eligible_course_years: Vec<String>,
    /// Required for organization-level elections, forbidden otherwise.
    #[serde(default)]
    pub organization_id: Option<String>,
}

impl ElectionSpec {
    /// Check the spec is self-consistent, returning a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Election name must not be empty".to_string());
        }
        if self.start_time >= self.end_time {
            return Err("Election must start before it ends".to_string());
        }
        let has_org = self
            .organization_id
            .as_deref()
            .map(|org| !org.trim().is_empty())
            .unwrap_or(false);
        match self.level {
            ElectionLevel::Organization if !has_org => {
                Err("Organization elections must name their organization".to_string())
            }
            ElectionLevel::University if has_org => {
                Err("University elections cannot belong to an organization".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl From<ElectionSpec> for ElectionCore {
    fn from(spec: ElectionSpec) -> Self {
        let eligible_course_years = spec
            .eligible_course_years
            .into_iter()
            .map(|cy| cy.trim().to_string())
            .filter(|cy| !cy.is_empty())
            .collect();
        Self {
            name: spec.name.trim().to_string(),
            description: spec.description,
            start_time: spec.start_time,
            end_time: spec.end_time,
            level: spec.level,
            allow_abstain: spec.allow_abstain,
            eligible_course_years,
            organization_id: spec.organization_id.map(|org| org.trim().to_string()),
        }
    }
}
