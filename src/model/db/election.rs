use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::election::{ElectionLevel, ElectionStatus};

use super::voter::VoterCore;

/// Core election data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election name.
    pub name: String,
    /// Free-text description shown to voters.
    pub description: String,
    /// Voting opens.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Voting closes.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// University-wide or organization-only.
    pub level: ElectionLevel,
    /// May voters abstain from a position?
    pub allow_abstain: bool,
    /// Course/year values allowed to vote. Empty means everyone.
    pub eligible_course_years: Vec<String>,
    /// Owning organization, for organization-level elections.
    pub organization_id: Option<String>,
}

impl ElectionCore {
    /// Lifecycle status at time `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> ElectionStatus {
        ElectionStatus::at(self.start_time, self.end_time, now)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ElectionStatus {
        self.status_at(Utc::now())
    }

    /// Elections, and their positions, can only be edited before voting opens.
    pub fn is_editable(&self) -> bool {
        self.status() == ElectionStatus::Upcoming
    }

    /// Check whether the given voter may take part, returning the reason if not.
    pub fn check_eligibility(&self, voter: &VoterCore) -> Result<(), String> {
        if !self.eligible_course_years.is_empty()
            && !self
                .eligible_course_years
                .iter()
                .any(|cy| cy.eq_ignore_ascii_case(voter.course_year.trim()))
        {
            return Err(format!(
                "Course/year '{}' is not eligible for this election",
                voter.course_year
            ));
        }
        if self.level == ElectionLevel::Organization {
            let member = self
                .organization_id
                .as_deref()
                .map(|org| org.eq_ignore_ascii_case(voter.department_org.trim()))
                .unwrap_or(false);
            if !member {
                return Err("Only members of the organization may vote in this election".to_string());
            }
        }
        Ok(())
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

with_id! {
    /// An election from the database, with its unique ID.
    Election { election: ElectionCore }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::api::election::ElectionSpec;

    impl ElectionCore {
        pub fn ongoing_example() -> Self {
            ElectionSpec::current_example().into()
        }

        pub fn upcoming_example() -> Self {
            ElectionSpec::future_example().into()
        }

        pub fn ended_example() -> Self {
            ElectionSpec::past_example().into()
        }

        pub fn organization_example() -> Self {
            ElectionSpec::organization_example().into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_editability() {
        assert_eq!(ElectionCore::ongoing_example().status(), ElectionStatus::Ongoing);
        assert!(!ElectionCore::ongoing_example().is_editable());
        assert_eq!(ElectionCore::upcoming_example().status(), ElectionStatus::Upcoming);
        assert!(ElectionCore::upcoming_example().is_editable());
        assert_eq!(ElectionCore::ended_example().status(), ElectionStatus::Ended);
        assert!(!ElectionCore::ended_example().is_editable());
    }

    #[test]
    fn university_election_open_to_all_when_no_course_list() {
        let election = ElectionCore::ongoing_example();
        assert!(election.eligible_course_years.is_empty());
        assert!(election.check_eligibility(&VoterCore::example()).is_ok());
        assert!(election.check_eligibility(&VoterCore::example2()).is_ok());
    }

    #[test]
    fn course_year_restriction() {
        let mut election = ElectionCore::ongoing_example();
        election.eligible_course_years = vec!["bscs-3".to_string(), "BSIT-3".to_string()];
        assert!(election.check_eligibility(&VoterCore::example()).is_ok());
        assert!(election.check_eligibility(&VoterCore::example2()).is_err());
    }

    #[test]
    fn organization_membership() {
        let election = ElectionCore::organization_example();
        assert!(election.check_eligibility(&VoterCore::example()).is_ok());
        assert!(election.check_eligibility(&VoterCore::example2()).is_err());

        let mut orphan = election;
        orphan.organization_id = None;
        assert!(orphan.check_eligibility(&VoterCore::example()).is_err());
    }
}
