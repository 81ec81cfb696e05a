mod desc;
mod results;
mod spec;

pub use desc::{ElectionDescription, ElectionSummary};
pub use results::{CandidateTally, ElectionResults, PositionResults};
pub use spec::ElectionSpec;
