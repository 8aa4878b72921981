mod attempt;
mod ids;
mod scenario;
mod session;

pub use ids::{CategoryId, ParseIdError, PhaseId, ScenarioId, SessionId};

pub use attempt::{Attempt, AttemptRecord, SubmissionStatus};
pub use scenario::{Choice, OptionKey, OptionKeyError, Scenario};
pub use session::{SessionScope, SessionSummary, SessionSummaryError};
