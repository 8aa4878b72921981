//! REST backend collaborator: scenario listing, choice listing and attempt submission.

mod http;

use async_trait::async_trait;
use drive_core::model::{Choice, OptionKey, Scenario, ScenarioId};
use serde::Serialize;

use crate::auth::AuthToken;
use crate::error::BackendError;

pub use http::HttpBackend;

/// Body of `POST /attempts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptSubmission {
    pub scenario_id: ScenarioId,
    pub selected_option: OptionKey,
}

#[async_trait]
pub trait ScenarioBackend: Send + Sync {
    /// List scenarios, optionally restricted to an inclusive id range.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    async fn list_scenarios(
        &self,
        range: Option<(ScenarioId, ScenarioId)>,
    ) -> Result<Vec<Scenario>, BackendError>;

    /// List the answer choices of one scenario.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    async fn list_choices(&self, scenario_id: ScenarioId) -> Result<Vec<Choice>, BackendError>;

    /// Record one answer for the authenticated player. Any 2xx status counts
    /// as accepted; the response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` for a rejected token, other `BackendError`s otherwise.
    async fn submit_attempt(
        &self,
        token: &AuthToken,
        submission: &AttemptSubmission,
    ) -> Result<(), BackendError>;
}
