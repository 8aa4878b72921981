//! Shared error types for the services crate.

use thiserror::Error;

use drive_core::curriculum::CurriculumError;
use drive_core::descriptor::DescriptorError;
use drive_core::model::{ScenarioId, SessionSummaryError};
use drive_core::scenario_ids::ScenarioIdError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by backend clients.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
    #[error("backend rejected the auth token")]
    Unauthorized,
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("no auth token stored; log in first")]
    MissingToken,
    #[error("auth token cannot be empty")]
    EmptyToken,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no active session")]
    NoActiveSession,
    #[error("session is already completed")]
    AlreadyCompleted,
    #[error("scenario {0} does not belong to the active phase")]
    ScenarioOutsidePhase(ScenarioId),
    #[error("scenario index {index} is past the last scenario of the phase ({count})")]
    PastLastScenario { index: usize, count: usize },
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
    #[error(transparent)]
    ScenarioId(#[from] ScenarioIdError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the scenario screen flow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScreenError {
    #[error("{action} is not allowed while the screen is in {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    #[error("phase is not finished: {answered} of {total} scenarios answered")]
    PhaseIncomplete { answered: usize, total: usize },
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
    #[error(transparent)]
    Content(#[from] DescriptorError),
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
