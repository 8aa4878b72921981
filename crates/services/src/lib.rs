#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod sessions;

pub use drive_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use auth::{AuthService, AuthToken};
pub use backend::{AttemptSubmission, HttpBackend, ScenarioBackend};
pub use catalog::ScenarioCatalog;
pub use config::{AppConfig, BackendConfig};
pub use error::{AppServicesError, AuthError, BackendError, ScreenError, SessionError};

pub use sessions::{
    CompletedSession, Mount, Route, ScenarioScreen, ScreenState, Session, SessionCompletion,
    SessionProgress, SessionResultListItem, SessionResultService, SessionTracker,
};
