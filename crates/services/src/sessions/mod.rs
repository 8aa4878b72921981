mod progress;
mod screen;
mod session;
mod tracker;
mod view;

// Public API of the session subsystem.
pub use crate::error::{ScreenError, SessionError};
pub use progress::SessionProgress;
pub use screen::{Mount, Route, ScenarioScreen, ScreenState};
pub use session::Session;
pub use tracker::{CompletedSession, SessionCompletion, SessionTracker};
pub use view::{SessionResultId, SessionResultListItem, SessionResultService};
