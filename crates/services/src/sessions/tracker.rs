use std::sync::Arc;

use drive_core::Clock;
use drive_core::curriculum::Curriculum;
use drive_core::model::{
    Attempt, AttemptRecord, CategoryId, OptionKey, PhaseId, ScenarioId, SessionId, SessionScope,
    SessionSummary,
};
use drive_core::scenario_ids::ScenarioIdScheme;
use storage::repository::SessionResultRepository;

use super::progress::SessionProgress;
use super::session::Session;
use crate::auth::AuthService;
use crate::backend::{AttemptSubmission, ScenarioBackend};
use crate::error::SessionError;

/// A completed session as handed to the results screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub summary: SessionSummary,
    /// Row id in the local result history; `None` if storing it failed.
    pub result_id: Option<i64>,
}

/// Outcome of [`SessionTracker::complete_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCompletion {
    /// The final scenario has not been answered yet; nothing was submitted.
    Incomplete { answered: usize, total: usize },
    Complete(CompletedSession),
}

/// Tracks progress through the scenarios of one phase and reports answers
/// to the backend.
///
/// The tracker is owned by whoever drives the screens and passed to them by
/// `&mut`. At most one session is active; `start_session` replaces it and
/// `dispose` tears it down.
pub struct SessionTracker {
    clock: Clock,
    curriculum: Arc<Curriculum>,
    scheme: ScenarioIdScheme,
    backend: Arc<dyn ScenarioBackend>,
    auth: AuthService,
    results: Arc<dyn SessionResultRepository>,
    session: Option<Session>,
}

impl SessionTracker {
    /// # Errors
    ///
    /// Returns `SessionError::Curriculum` if a phase of the curriculum does not fit the id layout.
    pub fn new(
        clock: Clock,
        curriculum: Arc<Curriculum>,
        scheme: ScenarioIdScheme,
        backend: Arc<dyn ScenarioBackend>,
        auth: AuthService,
        results: Arc<dyn SessionResultRepository>,
    ) -> Result<Self, SessionError> {
        curriculum.check_id_layout(&scheme)?;
        Ok(Self {
            clock,
            curriculum,
            scheme,
            backend,
            auth,
            results,
            session: None,
        })
    }

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    #[must_use]
    pub fn scheme(&self) -> &ScenarioIdScheme {
        &self.scheme
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn active(&self) -> Result<&Session, SessionError> {
        self.session.as_ref().ok_or(SessionError::NoActiveSession)
    }

    fn active_mut(&mut self) -> Result<&mut Session, SessionError> {
        self.session.as_mut().ok_or(SessionError::NoActiveSession)
    }

    /// Begin tracking a phase. No network call is made.
    ///
    /// A blank `category_name` is replaced by the curriculum's name. Any
    /// previous session is discarded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Curriculum` for an unknown category or phase.
    pub fn start_session(
        &mut self,
        category_id: CategoryId,
        phase_id: PhaseId,
        category_name: impl Into<String>,
    ) -> Result<&Session, SessionError> {
        let phase = self.curriculum.phase(category_id, phase_id)?;
        let scenario_ids = (0..phase.phase.scenario_count)
            .map(|index| self.scheme.scenario_id(category_id, phase_id, index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut category_name = category_name.into();
        if category_name.trim().is_empty() {
            category_name.clone_from(&phase.category.name);
        }

        if let Some(previous) = self.session.as_ref().filter(|s| !s.is_complete()) {
            tracing::info!(
                session_id = %previous.session_id(),
                answered = previous.answered_count(),
                "discarding unfinished session"
            );
        }

        let scope = SessionScope {
            session_id: SessionId::generate(),
            category_id,
            phase_id,
            category_name,
        };
        tracing::info!(
            session_id = %scope.session_id,
            category = %category_id,
            phase = %phase_id,
            scenarios = scenario_ids.len(),
            "session started"
        );
        let session = self
            .session
            .insert(Session::new(scope, scenario_ids, self.clock.now()));
        Ok(&*session)
    }

    /// Scenario id for the current index of the active session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession`, or `SessionError::PastLastScenario`
    /// once the index has moved beyond the phase.
    pub fn current_scenario_id(&self) -> Result<ScenarioId, SessionError> {
        let session = self.active()?;
        session
            .current_scenario_id()
            .ok_or(SessionError::PastLastScenario {
                index: session.current_index(),
                count: session.scenario_count(),
            })
    }

    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` if no session is active.
    pub fn progress(&self) -> Result<SessionProgress, SessionError> {
        Ok(self.active()?.progress())
    }

    /// Record an answer with its explanation shown, then submit it.
    ///
    /// # Errors
    ///
    /// See [`Self::record_answer`].
    pub async fn update_scenario_progress(
        &mut self,
        scenario_id: ScenarioId,
        selected_option: OptionKey,
        is_correct: bool,
    ) -> Result<AttemptRecord, SessionError> {
        self.record_answer(scenario_id, selected_option, is_correct, true)
            .await
    }

    /// Append an attempt to the active session and submit it to the backend.
    ///
    /// The attempt is kept whatever the submission outcome; a failed
    /// submission is logged and the record is marked failed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession`, `SessionError::AlreadyCompleted`,
    /// or `SessionError::ScenarioOutsidePhase` if the id is not part of the phase.
    pub async fn record_answer(
        &mut self,
        scenario_id: ScenarioId,
        selected_option: OptionKey,
        is_correct: bool,
        explanation_shown: bool,
    ) -> Result<AttemptRecord, SessionError> {
        let answered_at = self.clock.now();
        let session = self.active_mut()?;
        if session.is_complete() {
            return Err(SessionError::AlreadyCompleted);
        }
        if !session.contains(scenario_id) {
            return Err(SessionError::ScenarioOutsidePhase(scenario_id));
        }

        let attempt = Attempt::new(scenario_id, selected_option, is_correct, answered_at)
            .with_explanation_shown(explanation_shown);
        let position = session.push_record(AttemptRecord::pending(attempt.clone()));

        let outcome = self.submit(&attempt).await;

        let record = self
            .active_mut()?
            .record_mut(position)
            .ok_or(SessionError::NoActiveSession)?;
        apply_outcome(record, outcome);
        Ok(record.clone())
    }

    /// Advance to the next scenario and return the new index.
    ///
    /// The index only ever grows; the caller builds the next route from it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` if no session is active.
    pub fn move_to_next_scenario(&mut self) -> Result<usize, SessionError> {
        Ok(self.active_mut()?.advance())
    }

    /// Finish the active session.
    ///
    /// Before the final scenario has an attempt this returns
    /// `SessionCompletion::Incomplete` and changes nothing. Otherwise every
    /// attempt the backend has not accepted is submitted once more, the
    /// summary is stored in the local history and returned. Backend or
    /// storage failures are logged and reported through the summary; they
    /// never discard the local attempts. Completing twice returns the same
    /// summary without resubmitting.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` or `SessionError::Summary`.
    pub async fn complete_session(&mut self) -> Result<SessionCompletion, SessionError> {
        let session = self.active()?;
        if let Some(summary) = session.summary() {
            return Ok(SessionCompletion::Complete(CompletedSession {
                summary: summary.clone(),
                result_id: session.result_id(),
            }));
        }
        if !session.final_scenario_answered() {
            return Ok(SessionCompletion::Incomplete {
                answered: session.answered_count(),
                total: session.scenario_count(),
            });
        }

        let unaccepted: Vec<(usize, Attempt)> = session
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.submission().is_accepted())
            .map(|(position, record)| (position, record.attempt().clone()))
            .collect();
        let mut outcomes = Vec::with_capacity(unaccepted.len());
        for (position, attempt) in unaccepted {
            outcomes.push((position, self.submit(&attempt).await));
        }

        let completed_at = self.clock.now();
        let session = self.active_mut()?;
        for (position, outcome) in outcomes {
            if let Some(record) = session.record_mut(position) {
                apply_outcome(record, outcome);
            }
        }

        let synced: Vec<bool> = session
            .records()
            .iter()
            .map(|record| record.submission().is_accepted())
            .collect();
        let summary = SessionSummary::from_attempts(
            session.scope().clone(),
            session.started_at(),
            completed_at,
            session.attempts().cloned().collect(),
            synced,
        )?;

        let result_id = match self.results.append_result(&summary).await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(
                    session_id = %summary.session_id(),
                    error = %err,
                    "failed to store session result locally"
                );
                None
            }
        };

        if !summary.is_fully_synced() {
            tracing::warn!(
                session_id = %summary.session_id(),
                unsynced = summary.unsynced_count(),
                "session completed with attempts the backend never accepted"
            );
        }
        tracing::info!(
            session_id = %summary.session_id(),
            score = summary.score(),
            total = summary.total(),
            "session completed"
        );

        self.active_mut()?.set_summary(summary.clone(), result_id);
        Ok(SessionCompletion::Complete(CompletedSession {
            summary,
            result_id,
        }))
    }

    /// Tear down the active session and hand it back.
    pub fn dispose(&mut self) -> Option<Session> {
        let session = self.session.take();
        if let Some(session) = &session {
            tracing::debug!(session_id = %session.session_id(), "session disposed");
        }
        session
    }

    async fn submit(&self, attempt: &Attempt) -> Result<(), String> {
        let token = self
            .auth
            .require_token()
            .await
            .map_err(|err| err.to_string())?;
        let submission = AttemptSubmission {
            scenario_id: attempt.scenario_id(),
            selected_option: attempt.selected_option().clone(),
        };
        self.backend
            .submit_attempt(&token, &submission)
            .await
            .map_err(|err| err.to_string())
    }
}

fn apply_outcome(record: &mut AttemptRecord, outcome: Result<(), String>) {
    match outcome {
        Ok(()) => record.mark_accepted(),
        Err(reason) => {
            tracing::warn!(
                scenario_id = %record.attempt().scenario_id(),
                %reason,
                "attempt submission failed; continuing"
            );
            record.mark_failed(reason);
        }
    }
}

impl std::fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTracker")
            .field("scheme", &self.scheme)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
