use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

use drive_core::model::{
    Attempt, AttemptRecord, CategoryId, PhaseId, ScenarioId, SessionId, SessionScope,
    SessionSummary,
};

use super::progress::SessionProgress;

/// Runtime state of one phase play-through.
pub struct Session {
    scope: SessionScope,
    scenario_ids: Vec<ScenarioId>,
    current_index: usize,
    records: Vec<AttemptRecord>,
    started_at: DateTime<Utc>,
    summary: Option<SessionSummary>,
    result_id: Option<i64>,
}

impl Session {
    pub(crate) fn new(
        scope: SessionScope,
        scenario_ids: Vec<ScenarioId>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scope,
            scenario_ids,
            current_index: 0,
            records: Vec::new(),
            started_at,
            summary: None,
            result_id: None,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.scope.session_id
    }

    #[must_use]
    pub fn category_id(&self) -> CategoryId {
        self.scope.category_id
    }

    #[must_use]
    pub fn phase_id(&self) -> PhaseId {
        self.scope.phase_id
    }

    #[must_use]
    pub fn category_name(&self) -> &str {
        &self.scope.category_name
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Zero-based index of the scenario on screen.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Scenario ids of the phase, in play order.
    #[must_use]
    pub fn scenario_ids(&self) -> &[ScenarioId] {
        &self.scenario_ids
    }

    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.scenario_ids.len()
    }

    #[must_use]
    pub fn current_scenario_id(&self) -> Option<ScenarioId> {
        self.scenario_ids.get(self.current_index).copied()
    }

    #[must_use]
    pub fn is_last_scenario(&self) -> bool {
        self.current_index + 1 >= self.scenario_ids.len()
    }

    #[must_use]
    pub fn contains(&self, scenario_id: ScenarioId) -> bool {
        self.scenario_ids.contains(&scenario_id)
    }

    #[must_use]
    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    pub fn attempts(&self) -> impl Iterator<Item = &Attempt> {
        self.records.iter().map(AttemptRecord::attempt)
    }

    /// Number of distinct scenarios answered so far.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.attempts()
            .map(Attempt::scenario_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// True once the final scenario of the phase has a recorded attempt.
    #[must_use]
    pub fn final_scenario_answered(&self) -> bool {
        self.scenario_ids
            .last()
            .is_some_and(|last| self.attempts().any(|a| a.scenario_id() == *last))
    }

    /// Summary produced by completion, if the session was completed.
    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Local history row of the completed session, if it was stored.
    #[must_use]
    pub fn result_id(&self) -> Option<i64> {
        self.result_id
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.summary.is_some()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.scenario_count();
        let answered = self.answered_count();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            current_index: self.current_index,
            is_complete: self.is_complete(),
        }
    }

    pub(crate) fn advance(&mut self) -> usize {
        self.current_index = self.current_index.saturating_add(1);
        self.current_index
    }

    pub(crate) fn push_record(&mut self, record: AttemptRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    pub(crate) fn record_mut(&mut self, position: usize) -> Option<&mut AttemptRecord> {
        self.records.get_mut(position)
    }

    pub(crate) fn set_summary(&mut self, summary: SessionSummary, result_id: Option<i64>) {
        self.summary = Some(summary);
        self.result_id = result_id;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.scope.session_id)
            .field("category_id", &self.scope.category_id)
            .field("phase_id", &self.scope.phase_id)
            .field("scenario_count", &self.scenario_ids.len())
            .field("current_index", &self.current_index)
            .field("records_len", &self.records.len())
            .field("is_complete", &self.summary.is_some())
            .field("result_id", &self.result_id)
            .finish_non_exhaustive()
    }
}
