use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::attempt::Attempt;
use crate::model::ids::{CategoryId, PhaseId, ScenarioId, SessionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many attempts for a single session: {len}")]
    TooManyAttempts { len: usize },

    #[error("score ({score}) exceeds total ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("total ({total}) does not match attempt count ({count})")]
    CountMismatch { total: u32, count: usize },

    #[error("{flags} sync flags for {count} attempts")]
    SyncMismatch { flags: usize, count: usize },
}

/// Identity of the phase a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionScope {
    pub session_id: SessionId,
    pub category_id: CategoryId,
    pub phase_id: PhaseId,
    pub category_name: String,
}

/// Aggregate result of a completed phase, used by the results screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    scope: SessionScope,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    score: u32,
    total: u32,
    attempts: Vec<Attempt>,
    /// One flag per attempt, in attempt order.
    synced: Vec<bool>,
}

impl SessionSummary {
    /// Build a summary from the attempts of a finished session.
    ///
    /// `synced[i]` tells whether the backend accepted `attempts[i]`. A scenario
    /// answered more than once keeps one flag per attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `SessionSummaryError::TooManyAttempts` if the count cannot fit in `u32`.
    /// Returns `SessionSummaryError::SyncMismatch` unless there is one flag per attempt.
    pub fn from_attempts(
        scope: SessionScope,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        attempts: Vec<Attempt>,
        synced: Vec<bool>,
    ) -> Result<Self, SessionSummaryError> {
        let total = u32::try_from(attempts.len())
            .map_err(|_| SessionSummaryError::TooManyAttempts { len: attempts.len() })?;
        let score = attempts.iter().filter(|a| a.is_correct()).count();
        let score = u32::try_from(score).unwrap_or(total);

        Self::from_persisted(scope, started_at, completed_at, score, total, attempts, synced)
    }

    /// Rehydrate a summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if the persisted values are inconsistent.
    pub fn from_persisted(
        scope: SessionScope,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        score: u32,
        total: u32,
        attempts: Vec<Attempt>,
        synced: Vec<bool>,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        if score > total {
            return Err(SessionSummaryError::ScoreExceedsTotal { score, total });
        }
        if usize::try_from(total).ok() != Some(attempts.len()) {
            return Err(SessionSummaryError::CountMismatch {
                total,
                count: attempts.len(),
            });
        }
        if synced.len() != attempts.len() {
            return Err(SessionSummaryError::SyncMismatch {
                flags: synced.len(),
                count: attempts.len(),
            });
        }

        Ok(Self {
            scope,
            started_at,
            completed_at,
            score,
            total,
            attempts,
            synced,
        })
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

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Number of correctly answered scenarios.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// Whether the backend accepted the attempt at `position`.
    #[must_use]
    pub fn is_synced(&self, position: usize) -> bool {
        self.synced.get(position).copied().unwrap_or(false)
    }

    /// Attempts paired with their sync flag, in attempt order.
    pub fn attempts_with_sync(&self) -> impl Iterator<Item = (&Attempt, bool)> {
        self.attempts.iter().zip(self.synced.iter().copied())
    }

    /// Scenario ids of attempts that never reached the backend, one entry per attempt.
    #[must_use]
    pub fn unsynced(&self) -> Vec<ScenarioId> {
        self.attempts_with_sync()
            .filter(|(_, synced)| !synced)
            .map(|(attempt, _)| attempt.scenario_id())
            .collect()
    }

    #[must_use]
    pub fn unsynced_count(&self) -> usize {
        self.synced.iter().filter(|synced| !**synced).count()
    }

    #[must_use]
    pub fn is_fully_synced(&self) -> bool {
        self.synced.iter().all(|synced| *synced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OptionKey;
    use crate::time::fixed_now;

    fn scope() -> SessionScope {
        SessionScope {
            session_id: SessionId::generate(),
            category_id: CategoryId::new(3),
            phase_id: PhaseId::new(1),
            category_name: "Intersection".into(),
        }
    }

    fn attempt(id: u32, correct: bool) -> Attempt {
        Attempt::new(
            ScenarioId::new(id),
            OptionKey::parse("A").unwrap(),
            correct,
            fixed_now(),
        )
    }

    #[test]
    fn summary_counts_correct_answers() {
        let now = fixed_now();
        let summary = SessionSummary::from_attempts(
            scope(),
            now,
            now,
            vec![attempt(61, true), attempt(62, false), attempt(63, true)],
            vec![true, false, true],
        )
        .unwrap();

        assert_eq!(summary.score(), 2);
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_fully_synced());
        assert_eq!(summary.unsynced(), vec![ScenarioId::new(62)]);
    }

    #[test]
    fn repeated_scenario_keeps_sync_per_attempt() {
        let now = fixed_now();
        let summary = SessionSummary::from_attempts(
            scope(),
            now,
            now,
            vec![attempt(61, false), attempt(61, true)],
            vec![false, true],
        )
        .unwrap();

        assert_eq!(summary.unsynced(), vec![ScenarioId::new(61)]);
        assert_eq!(summary.unsynced_count(), 1);
        assert!(!summary.is_synced(0));
        assert!(summary.is_synced(1));
    }

    #[test]
    fn sync_flags_must_cover_every_attempt() {
        let now = fixed_now();
        let err = SessionSummary::from_attempts(
            scope(),
            now,
            now,
            vec![attempt(61, true), attempt(62, true)],
            vec![true],
        )
        .unwrap_err();
        assert_eq!(err, SessionSummaryError::SyncMismatch { flags: 1, count: 2 });
    }

    #[test]
    fn summary_rejects_inverted_time_range() {
        let now = fixed_now();
        let err = SessionSummary::from_attempts(
            scope(),
            now,
            now - chrono::Duration::seconds(1),
            Vec::new(),
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, SessionSummaryError::InvalidTimeRange);
    }

    #[test]
    fn persisted_summary_must_match_attempts() {
        let now = fixed_now();
        let err = SessionSummary::from_persisted(
            scope(),
            now,
            now,
            1,
            2,
            vec![attempt(61, true)],
            Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err, SessionSummaryError::CountMismatch { total: 2, count: 1 });
    }
}
