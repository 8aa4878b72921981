use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ScenarioId;
use crate::model::scenario::OptionKey;

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

/// A recorded player answer to one scenario.
///
/// Attempts are immutable once created; the session only ever appends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    scenario_id: ScenarioId,
    selected_option: OptionKey,
    is_correct: bool,
    explanation_shown: bool,
    answered_at: DateTime<Utc>,
}

impl Attempt {
    #[must_use]
    pub fn new(
        scenario_id: ScenarioId,
        selected_option: OptionKey,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scenario_id,
            selected_option,
            is_correct,
            explanation_shown: true,
            answered_at,
        }
    }

    /// Marks whether the explanation text was shown for this answer.
    #[must_use]
    pub fn with_explanation_shown(mut self, shown: bool) -> Self {
        self.explanation_shown = shown;
        self
    }

    #[must_use]
    pub fn scenario_id(&self) -> ScenarioId {
        self.scenario_id
    }

    #[must_use]
    pub fn selected_option(&self) -> &OptionKey {
        &self.selected_option
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn explanation_shown(&self) -> bool {
        self.explanation_shown
    }

    #[must_use]
    pub fn answered_at(&self) -> DateTime<Utc> {
        self.answered_at
    }
}

//
// ─── SUBMISSION STATUS ────────────────────────────────────────────────────────
//

/// Whether the backend has acknowledged an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Accepted,
    Failed { reason: String },
}

impl SubmissionStatus {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionStatus::Accepted)
    }
}

/// An attempt paired with its submission status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    attempt: Attempt,
    submission: SubmissionStatus,
}

impl AttemptRecord {
    #[must_use]
    pub fn pending(attempt: Attempt) -> Self {
        Self {
            attempt,
            submission: SubmissionStatus::Pending,
        }
    }

    #[must_use]
    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    #[must_use]
    pub fn submission(&self) -> &SubmissionStatus {
        &self.submission
    }

    pub fn mark_accepted(&mut self) {
        self.submission = SubmissionStatus::Accepted;
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.submission = SubmissionStatus::Failed {
            reason: reason.into(),
        };
    }
}
