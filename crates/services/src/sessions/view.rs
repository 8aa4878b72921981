use chrono::{DateTime, Utc};
use std::sync::Arc;

use drive_core::model::{CategoryId, PhaseId, SessionSummary};
use storage::repository::{SessionResultRepository, SessionResultRow};

use crate::error::SessionError;

/// Storage identifier for a stored session result.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type SessionResultId = i64;

/// Presentation-agnostic list item for a completed session.
///
/// No pre-formatted strings; the caller formats timestamps and scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResultListItem {
    pub id: SessionResultId,
    pub category_id: CategoryId,
    pub phase_id: PhaseId,
    pub category_name: String,
    pub completed_at: DateTime<Utc>,

    pub score: u32,
    pub total: u32,
    /// Attempts the backend never accepted.
    pub unsynced: u32,
}

impl SessionResultListItem {
    #[must_use]
    pub fn from_summary(id: SessionResultId, summary: &SessionSummary) -> Self {
        Self {
            id,
            category_id: summary.category_id(),
            phase_id: summary.phase_id(),
            category_name: summary.category_name().to_owned(),
            completed_at: summary.completed_at(),
            score: summary.score(),
            total: summary.total(),
            unsynced: u32::try_from(summary.unsynced_count()).unwrap_or(u32::MAX),
        }
    }

    #[must_use]
    pub fn from_row(row: &SessionResultRow) -> Self {
        Self::from_summary(row.id, &row.summary)
    }
}

/// Read side of the local result history.
#[derive(Clone)]
pub struct SessionResultService {
    results: Arc<dyn SessionResultRepository>,
}

impl SessionResultService {
    #[must_use]
    pub fn new(results: Arc<dyn SessionResultRepository>) -> Self {
        Self { results }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(storage::repository::InMemoryRepository::new()))
    }

    /// Most recent results first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        category: Option<CategoryId>,
        limit: u32,
    ) -> Result<Vec<SessionResultListItem>, SessionError> {
        let rows = self.results.list_results(category, limit).await?;
        Ok(rows.iter().map(SessionResultListItem::from_row).collect())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` when repository access fails.
    pub async fn get_result(&self, id: SessionResultId) -> Result<SessionSummary, SessionError> {
        Ok(self.results.get_result(id).await?)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` when repository access fails.
    pub async fn best_score(
        &self,
        category: CategoryId,
        phase: PhaseId,
    ) -> Result<Option<u32>, SessionError> {
        Ok(self.results.best_score(category, phase).await?)
    }
}
