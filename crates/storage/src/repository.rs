use async_trait::async_trait;
use drive_core::model::{CategoryId, PhaseId, SessionSummary};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key under which the backend bearer token is kept in the device store.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A stored session result together with its row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResultRow {
    pub id: i64,
    pub summary: SessionSummary,
}

impl SessionResultRow {
    #[must_use]
    pub fn new(id: i64, summary: SessionSummary) -> Self {
        Self { id, summary }
    }
}

/// Small string key-value store on the device (auth token, preferences).
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Local history of completed phase sessions.
#[async_trait]
pub trait SessionResultRepository: Send + Sync {
    /// Append a completed session and return its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session was already stored.
    async fn append_result(&self, summary: &SessionSummary) -> Result<i64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no result has this id.
    async fn get_result(&self, id: i64) -> Result<SessionSummary, StorageError>;

    /// Most recent results first, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the results cannot be read.
    async fn list_results(
        &self,
        category: Option<CategoryId>,
        limit: u32,
    ) -> Result<Vec<SessionResultRow>, StorageError>;

    /// Highest score recorded for a phase, if it was ever completed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the results cannot be read.
    async fn best_score(
        &self,
        category: CategoryId,
        phase: PhaseId,
    ) -> Result<Option<u32>, StorageError>;
}

/// In-memory implementation for tests and offline runs.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    items: Arc<Mutex<HashMap<String, String>>>,
    results: Arc<Mutex<Vec<SessionSummary>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(err: E) -> StorageError {
    StorageError::Connection(err.to_string())
}

fn row_id(index: usize) -> Result<i64, StorageError> {
    i64::try_from(index + 1).map_err(|_| StorageError::Serialization("row id overflow".into()))
}

#[async_trait]
impl DeviceStore for InMemoryRepository {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.items.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.items.lock().map_err(poisoned)?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.items.lock().map_err(poisoned)?;
        guard.remove(key);
        Ok(())
    }
}

#[async_trait]
impl SessionResultRepository for InMemoryRepository {
    async fn append_result(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        if guard
            .iter()
            .any(|existing| existing.session_id() == summary.session_id())
        {
            return Err(StorageError::Conflict);
        }
        guard.push(summary.clone());
        row_id(guard.len() - 1)
    }

    async fn get_result(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|index| guard.get(index))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        category: Option<CategoryId>,
        limit: u32,
    ) -> Result<Vec<SessionResultRow>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut rows = Vec::new();
        for (index, summary) in guard.iter().enumerate() {
            if category.is_some_and(|c| c != summary.category_id()) {
                continue;
            }
            rows.push(SessionResultRow::new(row_id(index)?, summary.clone()));
        }
        rows.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn best_score(
        &self,
        category: CategoryId,
        phase: PhaseId,
    ) -> Result<Option<u32>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|s| s.category_id() == category && s.phase_id() == phase)
            .map(SessionSummary::score)
            .max())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub device: Arc<dyn DeviceStore>,
    pub results: Arc<dyn SessionResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let device: Arc<dyn DeviceStore> = Arc::new(repo.clone());
        let results: Arc<dyn SessionResultRepository> = Arc::new(repo);
        Self { device, results }
    }
}
