use drive_core::model::{
    Attempt, CategoryId, OptionKey, PhaseId, SessionId, SessionScope, SessionSummary,
};
use sqlx::Row;
use uuid::Uuid;

use super::SqliteRepository;
use super::mapping::{
    bool_from_i64, category_id_from_i64, conn, count_from_i64, phase_id_from_i64,
    scenario_id_from_i64, ser,
};
use crate::repository::{SessionResultRepository, SessionResultRow, StorageError};

fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<(Attempt, bool), StorageError> {
    let scenario_id =
        scenario_id_from_i64(row.try_get::<i64, _>("scenario_id").map_err(ser)?)?;
    let option: String = row.try_get("selected_option").map_err(ser)?;
    let option = OptionKey::parse(option).map_err(ser)?;
    let is_correct = bool_from_i64("is_correct", row.try_get("is_correct").map_err(ser)?)?;
    let explanation_shown = bool_from_i64(
        "explanation_shown",
        row.try_get("explanation_shown").map_err(ser)?,
    )?;
    let answered_at = row.try_get("answered_at").map_err(ser)?;
    let synced = bool_from_i64("synced", row.try_get("synced").map_err(ser)?)?;

    let attempt = Attempt::new(scenario_id, option, is_correct, answered_at)
        .with_explanation_shown(explanation_shown);
    Ok((attempt, synced))
}

impl SqliteRepository {
    async fn load_attempts(
        &self,
        result_id: i64,
    ) -> Result<(Vec<Attempt>, Vec<bool>), StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    scenario_id, selected_option, is_correct,
                    explanation_shown, answered_at, synced
                FROM session_attempts
                WHERE result_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut attempts = Vec::with_capacity(rows.len());
        let mut synced = Vec::with_capacity(rows.len());
        for row in rows {
            let (attempt, accepted) = map_attempt_row(&row)?;
            attempts.push(attempt);
            synced.push(accepted);
        }
        Ok((attempts, synced))
    }

    async fn map_result_row(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<SessionResultRow, StorageError> {
        let id: i64 = row.try_get("id").map_err(ser)?;
        let session_id: Uuid = row.try_get("session_id").map_err(ser)?;
        let scope = SessionScope {
            session_id: SessionId::from_uuid(session_id),
            category_id: category_id_from_i64(row.try_get("category_id").map_err(ser)?)?,
            phase_id: phase_id_from_i64(row.try_get("phase_id").map_err(ser)?)?,
            category_name: row.try_get("category_name").map_err(ser)?,
        };
        let started_at = row.try_get("started_at").map_err(ser)?;
        let completed_at = row.try_get("completed_at").map_err(ser)?;
        let score = count_from_i64("score", row.try_get("score").map_err(ser)?)?;
        let total = count_from_i64("total", row.try_get("total").map_err(ser)?)?;

        let (attempts, synced) = self.load_attempts(id).await?;
        let summary = SessionSummary::from_persisted(
            scope,
            started_at,
            completed_at,
            score,
            total,
            attempts,
            synced,
        )
        .map_err(ser)?;
        Ok(SessionResultRow::new(id, summary))
    }
}

#[async_trait::async_trait]
impl SessionResultRepository for SqliteRepository {
    async fn append_result(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
                INSERT INTO session_results (
                    session_id, category_id, phase_id, category_name,
                    started_at, completed_at, score, total
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(summary.session_id().as_uuid())
        .bind(i64::from(summary.category_id().value()))
        .bind(i64::from(summary.phase_id().value()))
        .bind(summary.category_name())
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .bind(i64::from(summary.score()))
        .bind(i64::from(summary.total()))
        .execute(&mut *tx)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => conn(other),
        })?;
        let result_id = res.last_insert_rowid();

        for (position, (attempt, synced)) in (0_i64..).zip(summary.attempts_with_sync()) {
            sqlx::query(
                r"
                    INSERT INTO session_attempts (
                        result_id, position, scenario_id, selected_option,
                        is_correct, explanation_shown, answered_at, synced
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )
            .bind(result_id)
            .bind(position)
            .bind(i64::from(attempt.scenario_id().value()))
            .bind(attempt.selected_option().as_str())
            .bind(i64::from(attempt.is_correct()))
            .bind(i64::from(attempt.explanation_shown()))
            .bind(attempt.answered_at())
            .bind(i64::from(synced))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(result_id)
    }

    async fn get_result(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, session_id, category_id, phase_id, category_name,
                    started_at, completed_at, score, total
                FROM session_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        Ok(self.map_result_row(&row).await?.summary)
    }

    async fn list_results(
        &self,
        category: Option<CategoryId>,
        limit: u32,
    ) -> Result<Vec<SessionResultRow>, StorageError> {
        let mut sql = String::from(
            r"
                SELECT
                    id, session_id, category_id, phase_id, category_name,
                    started_at, completed_at, score, total
                FROM session_results
            ",
        );
        if category.is_some() {
            sql.push_str(" WHERE category_id = ?1");
            sql.push_str(" ORDER BY completed_at DESC, id DESC LIMIT ?2");
        } else {
            sql.push_str(" ORDER BY completed_at DESC, id DESC LIMIT ?1");
        }

        let mut query = sqlx::query(&sql);
        if let Some(category) = category {
            query = query.bind(i64::from(category.value()));
        }
        let rows = query
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.map_result_row(row).await?);
        }
        Ok(out)
    }

    async fn best_score(
        &self,
        category: CategoryId,
        phase: PhaseId,
    ) -> Result<Option<u32>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT MAX(score) AS best
                FROM session_results
                WHERE category_id = ?1 AND phase_id = ?2
            ",
        )
        .bind(i64::from(category.value()))
        .bind(i64::from(phase.value()))
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        let best: Option<i64> = row.try_get("best").map_err(ser)?;
        best.map(|v| count_from_i64("score", v)).transpose()
    }
}
