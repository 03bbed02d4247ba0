//! PostgreSQL implementation of SessionsStore.
//!
//! The `UNIQUE (group_id, start_time)` constraint on the sessions table
//! (see migrations) is the mutual-exclusion primitive for concurrent
//! materialization; both insert paths rely on `ON CONFLICT DO NOTHING`
//! and report whether a row was actually written.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::domain::foundation::{
    BranchId, CenterId, ClassId, DomainError, ErrorCode, GroupId, ScheduleItemId, SessionId,
    TeacherId, Timestamp,
};
use crate::domain::scheduling::{Session, SessionStatus, TimeWindow};
use crate::ports::{ConflictKey, SessionsStore};

const SESSION_COLUMNS: &str = "id, group_id, center_id, branch_id, class_id, teacher_id, \
     schedule_item_id, title, start_time, end_time, status, is_extra, \
     actual_start_time, actual_finish_time, created_at, updated_at";

/// PostgreSQL implementation of SessionsStore.
#[derive(Clone)]
pub struct PostgresSessionsStore {
    pool: PgPool,
}

impl PostgresSessionsStore {
    /// Creates a new PostgresSessionsStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionsStore for PostgresSessionsStore {
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch session", e))?;

        row.map(row_to_session).transpose()
    }

    async fn find_by_group_and_start_time(
        &self,
        group_id: GroupId,
        start_time: Timestamp,
    ) -> Result<Option<Session>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM sessions WHERE group_id = $1 AND start_time = $2",
            SESSION_COLUMNS
        ))
        .bind(group_id.as_uuid())
        .bind(start_time.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch session by slot", e))?;

        row.map(row_to_session).transpose()
    }

    async fn find_in_window(
        &self,
        group_ids: &[GroupId],
        window: TimeWindow,
    ) -> Result<Vec<Session>, DomainError> {
        let ids: Vec<Uuid> = group_ids.iter().map(|g| *g.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {} FROM sessions \
             WHERE group_id = ANY($1) AND start_time >= $2 AND start_time < $3 \
             ORDER BY start_time, group_id",
            SESSION_COLUMNS
        ))
        .bind(ids)
        .bind(window.start().as_datetime())
        .bind(window.end().as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch sessions in window", e))?;

        rows.into_iter().map(row_to_session).collect()
    }

    async fn find_overlapping(
        &self,
        key: ConflictKey,
        window: TimeWindow,
        exclude: Option<SessionId>,
    ) -> Result<Option<Session>, DomainError> {
        let (column, key_uuid) = match key {
            ConflictKey::Teacher(teacher_id) => ("teacher_id", *teacher_id.as_uuid()),
            ConflictKey::Group(group_id) => ("group_id", *group_id.as_uuid()),
        };
        let row = sqlx::query(&format!(
            "SELECT {} FROM sessions \
             WHERE {} = $1 AND start_time < $2 AND end_time > $3 \
               AND ($4::uuid IS NULL OR id <> $4) \
             ORDER BY start_time, id LIMIT 1",
            SESSION_COLUMNS, column
        ))
        .bind(key_uuid)
        .bind(window.end().as_datetime())
        .bind(window.start().as_datetime())
        .bind(exclude.map(|id| *id.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch overlapping session", e))?;

        row.map(row_to_session).transpose()
    }

    async fn insert_ignoring_conflict(&self, session: &Session) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (
                id, group_id, center_id, branch_id, class_id, teacher_id,
                schedule_item_id, title, start_time, end_time, status, is_extra,
                actual_start_time, actual_finish_time, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (group_id, start_time) DO NOTHING
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.group_id().as_uuid())
        .bind(session.center_id().as_uuid())
        .bind(session.branch_id().as_uuid())
        .bind(session.class_id().as_uuid())
        .bind(session.teacher_id().as_uuid())
        .bind(session.schedule_item_id().map(|i| *i.as_uuid()))
        .bind(session.title())
        .bind(session.start_time().as_datetime())
        .bind(session.end_time().as_datetime())
        .bind(session.status().as_db_str())
        .bind(session.is_extra())
        .bind(session.actual_start_time().map(|t| *t.as_datetime()))
        .bind(session.actual_finish_time().map(|t| *t.as_datetime()))
        .bind(session.created_at().as_datetime())
        .bind(session.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert session", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn update(&self, session: &Session) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET
                title = $2,
                start_time = $3,
                end_time = $4,
                status = $5,
                actual_start_time = $6,
                actual_finish_time = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.title())
        .bind(session.start_time().as_datetime())
        .bind(session.end_time().as_datetime())
        .bind(session.status().as_db_str())
        .bind(session.actual_start_time().map(|t| *t.as_datetime()))
        .bind(session.actual_finish_time().map(|t| *t.as_datetime()))
        .bind(session.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update session", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", session.id()),
            ));
        }
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete session", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Session not found: {}", id),
            ));
        }
        Ok(())
    }

    async fn bulk_insert_missed(&self, sessions: &[Session]) -> Result<u64, DomainError> {
        if sessions.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO sessions (id, group_id, center_id, branch_id, class_id, teacher_id, \
             schedule_item_id, title, start_time, end_time, status, is_extra, \
             actual_start_time, actual_finish_time, created_at, updated_at) ",
        );
        builder.push_values(sessions, |mut b, session| {
            b.push_bind(*session.id().as_uuid())
                .push_bind(*session.group_id().as_uuid())
                .push_bind(*session.center_id().as_uuid())
                .push_bind(*session.branch_id().as_uuid())
                .push_bind(*session.class_id().as_uuid())
                .push_bind(*session.teacher_id().as_uuid())
                .push_bind(session.schedule_item_id().map(|i| *i.as_uuid()))
                .push_bind(session.title().map(|t| t.to_string()))
                .push_bind(*session.start_time().as_datetime())
                .push_bind(*session.end_time().as_datetime())
                .push_bind(session.status().as_db_str())
                .push_bind(session.is_extra())
                .push_bind(session.actual_start_time().map(|t| *t.as_datetime()))
                .push_bind(session.actual_finish_time().map(|t| *t.as_datetime()))
                .push_bind(*session.created_at().as_datetime())
                .push_bind(*session.updated_at().as_datetime());
        });
        builder.push(" ON CONFLICT (group_id, start_time) DO NOTHING");

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("bulk insert missed sessions", e))?;

        Ok(result.rows_affected())
    }

    async fn find_stale_scheduled(&self, cutoff: Timestamp) -> Result<Vec<Session>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM sessions \
             WHERE status = 'scheduled' AND start_time < $1 \
             ORDER BY start_time, id",
            SESSION_COLUMNS
        ))
        .bind(cutoff.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch stale scheduled sessions", e))?;

        rows.into_iter().map(row_to_session).collect()
    }

    async fn delete_future_unstarted(
        &self,
        group_id: GroupId,
        after: Timestamp,
    ) -> Result<Vec<Session>, DomainError> {
        let rows = sqlx::query(&format!(
            "DELETE FROM sessions \
             WHERE group_id = $1 AND is_extra = FALSE AND status = 'scheduled' \
               AND start_time > $2 \
               AND actual_start_time IS NULL AND actual_finish_time IS NULL \
             RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(group_id.as_uuid())
        .bind(after.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("purge future sessions", e))?;

        rows.into_iter().map(row_to_session).collect()
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Failed to {}: {}", context, e),
    )
}

fn row_to_session(row: sqlx::postgres::PgRow) -> Result<Session, DomainError> {
    let status_raw: String = row
        .try_get("status")
        .map_err(|e| db_error("read status column", e))?;
    let status = SessionStatus::from_db_str(&status_raw).ok_or_else(|| {
        DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown session status in storage: {}", status_raw),
        )
    })?;

    let get_uuid = |name: &str| -> Result<Uuid, DomainError> {
        row.try_get::<Uuid, _>(name)
            .map_err(|e| db_error("read session row", e))
    };

    Ok(Session::reconstitute(
        SessionId::from_uuid(get_uuid("id")?),
        GroupId::from_uuid(get_uuid("group_id")?),
        CenterId::from_uuid(get_uuid("center_id")?),
        BranchId::from_uuid(get_uuid("branch_id")?),
        ClassId::from_uuid(get_uuid("class_id")?),
        TeacherId::from_uuid(get_uuid("teacher_id")?),
        row.try_get::<Option<Uuid>, _>("schedule_item_id")
            .map_err(|e| db_error("read session row", e))?
            .map(ScheduleItemId::from_uuid),
        row.try_get("title")
            .map_err(|e| db_error("read session row", e))?,
        Timestamp::from_datetime(
            row.try_get("start_time")
                .map_err(|e| db_error("read session row", e))?,
        ),
        Timestamp::from_datetime(
            row.try_get("end_time")
                .map_err(|e| db_error("read session row", e))?,
        ),
        status,
        row.try_get("is_extra")
            .map_err(|e| db_error("read session row", e))?,
        row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("actual_start_time")
            .map_err(|e| db_error("read session row", e))?
            .map(Timestamp::from_datetime),
        row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>("actual_finish_time")
            .map_err(|e| db_error("read session row", e))?
            .map(Timestamp::from_datetime),
        Timestamp::from_datetime(
            row.try_get("created_at")
                .map_err(|e| db_error("read session row", e))?,
        ),
        Timestamp::from_datetime(
            row.try_get("updated_at")
                .map_err(|e| db_error("read session row", e))?,
        ),
    ))
}
