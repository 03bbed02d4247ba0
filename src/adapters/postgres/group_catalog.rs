//! PostgreSQL implementation of GroupCatalog.
//!
//! Reads the groups/classes/schedule_items tables owned by the classes
//! module. Strictly read-only.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Weekday;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::foundation::{
    BranchId, CenterId, ClassId, DomainError, ErrorCode, GroupId, ScheduleItemId, TeacherId,
};
use crate::domain::scheduling::{ClassStatus, GroupWithClass, ScheduleItem};
use crate::ports::GroupCatalog;

const GROUP_COLUMNS: &str = "g.id AS group_id, c.center_id, c.branch_id, g.class_id, \
     c.teacher_id, c.status AS class_status, c.duration_minutes, \
     c.start_date, c.end_date, c.timezone";

/// PostgreSQL implementation of GroupCatalog.
#[derive(Clone)]
pub struct PostgresGroupCatalog {
    pool: PgPool,
}

impl PostgresGroupCatalog {
    /// Creates a new PostgresGroupCatalog.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn schedule_items_for(
        &self,
        group_ids: &[GroupId],
    ) -> Result<HashMap<GroupId, Vec<ScheduleItem>>, DomainError> {
        let ids: Vec<Uuid> = group_ids.iter().map(|g| *g.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT id, group_id, weekday, start_time FROM schedule_items \
             WHERE group_id = ANY($1) ORDER BY group_id, weekday, start_time",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch schedule items", e))?;

        let mut by_group: HashMap<GroupId, Vec<ScheduleItem>> = HashMap::new();
        for row in rows {
            let group_id = GroupId::from_uuid(
                row.try_get("group_id")
                    .map_err(|e| db_error("read schedule item row", e))?,
            );
            let weekday_raw: i16 = row
                .try_get("weekday")
                .map_err(|e| db_error("read schedule item row", e))?;
            let start_raw: String = row
                .try_get("start_time")
                .map_err(|e| db_error("read schedule item row", e))?;

            let item = ScheduleItem {
                id: ScheduleItemId::from_uuid(
                    row.try_get("id")
                        .map_err(|e| db_error("read schedule item row", e))?,
                ),
                group_id,
                weekday: weekday_from_db(weekday_raw)?,
                start_time: ScheduleItem::parse_start_time(&start_raw)
                    .map_err(DomainError::from)?,
            };
            by_group.entry(group_id).or_default().push(item);
        }
        Ok(by_group)
    }
}

#[async_trait]
impl GroupCatalog for PostgresGroupCatalog {
    async fn group_with_class(
        &self,
        group_id: GroupId,
    ) -> Result<Option<GroupWithClass>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM groups g JOIN classes c ON c.id = g.class_id WHERE g.id = $1",
            GROUP_COLUMNS
        ))
        .bind(group_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("fetch group", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut group = row_to_group(row)?;
        let mut items = self.schedule_items_for(&[group.group_id]).await?;
        group.schedule_items = items.remove(&group.group_id).unwrap_or_default();
        Ok(Some(group))
    }

    async fn active_groups(&self) -> Result<Vec<GroupWithClass>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM groups g JOIN classes c ON c.id = g.class_id \
             WHERE c.status = 'active' ORDER BY g.id",
            GROUP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("fetch active groups", e))?;

        let mut groups: Vec<GroupWithClass> = rows
            .into_iter()
            .map(row_to_group)
            .collect::<Result<_, _>>()?;

        let group_ids: Vec<GroupId> = groups.iter().map(|g| g.group_id).collect();
        let mut items = self.schedule_items_for(&group_ids).await?;
        for group in &mut groups {
            group.schedule_items = items.remove(&group.group_id).unwrap_or_default();
        }
        Ok(groups)
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Failed to {}: {}", context, e),
    )
}

fn weekday_from_db(raw: i16) -> Result<Weekday, DomainError> {
    // 0 = Monday .. 6 = Sunday, matching ISO-8601 ordering.
    let weekday = match raw {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        6 => Weekday::Sun,
        other => {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Unknown weekday in storage: {}", other),
            ))
        }
    };
    Ok(weekday)
}

fn row_to_group(row: sqlx::postgres::PgRow) -> Result<GroupWithClass, DomainError> {
    let status_raw: String = row
        .try_get("class_status")
        .map_err(|e| db_error("read group row", e))?;
    let class_status = ClassStatus::from_db_str(&status_raw).ok_or_else(|| {
        DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown class status in storage: {}", status_raw),
        )
    })?;

    let timezone_raw: String = row
        .try_get("timezone")
        .map_err(|e| db_error("read group row", e))?;
    let timezone: chrono_tz::Tz = timezone_raw.parse().map_err(|_| {
        DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown timezone in storage: {}", timezone_raw),
        )
    })?;

    let duration_minutes: i32 = row
        .try_get("duration_minutes")
        .map_err(|e| db_error("read group row", e))?;

    Ok(GroupWithClass {
        group_id: GroupId::from_uuid(
            row.try_get("group_id")
                .map_err(|e| db_error("read group row", e))?,
        ),
        center_id: CenterId::from_uuid(
            row.try_get("center_id")
                .map_err(|e| db_error("read group row", e))?,
        ),
        branch_id: BranchId::from_uuid(
            row.try_get("branch_id")
                .map_err(|e| db_error("read group row", e))?,
        ),
        class_id: ClassId::from_uuid(
            row.try_get("class_id")
                .map_err(|e| db_error("read group row", e))?,
        ),
        teacher_id: TeacherId::from_uuid(
            row.try_get("teacher_id")
                .map_err(|e| db_error("read group row", e))?,
        ),
        class_status,
        duration_minutes: duration_minutes.max(0) as u32,
        class_start_date: row
            .try_get("start_date")
            .map_err(|e| db_error("read group row", e))?,
        class_end_date: row
            .try_get("end_date")
            .map_err(|e| db_error("read group row", e))?,
        timezone,
        schedule_items: Vec::new(),
    })
}
