//! SQLite implementation of the EventRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use gather_core::ports::EventRepository;
use gather_domain::constants::DEFAULT_EVENT_DURATION_SECS;
use gather_domain::types::event::validate_ownership;
use gather_domain::{Event, EventDraft, EventType, GatherError, Result};
use rusqlite::{Row, ToSql};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::DbManager;
use crate::errors::InfraError;

const EVENT_COLUMNS: &str = "id, title, starts_at, ends_at, all_day, location, venue, \
     description, event_type, image_url, source_name, source_id, source_url, calendar_id, \
     post_id, created_at, updated_at";

/// SQLite implementation of [`EventRepository`].
pub struct SqliteEventRepository {
    db: Arc<DbManager>,
}

impl SqliteEventRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let starts_at: i64 = row.get(2)?;
    let ends_at: Option<i64> = row.get(3)?;
    let event_type: String = row.get(8)?;
    let created_at: i64 = row.get(15)?;
    let updated_at: i64 = row.get(16)?;

    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        starts_at: DateTime::from_timestamp(starts_at, 0).unwrap_or_default(),
        ends_at: ends_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        all_day: row.get(4)?,
        location: row.get(5)?,
        venue: row.get(6)?,
        description: row.get(7)?,
        event_type: EventType::from_label(&event_type),
        image_url: row.get(9)?,
        source_name: row.get(10)?,
        source_id: row.get(11)?,
        source_url: row.get(12)?,
        calendar_id: row.get(13)?,
        post_id: row.get(14)?,
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
        updated_at: DateTime::from_timestamp(updated_at, 0).unwrap_or_default(),
    })
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    async fn insert_event(&self, draft: &EventDraft) -> Result<Event> {
        let db = Arc::clone(&self.db);
        let draft = draft.clone();

        tokio::task::spawn_blocking(move || {
            if draft.title.trim().is_empty() {
                return Err(GatherError::InvalidInput("title is required".into()));
            }
            let starts_at = draft
                .starts_at
                .ok_or_else(|| GatherError::InvalidInput("start time is required".into()))?;
            if let Some(ends_at) = draft.ends_at {
                if ends_at < starts_at {
                    return Err(GatherError::InvalidInput(
                        "end time must not precede start time".into(),
                    ));
                }
            }
            validate_ownership(draft.calendar_id.as_deref(), draft.post_id.as_deref())?;

            let now = Utc::now();
            let id = Uuid::now_v7().to_string();
            // Keep the occupancy range in sync: effective end defaults to
            // one hour past the start.
            let occurs_end = draft
                .ends_at
                .unwrap_or_else(|| starts_at + Duration::seconds(DEFAULT_EVENT_DURATION_SECS));

            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO events (
                    id, title, starts_at, ends_at, all_day, location, venue,
                    description, event_type, image_url, source_name, source_id,
                    source_url, calendar_id, post_id, occurs_start_ts,
                    occurs_end_ts, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                [
                    &id as &dyn ToSql,
                    &draft.title,
                    &starts_at.timestamp(),
                    &draft.ends_at.map(|dt| dt.timestamp()),
                    &draft.all_day,
                    &draft.location,
                    &draft.venue,
                    &draft.description,
                    &draft.event_type.as_str(),
                    &draft.image_url,
                    &draft.source_name,
                    &draft.source_id,
                    &draft.source_url,
                    &draft.calendar_id,
                    &draft.post_id,
                    &starts_at.timestamp(),
                    &occurs_end.timestamp(),
                    &now.timestamp(),
                    &now.timestamp(),
                ]
                .as_ref(),
            )
            .map_err(InfraError::from)?;

            debug!(event_id = %id, "inserted event");

            Ok(Event {
                id,
                title: draft.title,
                starts_at,
                ends_at: draft.ends_at,
                all_day: draft.all_day,
                location: draft.location,
                venue: draft.venue,
                description: draft.description,
                event_type: draft.event_type,
                image_url: draft.image_url,
                source_name: draft.source_name,
                source_id: draft.source_id,
                source_url: draft.source_url,
                calendar_id: draft.calendar_id,
                post_id: draft.post_id,
                created_at: now,
                updated_at: now,
            })
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    async fn find_by_source_ref(
        &self,
        source_name: &str,
        source_id: &str,
    ) -> Result<Option<Event>> {
        let db = Arc::clone(&self.db);
        let source_name = source_name.to_string();
        let source_id = source_id.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let result = conn.query_row(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events
                     WHERE source_name = ?1 AND source_id = ?2"
                ),
                [&source_name as &dyn ToSql, &source_id].as_ref(),
                map_event_row,
            );

            match result {
                Ok(event) => Ok(Some(event)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(InfraError::from(e).into()),
            }
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    async fn find_by_day(&self, day: NaiveDate) -> Result<Vec<Event>> {
        let (Some(start), Some(end)) = (
            day.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            day.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc()),
        ) else {
            return Err(GatherError::InvalidInput(format!("invalid day: {day}")));
        };
        self.query_range(start, end, usize::MAX, false).await
    }

    async fn find_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Event>> {
        self.query_range(start, end, limit, false).await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Event>> {
        let db = Arc::clone(&self.db);
        let needle = format!("%{}%", query.to_lowercase());

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events
                     WHERE lower(title) LIKE ?1
                        OR lower(ifnull(description, '')) LIKE ?1
                        OR lower(ifnull(venue, '')) LIKE ?1
                     ORDER BY starts_at ASC
                     LIMIT ?2"
                ))
                .map_err(InfraError::from)?;

            let rows = stmt
                .query_map([&needle as &dyn ToSql, &(limit as i64)].as_ref(), map_event_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;

            Ok(rows)
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    async fn find_source_attributed(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Event>> {
        let (Some(start), Some(end)) = (
            from.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            to.and_hms_opt(23, 59, 59).map(|dt| dt.and_utc()),
        ) else {
            return Err(GatherError::InvalidInput(format!("invalid day window: {from}..{to}")));
        };
        self.query_range(start, end, usize::MAX, true).await
    }

    async fn delete_event(&self, id: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let deleted = conn
                .execute("DELETE FROM events WHERE id = ?1", [&id as &dyn ToSql].as_ref())
                .map_err(InfraError::from)?;
            if deleted == 0 {
                return Err(GatherError::NotFound(format!("event not found: {id}")));
            }
            debug!(event_id = %id, "deleted event");
            Ok(())
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }
}

impl SqliteEventRepository {
    async fn query_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
        source_attributed_only: bool,
    ) -> Result<Vec<Event>> {
        let db = Arc::clone(&self.db);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let filter = if source_attributed_only { "AND source_name IS NOT NULL" } else { "" };
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events
                     WHERE starts_at >= ?1 AND starts_at <= ?2 {filter}
                     ORDER BY starts_at ASC
                     LIMIT ?3"
                ))
                .map_err(InfraError::from)?;

            let rows = stmt
                .query_map(
                    [&start.timestamp() as &dyn ToSql, &end.timestamp(), &limit].as_ref(),
                    map_event_row,
                )
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;

            Ok(rows)
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }
}
