//! SQLite implementation of the CalendarRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::ports::CalendarRepository;
use gather_domain::{
    CalendarImport, ExtractionStatus, GatherError, ImportKind, Result,
};
use rusqlite::{Row, ToSql};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::manager::{timestamp_opt, DbManager};
use crate::errors::InfraError;

const CALENDAR_COLUMNS: &str = "id, owner_id, name, import_kind, import_url, import_source_id, \
     import_enabled, sync_interval_hours, last_imported_at, import_error, extraction_prompt, \
     extraction_status, ical_token";

/// SQLite implementation of [`CalendarRepository`].
pub struct SqliteCalendarRepository {
    db: Arc<DbManager>,
}

impl SqliteCalendarRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn map_calendar_row(row: &Row<'_>) -> rusqlite::Result<CalendarImport> {
    let import_kind: Option<String> = row.get(3)?;
    let last_imported_at: Option<i64> = row.get(8)?;
    let extraction_status: Option<String> = row.get(11)?;

    Ok(CalendarImport {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        import_kind: import_kind.as_deref().and_then(ImportKind::from_label),
        import_url: row.get(4)?,
        import_source_id: row.get(5)?,
        import_enabled: row.get(6)?,
        sync_interval_hours: row.get(7)?,
        last_imported_at: timestamp_opt(last_imported_at),
        import_error: row.get(9)?,
        extraction_prompt: row.get(10)?,
        extraction_status: extraction_status.as_deref().and_then(ExtractionStatus::from_label),
        ical_token: row.get(12)?,
    })
}

#[async_trait]
impl CalendarRepository for SqliteCalendarRepository {
    async fn get_calendar(&self, id: &str) -> Result<CalendarImport> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {CALENDAR_COLUMNS} FROM calendars WHERE id = ?1"),
                [&id as &dyn ToSql].as_ref(),
                map_calendar_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    GatherError::NotFound(format!("calendar not found: {id}"))
                }
                other => InfraError::from(other).into(),
            })
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    async fn find_by_ical_token(&self, token: &str) -> Result<Option<CalendarImport>> {
        let db = Arc::clone(&self.db);
        let token = token.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let result = conn.query_row(
                &format!("SELECT {CALENDAR_COLUMNS} FROM calendars WHERE ical_token = ?1"),
                [&token as &dyn ToSql].as_ref(),
                map_calendar_row,
            );

            match result {
                Ok(calendar) => Ok(Some(calendar)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(InfraError::from(e).into()),
            }
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    async fn list_import_enabled(&self) -> Result<Vec<CalendarImport>> {
        let db = Arc::clone(&self.db);

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {CALENDAR_COLUMNS} FROM calendars
                     WHERE import_enabled = 1
                     ORDER BY name ASC"
                ))
                .map_err(InfraError::from)?;

            let rows = stmt
                .query_map([], map_calendar_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;

            Ok(rows)
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    #[instrument(skip(self))]
    async fn update_import_outcome(
        &self,
        id: &str,
        last_imported_at: Option<DateTime<Utc>>,
        error: Option<&str>,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let error = error.map(ToString::to_string);

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let now = Utc::now().timestamp();
            // A successful import stamps last_imported_at; a failed one only
            // records the error.
            let updated = match last_imported_at {
                Some(imported) => conn.execute(
                    "UPDATE calendars SET
                        last_imported_at = ?1, import_error = ?2, updated_at = ?3
                     WHERE id = ?4",
                    [&imported.timestamp() as &dyn ToSql, &error, &now, &id].as_ref(),
                ),
                None => conn.execute(
                    "UPDATE calendars SET import_error = ?1, updated_at = ?2 WHERE id = ?3",
                    [&error as &dyn ToSql, &now, &id].as_ref(),
                ),
            }
            .map_err(InfraError::from)?;

            if updated == 0 {
                return Err(GatherError::NotFound(format!("calendar not found: {id}")));
            }
            debug!(calendar_id = %id, "recorded import outcome");
            Ok(())
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    #[instrument(skip(self))]
    async fn set_extraction_status(
        &self,
        id: &str,
        status: ExtractionStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let error = error.map(ToString::to_string);

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let now = Utc::now().timestamp();
            let updated = match error {
                Some(message) => conn.execute(
                    "UPDATE calendars SET
                        extraction_status = ?1, import_error = ?2, updated_at = ?3
                     WHERE id = ?4",
                    [&status.as_str() as &dyn ToSql, &message, &now, &id].as_ref(),
                ),
                None => conn.execute(
                    "UPDATE calendars SET extraction_status = ?1, updated_at = ?2 WHERE id = ?3",
                    [&status.as_str() as &dyn ToSql, &now, &id].as_ref(),
                ),
            }
            .map_err(InfraError::from)?;

            if updated == 0 {
                return Err(GatherError::NotFound(format!("calendar not found: {id}")));
            }
            debug!(calendar_id = %id, status = status.as_str(), "extraction status transition");
            Ok(())
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    async fn insert_calendar(&self, calendar: &CalendarImport) -> Result<()> {
        let db = Arc::clone(&self.db);
        let calendar = calendar.clone();

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let now = Utc::now().timestamp();
            conn.execute(
                "INSERT INTO calendars (
                    id, owner_id, name, import_kind, import_url, import_source_id,
                    import_enabled, sync_interval_hours, last_imported_at,
                    import_error, extraction_prompt, extraction_status, ical_token,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                [
                    &calendar.id as &dyn ToSql,
                    &calendar.owner_id,
                    &calendar.name,
                    &calendar.import_kind.map(|k| k.as_str()),
                    &calendar.import_url,
                    &calendar.import_source_id,
                    &calendar.import_enabled,
                    &calendar.sync_interval_hours,
                    &calendar.last_imported_at.map(|dt| dt.timestamp()),
                    &calendar.import_error,
                    &calendar.extraction_prompt,
                    &calendar.extraction_status.map(|s| s.as_str()),
                    &calendar.ical_token,
                    &now,
                    &now,
                ]
                .as_ref(),
            )
            .map_err(InfraError::from)?;

            debug!(calendar_id = %calendar.id, "inserted calendar");
            Ok(())
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    async fn find_or_create_owned(&self, owner_id: &str, name: &str) -> Result<CalendarImport> {
        let db = Arc::clone(&self.db);
        let owner_id = owner_id.to_string();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let existing = conn.query_row(
                &format!(
                    "SELECT {CALENDAR_COLUMNS} FROM calendars
                     WHERE owner_id = ?1 AND name = ?2"
                ),
                [&owner_id as &dyn ToSql, &name].as_ref(),
                map_calendar_row,
            );

            match existing {
                Ok(calendar) => Ok(calendar),
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    let id = Uuid::now_v7().to_string();
                    let now = Utc::now().timestamp();
                    conn.execute(
                        "INSERT INTO calendars (
                            id, owner_id, name, import_enabled, sync_interval_hours,
                            created_at, updated_at
                        ) VALUES (?1, ?2, ?3, 0, 24, ?4, ?5)",
                        [&id as &dyn ToSql, &owner_id, &name, &now, &now].as_ref(),
                    )
                    .map_err(InfraError::from)?;

                    debug!(calendar_id = %id, owner = %owner_id, "created owned calendar");
                    Ok(CalendarImport {
                        id,
                        owner_id,
                        name,
                        import_kind: None,
                        import_url: None,
                        import_source_id: None,
                        import_enabled: false,
                        sync_interval_hours: 24,
                        last_imported_at: None,
                        import_error: None,
                        extraction_prompt: None,
                        extraction_status: None,
                        ical_token: None,
                    })
                }
                Err(e) => Err(InfraError::from(e).into()),
            }
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }
}
