//! SQLite implementation of the SourceRepository port.

use std::sync::Arc;

use async_trait::async_trait;
use gather_core::ports::SourceRepository;
use gather_domain::{
    GatherError, Result, ScrapeStrategy, SelectorSet, SourceDescriptor, SourceRunState,
    SourceSchedule,
};
use rusqlite::{Row, ToSql};
use tracing::{debug, instrument};

use super::manager::{timestamp_opt, DbManager};
use crate::errors::InfraError;

const SOURCE_COLUMNS: &str = "id, name, slug, calendar_id, base_url, list_path, enabled, \
     adapter, selectors_json, interval_hours, cron, last_run_at, last_success_at, \
     last_run_count, total_events, last_error";

/// SQLite implementation of [`SourceRepository`].
pub struct SqliteSourceRepository {
    db: Arc<DbManager>,
}

impl SqliteSourceRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn map_source_row(row: &Row<'_>) -> rusqlite::Result<SourceDescriptor> {
    let adapter: Option<String> = row.get(7)?;
    let selectors_json: Option<String> = row.get(8)?;
    let strategy = match adapter {
        Some(name) => ScrapeStrategy::Custom { adapter: name },
        None => {
            let selectors = selectors_json
                .as_deref()
                .and_then(|json| serde_json::from_str::<SelectorSet>(json).ok())
                .unwrap_or_default();
            ScrapeStrategy::Selectors { selectors }
        }
    };

    let last_run_at: Option<i64> = row.get(11)?;
    let last_success_at: Option<i64> = row.get(12)?;

    Ok(SourceDescriptor {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        calendar_id: row.get(3)?,
        base_url: row.get(4)?,
        list_path: row.get(5)?,
        enabled: row.get(6)?,
        strategy,
        schedule: SourceSchedule { interval_hours: row.get(9)?, cron: row.get(10)? },
        run_state: SourceRunState {
            last_run_at: timestamp_opt(last_run_at),
            last_success_at: timestamp_opt(last_success_at),
            last_run_count: row.get(13)?,
            total_events: row.get(14)?,
            last_error: row.get(15)?,
        },
    })
}

#[async_trait]
impl SourceRepository for SqliteSourceRepository {
    async fn get_source(&self, id: &str) -> Result<SourceDescriptor> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE id = ?1"),
                [&id as &dyn ToSql].as_ref(),
                map_source_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    GatherError::NotFound(format!("source not found: {id}"))
                }
                other => InfraError::from(other).into(),
            })
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    async fn list_enabled(&self) -> Result<Vec<SourceDescriptor>> {
        let db = Arc::clone(&self.db);

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SOURCE_COLUMNS} FROM sources WHERE enabled = 1 ORDER BY name ASC"
                ))
                .map_err(InfraError::from)?;

            let rows = stmt
                .query_map([], map_source_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;

            Ok(rows)
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    #[instrument(skip(self, run_state))]
    async fn update_run_state(&self, id: &str, run_state: &SourceRunState) -> Result<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();
        let run_state = run_state.clone();

        tokio::task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE sources SET
                        last_run_at = ?1,
                        last_success_at = ?2,
                        last_run_count = ?3,
                        total_events = ?4,
                        last_error = ?5
                     WHERE id = ?6",
                    [
                        &run_state.last_run_at.map(|dt| dt.timestamp()) as &dyn ToSql,
                        &run_state.last_success_at.map(|dt| dt.timestamp()),
                        &run_state.last_run_count,
                        &run_state.total_events,
                        &run_state.last_error,
                        &id,
                    ]
                    .as_ref(),
                )
                .map_err(InfraError::from)?;

            if updated == 0 {
                return Err(GatherError::NotFound(format!("source not found: {id}")));
            }
            debug!(source_id = %id, "updated source run state");
            Ok(())
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }

    async fn insert_source(&self, descriptor: &SourceDescriptor) -> Result<()> {
        let db = Arc::clone(&self.db);
        let descriptor = descriptor.clone();

        tokio::task::spawn_blocking(move || {
            let (adapter, selectors_json) = match &descriptor.strategy {
                ScrapeStrategy::Custom { adapter } => (Some(adapter.clone()), None),
                ScrapeStrategy::Selectors { selectors } => {
                    let json = serde_json::to_string(selectors)
                        .map_err(|e| GatherError::Internal(e.to_string()))?;
                    (None, Some(json))
                }
            };

            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sources (
                    id, name, slug, calendar_id, base_url, list_path, enabled,
                    adapter, selectors_json, interval_hours, cron, last_run_at,
                    last_success_at, last_run_count, total_events, last_error,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                [
                    &descriptor.id as &dyn ToSql,
                    &descriptor.name,
                    &descriptor.slug,
                    &descriptor.calendar_id,
                    &descriptor.base_url,
                    &descriptor.list_path,
                    &descriptor.enabled,
                    &adapter,
                    &selectors_json,
                    &descriptor.schedule.interval_hours,
                    &descriptor.schedule.cron,
                    &descriptor.run_state.last_run_at.map(|dt| dt.timestamp()),
                    &descriptor.run_state.last_success_at.map(|dt| dt.timestamp()),
                    &descriptor.run_state.last_run_count,
                    &descriptor.run_state.total_events,
                    &descriptor.run_state.last_error,
                    &chrono::Utc::now().timestamp(),
                ]
                .as_ref(),
            )
            .map_err(InfraError::from)?;

            debug!(source_id = %descriptor.id, slug = %descriptor.slug, "inserted source");
            Ok(())
        })
        .await
        .map_err(|e| GatherError::Internal(e.to_string()))?
    }
}
