//! Shared harness for infra integration tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use gather_domain::{
    CalendarImport, EventDraft, ImportKind, ScrapeStrategy, SelectorSet, SourceDescriptor,
    SourceRunState, SourceSchedule,
};
use gather_infra::database::DbManager;
use tempfile::TempDir;

/// Temporary database that keeps the underlying file alive for the duration
/// of a test.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        init_tracing();

        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("gather-test.db");

        let manager =
            Arc::new(DbManager::new(&db_path, 4).expect("db manager should be created"));
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager, _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Route test logs through the usual subscriber when RUST_LOG asks for them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[allow(dead_code)]
pub fn draft(title: &str, year: i32, month: u32, day: u32, hour: u32) -> EventDraft {
    EventDraft {
        title: title.into(),
        starts_at: Some(Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()),
        calendar_id: Some("cal-1".into()),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn descriptor(id: &str, slug: &str) -> SourceDescriptor {
    SourceDescriptor {
        id: id.into(),
        name: slug.to_uppercase(),
        slug: slug.into(),
        calendar_id: None,
        base_url: "https://example.test".into(),
        list_path: "/events".into(),
        enabled: true,
        strategy: ScrapeStrategy::Selectors { selectors: SelectorSet::default() },
        schedule: SourceSchedule::default(),
        run_state: SourceRunState::default(),
    }
}

#[allow(dead_code)]
pub fn calendar(id: &str, kind: ImportKind) -> CalendarImport {
    CalendarImport {
        id: id.into(),
        owner_id: "user-1".into(),
        name: format!("Calendar {id}"),
        import_kind: Some(kind),
        import_url: Some("https://example.test/feed.ics".into()),
        import_source_id: None,
        import_enabled: true,
        sync_interval_hours: 6,
        last_imported_at: None,
        import_error: None,
        extraction_prompt: None,
        extraction_status: None,
        ical_token: None,
    }
}
