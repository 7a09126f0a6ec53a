//! Database migration system

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::StoreError;

/// Manages database schema migrations
pub struct MigrationManager<'a> {
    conn: &'a mut Connection,
}

impl<'a> MigrationManager<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }

    /// Bring the schema up to the latest version. Safe to call on every open.
    pub fn initialize_database(&mut self) -> Result<i32, StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        let current_version = self.get_current_version()?;
        info!("Current database schema version: {}", current_version);

        self.apply_migrations(current_version)
    }

    fn apply_migrations(&mut self, current_version: i32) -> Result<i32, StoreError> {
        let mut version_now = current_version;

        for (version, migration_sql) in get_migrations() {
            if version <= current_version {
                continue;
            }
            info!("Applying migration {}...", version);

            let tx = self.conn.transaction()?;
            if let Err(e) = tx.execute_batch(migration_sql) {
                error!("Failed to apply migration {}: {}", version, e);
                return Err(StoreError::Migration(format!("migration {}: {}", version, e)));
            }
            tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
            tx.commit()?;

            info!("Migration {} applied successfully", version);
            version_now = version;
        }

        Ok(version_now)
    }

    pub fn get_current_version(&self) -> Result<i32, StoreError> {
        current_version(self.conn)
    }

    pub fn has_migration_applied(&self, version: i32) -> Result<bool, StoreError> {
        let applied = self
            .conn
            .query_row(
                "SELECT 1 FROM schema_version WHERE version = ?1",
                [version],
                |_| Ok(()),
            )
            .optional()?;
        Ok(applied.is_some())
    }
}

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![
        (1, include_str!("migrations/001_initial.sql")),
        (2, include_str!("migrations/002_ar_experiences.sql")),
        (3, include_str!("migrations/003_classroom_activity.sql")),
    ]
}

/// Highest migration shipped with this build.
pub fn latest_version() -> i32 {
    get_migrations().last().map(|(version, _)| *version).unwrap_or(0)
}

fn current_version(conn: &Connection) -> Result<i32, StoreError> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub schema_version: i32,
    pub tables: Vec<TableCount>,
    pub database_size_bytes: i64,
}

impl DatabaseStats {
    pub fn rows(&self, table: &str) -> Option<i64> {
        self.tables.iter().find(|t| t.table == table).map(|t| t.rows)
    }

    pub fn total_rows(&self) -> i64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Row counts for `tables`, schema version and on-disk size. Read-only.
pub fn get_database_stats(conn: &Connection, tables: &[&'static str]) -> Result<DatabaseStats, StoreError> {
    let mut counts = Vec::with_capacity(tables.len());
    for &table in tables {
        let rows = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap_or_else(|e| {
                warn!("Failed to get count from table {}: {}", table, e);
                0
            });
        counts.push(TableCount { table, rows });
    }

    let database_size_bytes: i64 = conn
        .query_row(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(DatabaseStats {
        schema_version: current_version(conn)?,
        tables: counts,
        database_size_bytes,
    })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    /// `integrity_check` output other than the single "ok" row.
    pub integrity_problems: Vec<String>,
    pub foreign_key_violations: i64,
}

impl MaintenanceReport {
    pub fn is_healthy(&self) -> bool {
        self.integrity_problems.is_empty() && self.foreign_key_violations == 0
    }
}

pub fn run_maintenance(conn: &Connection) -> Result<MaintenanceReport, StoreError> {
    info!("Running database maintenance...");

    conn.execute_batch("ANALYZE")?;
    conn.execute_batch("PRAGMA incremental_vacuum(100)")?;

    let mut stmt = conn.prepare("PRAGMA integrity_check")?;
    let integrity_problems = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .filter(|line| line != "ok")
        .collect::<Vec<_>>();

    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let foreign_key_violations = stmt.query_map([], |_| Ok(()))?.count() as i64;

    let report = MaintenanceReport {
        integrity_problems,
        foreign_key_violations,
    };
    if report.is_healthy() {
        info!("Database maintenance completed");
    } else {
        warn!(
            "Database maintenance found {} integrity problems and {} foreign key violations",
            report.integrity_problems.len(),
            report.foreign_key_violations
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrated() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        MigrationManager::new(&mut conn).initialize_database().unwrap();
        conn
    }

    // ===== Migration Tests =====

    #[test]
    fn test_fresh_database_reaches_latest_version() {
        let mut conn = migrated();
        let manager = MigrationManager::new(&mut conn);
        assert_eq!(manager.get_current_version().unwrap(), latest_version());
        assert!(manager.has_migration_applied(1).unwrap());
        assert!(manager.has_migration_applied(3).unwrap());
        assert!(!manager.has_migration_applied(99).unwrap());
    }

    #[test]
    fn test_initialize_twice_is_a_no_op() {
        let mut conn = migrated();
        let version = MigrationManager::new(&mut conn).initialize_database().unwrap();
        assert_eq!(version, latest_version());
        let recorded: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(recorded, latest_version() as i64);
    }

    #[test]
    fn test_later_migrations_extend_earlier_tables() {
        let conn = migrated();
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('user_progress')").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert!(columns.contains(&"activity_type".to_string()));
        assert!(columns.contains(&"activity_id".to_string()));
    }

    // ===== Stats and Maintenance Tests =====

    #[test]
    fn test_stats_on_empty_database() {
        let conn = migrated();
        let stats = get_database_stats(&conn, &["users", "badges"]).unwrap();
        assert_eq!(stats.schema_version, latest_version());
        assert_eq!(stats.rows("users"), Some(0));
        assert_eq!(stats.total_rows(), 0);
        assert!(stats.database_size_bytes > 0);
    }

    #[test]
    fn test_maintenance_on_clean_database() {
        let conn = migrated();
        let report = run_maintenance(&conn).unwrap();
        assert!(report.is_healthy());
    }
}
