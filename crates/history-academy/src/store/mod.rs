//! SQLite-backed store for every platform entity
pub mod columns;
pub mod migration;
pub mod record;
pub mod repository;

pub use columns::{Bag, ColumnSet};
pub use migration::{DatabaseStats, MaintenanceReport, MigrationManager, TableCount};
pub use record::{Dependent, Record, Reference, UniqueKey};
pub use repository::{Deletion, Repository};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::schema::*;

/// Every managed table, parents before children.
pub const TABLES: &[&str] = &[
    "users",
    "historical_periods",
    "learning_modules",
    "teaching_materials",
    "lesson_plans",
    "student_activities",
    "quiz_levels",
    "quiz_questions",
    "quiz_attempts",
    "vocabulary_terms",
    "term_connections",
    "historical_figures",
    "diary_entries",
    "multimedia_items",
    "ar_models",
    "ar_triggers",
    "ar_experiences",
    "ar_interactions",
    "badges",
    "user_badges",
    "student_rewards",
    "user_progress",
    "usage_analytics",
];

pub struct Database {
    pub users: Repository<User>,
    pub periods: Repository<HistoricalPeriod>,
    pub modules: Repository<LearningModule>,
    pub materials: Repository<TeachingMaterial>,
    pub lesson_plans: Repository<LessonPlan>,
    pub activities: Repository<StudentActivity>,
    pub quiz_levels: Repository<QuizLevel>,
    pub questions: Repository<QuizQuestion>,
    pub attempts: Repository<QuizAttempt>,
    pub terms: Repository<VocabularyTerm>,
    pub term_connections: Repository<TermConnection>,
    pub figures: Repository<HistoricalFigure>,
    pub diary_entries: Repository<DiaryEntry>,
    pub multimedia: Repository<MultimediaItem>,
    pub ar_models: Repository<ArModel>,
    pub ar_triggers: Repository<ArTrigger>,
    pub ar_experiences: Repository<ArExperience>,
    pub ar_interactions: Repository<ArInteraction>,
    pub badges: Repository<Badge>,
    pub user_badges: Repository<UserBadge>,
    pub rewards: Repository<StudentReward>,
    pub progress: Repository<UserProgress>,
    pub analytics: Repository<UsageAnalytics>,
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl Database {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        if config.in_memory {
            Self::new_in_memory()
        } else {
            Self::with_options(&config.db_path, config.pool_size, config.busy_timeout_ms)
        }
    }

    pub fn new(db_path: &Path) -> Result<Self, StoreError> {
        let defaults = StoreConfig::default();
        Self::with_options(db_path, defaults.pool_size, defaults.busy_timeout_ms)
    }

    fn with_options(db_path: &Path, pool_size: u32, busy_timeout_ms: u64) -> Result<Self, StoreError> {
        info!("Opening history academy database at: {}", db_path.display());
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Migration(format!("cannot create {}: {}", parent.display(), e)))?;
        }

        let busy_timeout = Duration::from_millis(busy_timeout_ms);
        let manager = SqliteConnectionManager::file(db_path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )
        });
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;

        Self::from_pool(pool)
    }

    /// A private in-memory database. The pool holds a single connection so every
    /// repository sees the same data.
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;

        Self::from_pool(pool)
    }

    fn from_pool(pool: Pool<SqliteConnectionManager>) -> Result<Self, StoreError> {
        {
            let mut conn = pool.get()?;
            let version = MigrationManager::new(&mut conn).initialize_database()?;
            info!("Database schema at version {}", version);
        }

        let pool = Arc::new(pool);
        Ok(Self {
            users: Repository::new(Arc::clone(&pool)),
            periods: Repository::new(Arc::clone(&pool)),
            modules: Repository::new(Arc::clone(&pool)),
            materials: Repository::new(Arc::clone(&pool)),
            lesson_plans: Repository::new(Arc::clone(&pool)),
            activities: Repository::new(Arc::clone(&pool)),
            quiz_levels: Repository::new(Arc::clone(&pool)),
            questions: Repository::new(Arc::clone(&pool)),
            attempts: Repository::new(Arc::clone(&pool)),
            terms: Repository::new(Arc::clone(&pool)),
            term_connections: Repository::new(Arc::clone(&pool)),
            figures: Repository::new(Arc::clone(&pool)),
            diary_entries: Repository::new(Arc::clone(&pool)),
            multimedia: Repository::new(Arc::clone(&pool)),
            ar_models: Repository::new(Arc::clone(&pool)),
            ar_triggers: Repository::new(Arc::clone(&pool)),
            ar_experiences: Repository::new(Arc::clone(&pool)),
            ar_interactions: Repository::new(Arc::clone(&pool)),
            badges: Repository::new(Arc::clone(&pool)),
            user_badges: Repository::new(Arc::clone(&pool)),
            rewards: Repository::new(Arc::clone(&pool)),
            progress: Repository::new(Arc::clone(&pool)),
            analytics: Repository::new(Arc::clone(&pool)),
            pool,
        })
    }

    /// Run `f` inside one IMMEDIATE transaction: committed on `Ok`, rolled back on `Err`.
    ///
    /// Use the `Repository::*_in` functions inside the closure, e.g.
    /// `Repository::<User>::create_in(conn, &input)`.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(e) => {
                debug!("Rolling back transaction: {}", e);
                tx.rollback()?;
                Err(e)
            }
        }
    }

    /// Whether the row a progress entry's activity reference points at currently exists.
    pub fn resolve_activity(&self, kind: TrackedActivity, id: i64) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let found = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", kind.table()),
                [id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_stats(&self) -> Result<DatabaseStats, StoreError> {
        let conn = self.pool.get()?;
        migration::get_database_stats(&conn, TABLES)
    }

    pub fn run_maintenance(&self) -> Result<MaintenanceReport, StoreError> {
        let conn = self.pool.get()?;
        migration::run_maintenance(&conn)
    }

    pub fn schema_version(&self) -> Result<i32, StoreError> {
        let mut conn = self.pool.get()?;
        MigrationManager::new(&mut conn).get_current_version()
    }
}
