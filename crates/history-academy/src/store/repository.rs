//! Integrity-checked CRUD shared by every entity
//!
//! Each write runs in its own `BEGIN IMMEDIATE` transaction so the uniqueness and
//! reference checks cannot race a concurrent writer. The `*_in` forms take an open
//! connection or transaction and let callers compose several writes atomically.

use chrono::{DateTime, Duration, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

use super::columns::format_timestamp;
use super::record::{Record, Reference, UniqueKey};
use crate::error::StoreError;

/// Outcome of [`Repository::delete`].
#[derive(Debug, Clone, PartialEq)]
pub enum Deletion<R> {
    /// The active flag was cleared; the row is still there.
    Deactivated(R),
    /// The row was physically removed; this is its last state.
    Removed(R),
}

pub struct Repository<R: Record> {
    pool: Arc<Pool<SqliteConnectionManager>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.pool))
    }
}

impl<R: Record> Repository<R> {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    fn get_conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }

    fn write<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn create(&self, input: &R::Create) -> Result<R, StoreError> {
        let record = self.write(|conn| Self::create_in(conn, input))?;
        debug!("Created {} {}", R::ENTITY, record.id());
        Ok(record)
    }

    pub fn update(&self, id: i64, patch: &R::Update) -> Result<R, StoreError> {
        let record = self.write(|conn| Self::update_in(conn, id, patch))?;
        debug!("Updated {} {}", R::ENTITY, id);
        Ok(record)
    }

    /// Soft delete when the entity carries an active flag, otherwise a restricted purge.
    pub fn delete(&self, id: i64) -> Result<Deletion<R>, StoreError> {
        let outcome = self.write(|conn| Self::delete_in(conn, id))?;
        match &outcome {
            Deletion::Deactivated(_) => info!("Deactivated {} {}", R::ENTITY, id),
            Deletion::Removed(_) => info!("Deleted {} {}", R::ENTITY, id),
        }
        Ok(outcome)
    }

    /// Physically remove a row, refusing while anything still references it.
    pub fn purge(&self, id: i64) -> Result<R, StoreError> {
        let removed = self.write(|conn| Self::purge_in(conn, id))?;
        info!("Purged {} {}", R::ENTITY, id);
        Ok(removed)
    }

    pub fn get(&self, id: i64) -> Result<R, StoreError> {
        let conn = self.get_conn()?;
        Self::get_in(&conn, id)
    }

    pub fn find(&self, id: i64) -> Result<Option<R>, StoreError> {
        let conn = self.get_conn()?;
        Self::find_in(&conn, id)
    }

    pub fn list(&self) -> Result<Vec<R>, StoreError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY id", R::TABLE))?;
        let rows = stmt.query_map([], |row| R::from_row(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// All rows whose foreign key `column` equals `id`, e.g. the questions of a level.
    pub fn list_by(&self, column: &'static str, id: i64) -> Result<Vec<R>, StoreError> {
        if column.is_empty() || !column.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
            return Err(StoreError::validation(R::ENTITY, column, "not a column name"));
        }
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY id",
            R::TABLE,
            column
        ))?;
        let rows = stmt.query_map([id], |row| R::from_row(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.get_conn()?;
        let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", R::TABLE), [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn create_in(conn: &Connection, input: &R::Create) -> Result<R, StoreError> {
        input
            .validate()
            .map_err(|e| StoreError::from_validation(R::ENTITY, e))?;
        R::check_create(input)?;
        for key in R::unique_keys(input) {
            ensure_unique::<R>(conn, &key, None)?;
        }
        for reference in R::references(input) {
            ensure_exists::<R>(conn, &reference)?;
        }

        let now = Utc::now();
        let columns = R::insert_columns(input)?
            .time("created_at", now)
            .time("updated_at", now);
        let names = columns.columns().collect::<Vec<_>>();
        let placeholders = (1..=names.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE,
            names.join(", "),
            placeholders.join(", ")
        );

        let values = columns.into_values();
        conn.execute(&sql, params_from_iter(values.iter()))
            .map_err(translate_constraint::<R>)?;

        Self::get_in(conn, conn.last_insert_rowid())
    }

    pub fn update_in(conn: &Connection, id: i64, patch: &R::Update) -> Result<R, StoreError> {
        patch
            .validate()
            .map_err(|e| StoreError::from_validation(R::ENTITY, e))?;
        R::check_update(patch)?;
        let existing = Self::get_in(conn, id)?;
        for key in R::patch_unique_keys(patch) {
            ensure_unique::<R>(conn, &key, Some(id))?;
        }
        for reference in R::patch_references(patch) {
            ensure_exists::<R>(conn, &reference)?;
        }

        let columns = R::update_columns(patch)?.time("updated_at", next_timestamp(existing.updated_at()));
        let assignments = columns
            .columns()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            R::TABLE,
            assignments.join(", "),
            assignments.len() + 1
        );

        let mut values = columns.into_values();
        values.push(Box::new(id));
        conn.execute(&sql, params_from_iter(values.iter()))
            .map_err(translate_constraint::<R>)?;

        Self::get_in(conn, id)
    }

    pub fn delete_in(conn: &Connection, id: i64) -> Result<Deletion<R>, StoreError> {
        match R::ACTIVE_FLAG {
            Some(flag) => {
                let existing = Self::get_in(conn, id)?;
                let stamp = next_timestamp(existing.updated_at());
                conn.execute(
                    &format!("UPDATE {} SET {} = 0, updated_at = ?1 WHERE id = ?2", R::TABLE, flag),
                    params![format_timestamp(&stamp), id],
                )?;
                Ok(Deletion::Deactivated(Self::get_in(conn, id)?))
            }
            None => Ok(Deletion::Removed(Self::purge_in(conn, id)?)),
        }
    }

    pub fn purge_in(conn: &Connection, id: i64) -> Result<R, StoreError> {
        let existing = Self::get_in(conn, id)?;
        for dependent in R::DEPENDENTS {
            let count: i64 = conn.query_row(&dependent.count_sql(), [id], |row| row.get(0))?;
            if count > 0 {
                return Err(StoreError::Restricted {
                    entity: R::ENTITY,
                    id,
                    dependent: format!("{}.{} ({} rows)", dependent.table, dependent.column, count),
                });
            }
        }
        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", R::TABLE), [id])?;
        Ok(existing)
    }

    pub fn get_in(conn: &Connection, id: i64) -> Result<R, StoreError> {
        Self::find_in(conn, id)?.ok_or(StoreError::NotFound { entity: R::ENTITY, id })
    }

    pub fn find_in(conn: &Connection, id: i64) -> Result<Option<R>, StoreError> {
        let record = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE id = ?1", R::TABLE),
                [id],
                |row| R::from_row(row),
            )
            .optional()?;
        Ok(record)
    }
}

/// `updated_at` must move strictly forward even when the clock has not ticked.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::nanoseconds(1)
    }
}

fn ensure_unique<R: Record>(conn: &Connection, key: &UniqueKey, exclude: Option<i64>) -> Result<(), StoreError> {
    let clash: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT id FROM {} WHERE {} = ?1 AND (?2 IS NULL OR id != ?2) LIMIT 1",
                R::TABLE,
                key.field
            ),
            params![key.value, exclude],
            |row| row.get(0),
        )
        .optional()?;
    match clash {
        Some(_) => Err(StoreError::UniqueConstraint {
            entity: R::ENTITY,
            field: key.field.to_string(),
            value: key.value.clone(),
        }),
        None => Ok(()),
    }
}

fn ensure_exists<R: Record>(conn: &Connection, reference: &Reference) -> Result<(), StoreError> {
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", reference.table),
            [reference.id],
            |_| Ok(()),
        )
        .optional()?;
    match found {
        Some(()) => Ok(()),
        None => Err(StoreError::ForeignKey {
            entity: R::ENTITY,
            field: reference.field.to_string(),
            target: reference.target,
            id: reference.id,
        }),
    }
}

/// Map SQLite constraint failures that slipped past the pre-checks onto typed errors.
fn translate_constraint<R: Record>(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if let Some(target) = message.strip_prefix("UNIQUE constraint failed: ") {
                let field = target.rsplit('.').next().unwrap_or(target);
                return StoreError::UniqueConstraint {
                    entity: R::ENTITY,
                    field: field.to_string(),
                    value: String::new(),
                };
            }
            if let Some(expr) = message.strip_prefix("CHECK constraint failed: ") {
                let field = expr
                    .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .find(|token| !token.is_empty())
                    .unwrap_or(expr);
                return StoreError::validation(R::ENTITY, field, message.clone());
            }
        }
    }
    StoreError::Database(err)
}
