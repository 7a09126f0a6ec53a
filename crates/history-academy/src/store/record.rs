//! The contract between a persisted record type and the generic repository
use chrono::{DateTime, Utc};
use rusqlite::Row;
use validator::Validate;

use super::columns::ColumnSet;
use crate::error::StoreError;

/// A foreign key value carried by a transfer shape, checked before the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub table: &'static str,
    pub target: &'static str,
    pub id: i64,
}

impl Reference {
    pub fn to<T: Record>(field: &'static str, id: i64) -> Self {
        Self {
            field,
            table: T::TABLE,
            target: T::ENTITY,
            id,
        }
    }
}

/// A value that must not collide with any other row's value in the same column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub field: &'static str,
    pub value: String,
}

impl UniqueKey {
    pub fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// A foreign key column in another table pointing at this record's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependent {
    pub table: &'static str,
    pub column: &'static str,
    /// The column holds a JSON array of ids rather than a single id.
    pub id_list: bool,
}

impl Dependent {
    pub const fn new(table: &'static str, column: &'static str) -> Self {
        Self {
            table,
            column,
            id_list: false,
        }
    }

    pub const fn id_list(table: &'static str, column: &'static str) -> Self {
        Self {
            table,
            column,
            id_list: true,
        }
    }

    /// Counts the rows of `table` that reference `?1`.
    pub fn count_sql(&self) -> String {
        if self.id_list {
            format!(
                "SELECT COUNT(DISTINCT {table}.id) FROM {table}, json_each({table}.{column}) WHERE json_each.value = ?1",
                table = self.table,
                column = self.column
            )
        } else {
            format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", self.table, self.column)
        }
    }
}

/// A table-backed entity.
///
/// Implementors describe how their transfer shapes map onto columns; the repository
/// owns ids, `created_at`/`updated_at`, transactions and every integrity check.
pub trait Record: Sized {
    /// Name used in error messages, e.g. `"QuizQuestion"`.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    /// Boolean column cleared by a soft delete (`is_active` / `is_published`).
    const ACTIVE_FLAG: Option<&'static str> = None;
    /// Rows elsewhere that block physical removal of this record.
    const DEPENDENTS: &'static [Dependent] = &[];

    type Create: Validate;
    type Update: Validate;

    fn id(&self) -> i64;
    fn updated_at(&self) -> DateTime<Utc>;
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn insert_columns(input: &Self::Create) -> Result<ColumnSet, StoreError>;
    fn update_columns(patch: &Self::Update) -> Result<ColumnSet, StoreError>;

    fn references(_input: &Self::Create) -> Vec<Reference> {
        Vec::new()
    }

    fn patch_references(_patch: &Self::Update) -> Vec<Reference> {
        Vec::new()
    }

    fn unique_keys(_input: &Self::Create) -> Vec<UniqueKey> {
        Vec::new()
    }

    fn patch_unique_keys(_patch: &Self::Update) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Cross-field rules `validator` attributes cannot express.
    fn check_create(_input: &Self::Create) -> Result<(), StoreError> {
        Ok(())
    }

    fn check_update(_patch: &Self::Update) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependent_count_sql() {
        let plain = Dependent::new("quiz_levels", "historical_period_id");
        assert_eq!(
            plain.count_sql(),
            "SELECT COUNT(*) FROM quiz_levels WHERE historical_period_id = ?1"
        );

        let list = Dependent::id_list("vocabulary_terms", "related_periods");
        assert!(list.id_list);
        assert!(list.count_sql().contains("json_each(vocabulary_terms.related_periods)"));
    }
}
