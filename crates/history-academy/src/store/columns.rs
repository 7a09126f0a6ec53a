//! Column binding and row decoding helpers shared by every table
use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Row, ToSql};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::StoreError;

/// Opaque JSON object attached to a record.
pub type Bag = serde_json::Map<String, serde_json::Value>;

/// Ordered list of `column = value` bindings for an INSERT or UPDATE.
#[derive(Default)]
pub struct ColumnSet {
    entries: Vec<(&'static str, Box<dyn ToSql>)>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value; `Option::None` binds NULL.
    pub fn set<T: ToSql + 'static>(mut self, column: &'static str, value: T) -> Self {
        self.entries.push((column, Box::new(value)));
        self
    }

    /// Bind only when the patch carries a value.
    pub fn set_some<T: ToSql + 'static>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(column, value),
            None => self,
        }
    }

    pub fn time(self, column: &'static str, value: DateTime<Utc>) -> Self {
        self.set(column, format_timestamp(&value))
    }

    pub fn time_opt(self, column: &'static str, value: Option<DateTime<Utc>>) -> Self {
        self.set(column, value.as_ref().map(format_timestamp))
    }

    pub fn time_some(self, column: &'static str, value: Option<DateTime<Utc>>) -> Self {
        self.set_some(column, value.as_ref().map(format_timestamp))
    }

    pub fn json<T: Serialize + ?Sized>(self, column: &'static str, value: &T) -> Result<Self, StoreError> {
        let encoded = serde_json::to_string(value)?;
        Ok(self.set(column, encoded))
    }

    pub fn json_some<T: Serialize>(self, column: &'static str, value: Option<&T>) -> Result<Self, StoreError> {
        match value {
            Some(value) => self.json(column, value),
            None => Ok(self),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(column, _)| *column)
    }

    pub(crate) fn into_values(self) -> Vec<Box<dyn ToSql>> {
        self.entries.into_iter().map(|(_, value)| value).collect()
    }
}

/// RFC 3339 with as many sub-second digits as needed, so values read back unchanged.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Timestamps are stored as RFC 3339 text, which only has room for four-digit years.
pub fn check_storable_date(
    entity: &'static str,
    field: &str,
    value: Option<&DateTime<Utc>>,
) -> Result<(), StoreError> {
    match value {
        Some(date) if !(1..=9999).contains(&date.year()) => Err(StoreError::validation(
            entity,
            field,
            format!("year {} is outside 1..=9999", date.year()),
        )),
        _ => Ok(()),
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
    }
    None
}

fn column_index(row: &Row<'_>, column: &str) -> rusqlite::Result<usize> {
    row.as_ref().column_index(column)
}

pub fn timestamp_column(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_timestamp(&raw).ok_or_else(|| {
        warn!("Unparseable timestamp in column {}: {}", column, raw);
        rusqlite::Error::FromSqlConversionFailure(
            column_index(row, column).unwrap_or_default(),
            Type::Text,
            format!("invalid timestamp '{}'", raw).into(),
        )
    })
}

pub fn optional_timestamp_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        Some(_) => timestamp_column(row, column).map(Some),
        None => Ok(None),
    }
}

pub fn json_column<T: DeserializeOwned>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column_index(row, column).unwrap_or_default(),
            Type::Text,
            Box::new(e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_round_trip_keeps_nanoseconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let text = format_timestamp(&ts);
        assert!(text.ends_with('Z'));
        assert_eq!(parse_timestamp(&text), Some(ts));
    }

    #[test]
    fn test_parse_sqlite_default_format() {
        let parsed = parse_timestamp("2024-05-01 10:30:00").unwrap();
        assert_eq!(format_timestamp(&parsed), "2024-05-01T10:30:00Z");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_column_set_skips_absent_patch_values() {
        let set = ColumnSet::new()
            .set("title", "Rome".to_string())
            .set_some::<i32>("display_order", None)
            .time_some("completed_at", None)
            .json_some::<Vec<String>>("tags", None)
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.columns().collect::<Vec<_>>(), vec!["title"]);
    }
}
