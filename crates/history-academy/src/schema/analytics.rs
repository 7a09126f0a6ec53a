//! Feature usage events
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::users::User;
use crate::error::StoreError;
use crate::store::columns::{json_column, timestamp_column, Bag, ColumnSet};
use crate::store::record::{Record, Reference};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageAnalytics {
    pub id: i64,
    pub user_id: i64,
    pub feature_used: String,
    pub duration_seconds: i32,
    pub actions: Vec<String>,
    pub device_info: Bag,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UsageAnalyticsCreate {
    pub user_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub feature_used: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub duration_seconds: i32,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub device_info: Bag,
}

impl UsageAnalyticsCreate {
    pub fn new(user_id: i64, feature_used: &str, duration_seconds: i32) -> Self {
        Self {
            user_id,
            feature_used: feature_used.to_string(),
            duration_seconds,
            actions: Vec::new(),
            device_info: Bag::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct UsageAnalyticsUpdate {
    #[validate(range(min = 0))]
    pub duration_seconds: Option<i32>,
    pub actions: Option<Vec<String>>,
    pub device_info: Option<Bag>,
}

impl Record for UsageAnalytics {
    const ENTITY: &'static str = "UsageAnalytics";
    const TABLE: &'static str = "usage_analytics";

    type Create = UsageAnalyticsCreate;
    type Update = UsageAnalyticsUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            feature_used: row.get("feature_used")?,
            duration_seconds: row.get("duration_seconds")?,
            actions: json_column(row, "actions")?,
            device_info: json_column(row, "device_info")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &UsageAnalyticsCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("user_id", input.user_id)
            .set("feature_used", input.feature_used.clone())
            .set("duration_seconds", input.duration_seconds)
            .json("actions", &input.actions)?
            .json("device_info", &input.device_info)
    }

    fn update_columns(patch: &UsageAnalyticsUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("duration_seconds", patch.duration_seconds)
            .json_some("actions", patch.actions.as_ref())?
            .json_some("device_info", patch.device_info.as_ref())
    }

    fn references(input: &UsageAnalyticsCreate) -> Vec<Reference> {
        vec![Reference::to::<User>("user_id", input.user_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_duration_rejected() {
        let input = UsageAnalyticsCreate::new(1, "vocabulary_explorer", -1);
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("duration_seconds"));
    }

    #[test]
    fn test_device_info_is_free_form() {
        let input: UsageAnalyticsCreate = serde_json::from_value(serde_json::json!({
            "user_id": 1,
            "feature_used": "ar_viewer",
            "device_info": {"os": "ios", "version": 17, "tablet": true},
        }))
        .unwrap();
        assert_eq!(input.device_info.len(), 3);
        assert_eq!(input.duration_seconds, 0);
    }
}
