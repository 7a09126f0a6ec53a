//! Platform accounts
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{GradeLevel, UserRole};
use crate::error::StoreError;
use crate::store::columns::{timestamp_column, ColumnSet};
use crate::store::record::{Dependent, Record, UniqueKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub grade_level: Option<GradeLevel>,
    pub school_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserCreate {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub grade_level: Option<GradeLevel>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub school_name: Option<String>,
}

impl UserCreate {
    pub fn new(username: &str, email: &str, full_name: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            role: UserRole::default(),
            grade_level: None,
            school_name: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 50))]
    pub username: Option<String>,
    #[validate(email, length(max = 255))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub grade_level: Option<GradeLevel>,
    #[validate(length(max = 200))]
    pub school_name: Option<String>,
    pub is_active: Option<bool>,
}

impl Record for User {
    const ENTITY: &'static str = "User";
    const TABLE: &'static str = "users";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("learning_modules", "teacher_id"),
        Dependent::new("quiz_attempts", "user_id"),
        Dependent::new("user_badges", "user_id"),
        Dependent::new("student_rewards", "user_id"),
        Dependent::new("user_progress", "user_id"),
        Dependent::new("usage_analytics", "user_id"),
    ];

    type Create = UserCreate;
    type Update = UserUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            full_name: row.get("full_name")?,
            role: row.get("role")?,
            grade_level: row.get("grade_level")?,
            school_name: row.get("school_name")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &UserCreate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set("username", input.username.clone())
            .set("email", input.email.clone())
            .set("full_name", input.full_name.clone())
            .set("role", input.role)
            .set("grade_level", input.grade_level)
            .set("school_name", input.school_name.clone())
            .set("is_active", true))
    }

    fn update_columns(patch: &UserUpdate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set_some("username", patch.username.clone())
            .set_some("email", patch.email.clone())
            .set_some("full_name", patch.full_name.clone())
            .set_some("role", patch.role)
            .set_some("grade_level", patch.grade_level)
            .set_some("school_name", patch.school_name.clone())
            .set_some("is_active", patch.is_active))
    }

    fn unique_keys(input: &UserCreate) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("username", &input.username),
            UniqueKey::new("email", &input.email),
        ]
    }

    fn patch_unique_keys(patch: &UserUpdate) -> Vec<UniqueKey> {
        let mut keys = Vec::new();
        if let Some(username) = &patch.username {
            keys.push(UniqueKey::new("username", username));
        }
        if let Some(email) = &patch.email {
            keys.push(UniqueKey::new("email", email));
        }
        keys
    }
}
