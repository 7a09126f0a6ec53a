//! Badges, rewards and per-user progress tracking
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{BadgeType, RewardType, TrackedActivity};
use super::figures::HistoricalFigure;
use super::quiz::QuizLevel;
use super::users::User;
use crate::error::StoreError;
use crate::store::columns::{check_storable_date, json_column, timestamp_column, Bag, ColumnSet};
use crate::store::record::{Dependent, Record, Reference};

fn default_badge_points() -> i32 {
    50
}

fn default_rarity() -> i32 {
    1
}

// ===== Badges =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub badge_type: BadgeType,
    pub icon_url: String,
    pub requirements: Bag,
    pub points_value: i32,
    /// 1 (common) to 5 (legendary).
    pub rarity_level: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BadgeCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    pub badge_type: BadgeType,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub icon_url: String,
    #[serde(default)]
    pub requirements: Bag,
    #[serde(default = "default_badge_points")]
    #[validate(range(min = 0))]
    pub points_value: i32,
    #[serde(default = "default_rarity")]
    #[validate(range(min = 1, max = 5))]
    pub rarity_level: i32,
}

impl BadgeCreate {
    pub fn new(name: &str, badge_type: BadgeType) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            badge_type,
            icon_url: String::new(),
            requirements: Bag::new(),
            points_value: default_badge_points(),
            rarity_level: default_rarity(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct BadgeUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub badge_type: Option<BadgeType>,
    #[validate(length(max = 500))]
    pub icon_url: Option<String>,
    pub requirements: Option<Bag>,
    #[validate(range(min = 0))]
    pub points_value: Option<i32>,
    #[validate(range(min = 1, max = 5))]
    pub rarity_level: Option<i32>,
    pub is_active: Option<bool>,
}

impl Record for Badge {
    const ENTITY: &'static str = "Badge";
    const TABLE: &'static str = "badges";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("user_badges", "badge_id"),
        Dependent::new("student_rewards", "badge_id"),
    ];

    type Create = BadgeCreate;
    type Update = BadgeUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            badge_type: row.get("badge_type")?,
            icon_url: row.get("icon_url")?,
            requirements: json_column(row, "requirements")?,
            points_value: row.get("points_value")?,
            rarity_level: row.get("rarity_level")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &BadgeCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("name", input.name.clone())
            .set("description", input.description.clone())
            .set("badge_type", input.badge_type)
            .set("icon_url", input.icon_url.clone())
            .set("points_value", input.points_value)
            .set("rarity_level", input.rarity_level)
            .set("is_active", true)
            .json("requirements", &input.requirements)
    }

    fn update_columns(patch: &BadgeUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("name", patch.name.clone())
            .set_some("description", patch.description.clone())
            .set_some("badge_type", patch.badge_type)
            .set_some("icon_url", patch.icon_url.clone())
            .set_some("points_value", patch.points_value)
            .set_some("rarity_level", patch.rarity_level)
            .set_some("is_active", patch.is_active)
            .json_some("requirements", patch.requirements.as_ref())
    }
}

// ===== Earned badges =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBadge {
    pub id: i64,
    pub user_id: i64,
    pub badge_id: i64,
    pub earned_at: DateTime<Utc>,
    pub progress_data: Bag,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserBadgeCreate {
    pub user_id: i64,
    pub badge_id: i64,
    /// Defaults to the moment the row is written.
    #[serde(default)]
    pub earned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub progress_data: Bag,
}

impl UserBadgeCreate {
    pub fn new(user_id: i64, badge_id: i64) -> Self {
        Self {
            user_id,
            badge_id,
            earned_at: None,
            progress_data: Bag::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct UserBadgeUpdate {
    pub earned_at: Option<DateTime<Utc>>,
    pub progress_data: Option<Bag>,
}

impl Record for UserBadge {
    const ENTITY: &'static str = "UserBadge";
    const TABLE: &'static str = "user_badges";

    type Create = UserBadgeCreate;
    type Update = UserBadgeUpdate;

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
            badge_id: row.get("badge_id")?,
            earned_at: timestamp_column(row, "earned_at")?,
            progress_data: json_column(row, "progress_data")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &UserBadgeCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("user_id", input.user_id)
            .set("badge_id", input.badge_id)
            .time("earned_at", input.earned_at.unwrap_or_else(Utc::now))
            .json("progress_data", &input.progress_data)
    }

    fn update_columns(patch: &UserBadgeUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .time_some("earned_at", patch.earned_at)
            .json_some("progress_data", patch.progress_data.as_ref())
    }

    fn references(input: &UserBadgeCreate) -> Vec<Reference> {
        vec![
            Reference::to::<User>("user_id", input.user_id),
            Reference::to::<Badge>("badge_id", input.badge_id),
        ]
    }

    fn check_create(input: &UserBadgeCreate) -> Result<(), StoreError> {
        check_storable_date(Self::ENTITY, "earned_at", input.earned_at.as_ref())
    }

    fn check_update(patch: &UserBadgeUpdate) -> Result<(), StoreError> {
        check_storable_date(Self::ENTITY, "earned_at", patch.earned_at.as_ref())
    }
}

// ===== Rewards =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentReward {
    pub id: i64,
    pub user_id: i64,
    pub reward_type: RewardType,
    pub badge_id: Option<i64>,
    pub points: i32,
    pub description: String,
    pub awarded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StudentRewardCreate {
    pub user_id: i64,
    pub reward_type: RewardType,
    #[serde(default)]
    pub badge_id: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub points: i32,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[serde(default)]
    pub awarded_at: Option<DateTime<Utc>>,
}

impl StudentRewardCreate {
    pub fn new(user_id: i64, reward_type: RewardType, points: i32) -> Self {
        Self {
            user_id,
            reward_type,
            badge_id: None,
            points,
            description: String::new(),
            awarded_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct StudentRewardUpdate {
    pub reward_type: Option<RewardType>,
    pub badge_id: Option<i64>,
    #[validate(range(min = 0))]
    pub points: Option<i32>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub awarded_at: Option<DateTime<Utc>>,
}

impl Record for StudentReward {
    const ENTITY: &'static str = "StudentReward";
    const TABLE: &'static str = "student_rewards";

    type Create = StudentRewardCreate;
    type Update = StudentRewardUpdate;

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
            reward_type: row.get("reward_type")?,
            badge_id: row.get("badge_id")?,
            points: row.get("points")?,
            description: row.get("description")?,
            awarded_at: timestamp_column(row, "awarded_at")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &StudentRewardCreate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set("user_id", input.user_id)
            .set("reward_type", input.reward_type)
            .set("badge_id", input.badge_id)
            .set("points", input.points)
            .set("description", input.description.clone())
            .time("awarded_at", input.awarded_at.unwrap_or_else(Utc::now)))
    }

    fn update_columns(patch: &StudentRewardUpdate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set_some("reward_type", patch.reward_type)
            .set_some("badge_id", patch.badge_id)
            .set_some("points", patch.points)
            .set_some("description", patch.description.clone())
            .time_some("awarded_at", patch.awarded_at))
    }

    fn references(input: &StudentRewardCreate) -> Vec<Reference> {
        let mut refs = vec![Reference::to::<User>("user_id", input.user_id)];
        if let Some(id) = input.badge_id {
            refs.push(Reference::to::<Badge>("badge_id", id));
        }
        refs
    }

    fn patch_references(patch: &StudentRewardUpdate) -> Vec<Reference> {
        patch
            .badge_id
            .map(|id| Reference::to::<Badge>("badge_id", id))
            .into_iter()
            .collect()
    }

    fn check_create(input: &StudentRewardCreate) -> Result<(), StoreError> {
        check_storable_date(Self::ENTITY, "awarded_at", input.awarded_at.as_ref())
    }

    fn check_update(patch: &StudentRewardUpdate) -> Result<(), StoreError> {
        check_storable_date(Self::ENTITY, "awarded_at", patch.awarded_at.as_ref())
    }
}

// ===== Progress =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: i64,
    pub user_id: i64,
    pub quiz_level_id: Option<i64>,
    pub historical_figure_id: Option<i64>,
    pub activity_type: Option<TrackedActivity>,
    pub activity_id: Option<i64>,
    /// e.g. quiz_completed, diary_read, vocab_explored, ar_viewed
    pub progress_type: String,
    pub total_points: i32,
    pub completion_percentage: f64,
    pub streak_count: i32,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgress {
    /// The tracked activity this row points at, if any. Not enforced as a foreign key;
    /// see [`crate::store::Database::resolve_activity`].
    pub fn activity(&self) -> Option<(TrackedActivity, i64)> {
        self.activity_type.zip(self.activity_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UserProgressCreate {
    pub user_id: i64,
    #[serde(default)]
    pub quiz_level_id: Option<i64>,
    #[serde(default)]
    pub historical_figure_id: Option<i64>,
    #[serde(default)]
    pub activity_type: Option<TrackedActivity>,
    #[serde(default)]
    pub activity_id: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    pub progress_type: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub total_points: i32,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub completion_percentage: f64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub streak_count: i32,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl UserProgressCreate {
    pub fn new(user_id: i64, progress_type: &str) -> Self {
        Self {
            user_id,
            quiz_level_id: None,
            historical_figure_id: None,
            activity_type: None,
            activity_id: None,
            progress_type: progress_type.to_string(),
            total_points: 0,
            completion_percentage: 0.0,
            streak_count: 0,
            last_activity_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct UserProgressUpdate {
    pub quiz_level_id: Option<i64>,
    pub historical_figure_id: Option<i64>,
    pub activity_type: Option<TrackedActivity>,
    pub activity_id: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    pub progress_type: Option<String>,
    #[validate(range(min = 0))]
    pub total_points: Option<i32>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub completion_percentage: Option<f64>,
    #[validate(range(min = 0))]
    pub streak_count: Option<i32>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

fn check_activity_pair(activity_type: Option<TrackedActivity>, activity_id: Option<i64>) -> Result<(), StoreError> {
    match (activity_type, activity_id) {
        (Some(_), None) => Err(StoreError::validation(
            UserProgress::ENTITY,
            "activity_id",
            "required when activity_type is set",
        )),
        (None, Some(_)) => Err(StoreError::validation(
            UserProgress::ENTITY,
            "activity_type",
            "required when activity_id is set",
        )),
        _ => Ok(()),
    }
}

fn check_percentage(value: Option<f64>) -> Result<(), StoreError> {
    match value {
        Some(pct) if pct.is_nan() => Err(StoreError::validation(
            UserProgress::ENTITY,
            "completion_percentage",
            "must be a number between 0 and 100",
        )),
        _ => Ok(()),
    }
}

impl Record for UserProgress {
    const ENTITY: &'static str = "UserProgress";
    const TABLE: &'static str = "user_progress";

    type Create = UserProgressCreate;
    type Update = UserProgressUpdate;

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
            quiz_level_id: row.get("quiz_level_id")?,
            historical_figure_id: row.get("historical_figure_id")?,
            activity_type: row.get("activity_type")?,
            activity_id: row.get("activity_id")?,
            progress_type: row.get("progress_type")?,
            total_points: row.get("total_points")?,
            completion_percentage: row.get("completion_percentage")?,
            streak_count: row.get("streak_count")?,
            last_activity_at: timestamp_column(row, "last_activity_at")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &UserProgressCreate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set("user_id", input.user_id)
            .set("quiz_level_id", input.quiz_level_id)
            .set("historical_figure_id", input.historical_figure_id)
            .set("activity_type", input.activity_type)
            .set("activity_id", input.activity_id)
            .set("progress_type", input.progress_type.clone())
            .set("total_points", input.total_points)
            .set("completion_percentage", input.completion_percentage)
            .set("streak_count", input.streak_count)
            .time("last_activity_at", input.last_activity_at.unwrap_or_else(Utc::now)))
    }

    fn update_columns(patch: &UserProgressUpdate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set_some("quiz_level_id", patch.quiz_level_id)
            .set_some("historical_figure_id", patch.historical_figure_id)
            .set_some("activity_type", patch.activity_type)
            .set_some("activity_id", patch.activity_id)
            .set_some("progress_type", patch.progress_type.clone())
            .set_some("total_points", patch.total_points)
            .set_some("completion_percentage", patch.completion_percentage)
            .set_some("streak_count", patch.streak_count)
            .time_some("last_activity_at", patch.last_activity_at))
    }

    fn references(input: &UserProgressCreate) -> Vec<Reference> {
        let mut refs = vec![Reference::to::<User>("user_id", input.user_id)];
        if let Some(id) = input.quiz_level_id {
            refs.push(Reference::to::<QuizLevel>("quiz_level_id", id));
        }
        if let Some(id) = input.historical_figure_id {
            refs.push(Reference::to::<HistoricalFigure>("historical_figure_id", id));
        }
        refs
    }

    fn patch_references(patch: &UserProgressUpdate) -> Vec<Reference> {
        let mut refs = Vec::new();
        if let Some(id) = patch.quiz_level_id {
            refs.push(Reference::to::<QuizLevel>("quiz_level_id", id));
        }
        if let Some(id) = patch.historical_figure_id {
            refs.push(Reference::to::<HistoricalFigure>("historical_figure_id", id));
        }
        refs
    }

    fn check_create(input: &UserProgressCreate) -> Result<(), StoreError> {
        check_percentage(Some(input.completion_percentage))?;
        check_storable_date(Self::ENTITY, "last_activity_at", input.last_activity_at.as_ref())?;
        check_activity_pair(input.activity_type, input.activity_id)
    }

    // A patch replaces the activity pair as a whole.
    fn check_update(patch: &UserProgressUpdate) -> Result<(), StoreError> {
        check_percentage(patch.completion_percentage)?;
        check_storable_date(Self::ENTITY, "last_activity_at", patch.last_activity_at.as_ref())?;
        check_activity_pair(patch.activity_type, patch.activity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_bounds() {
        let mut input = BadgeCreate::new("Pharaoh's Favourite", BadgeType::Explorer);
        assert_eq!(input.rarity_level, 1);
        input.rarity_level = 6;
        assert!(input.validate().is_err());
        input.rarity_level = 0;
        assert!(input.validate().is_err());
        input.rarity_level = 5;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_completion_percentage_bounds() {
        let mut input = UserProgressCreate::new(1, "quiz_completed");
        input.completion_percentage = 100.5;
        assert!(input.validate().is_err());
        input.completion_percentage = 100.0;
        assert!(input.validate().is_ok());

        input.completion_percentage = f64::NAN;
        let err = UserProgress::check_create(&input).unwrap_err();
        assert_eq!(err.field(), Some("completion_percentage"));
    }

    #[test]
    fn test_activity_pair_must_be_complete() {
        let mut input = UserProgressCreate::new(1, "ar_viewed");
        input.activity_type = Some(TrackedActivity::ArExperience);
        let err = UserProgress::check_create(&input).unwrap_err();
        assert_eq!(err.field(), Some("activity_id"));

        input.activity_id = Some(12);
        assert!(UserProgress::check_create(&input).is_ok());

        let patch = UserProgressUpdate {
            activity_id: Some(3),
            ..Default::default()
        };
        let err = UserProgress::check_update(&patch).unwrap_err();
        assert_eq!(err.field(), Some("activity_type"));
    }

    #[test]
    fn test_reward_badge_reference_only_when_present() {
        let input = StudentRewardCreate::new(2, RewardType::Points, 25);
        let refs = StudentReward::references(&input);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target, "User");
    }

    #[test]
    fn test_award_dates_must_be_storable() {
        use chrono::TimeZone;

        let far = Utc.with_ymd_and_hms(10_000, 6, 1, 0, 0, 0).unwrap();

        let mut badge = UserBadgeCreate::new(1, 1);
        badge.earned_at = Some(far);
        assert_eq!(UserBadge::check_create(&badge).unwrap_err().field(), Some("earned_at"));
        let patch = UserBadgeUpdate {
            earned_at: Some(far),
            ..Default::default()
        };
        assert_eq!(UserBadge::check_update(&patch).unwrap_err().field(), Some("earned_at"));

        let mut reward = StudentRewardCreate::new(1, RewardType::Certificate, 0);
        reward.awarded_at = Some(far);
        assert_eq!(StudentReward::check_create(&reward).unwrap_err().field(), Some("awarded_at"));
        let patch = StudentRewardUpdate {
            awarded_at: Some(far),
            ..Default::default()
        };
        assert_eq!(StudentReward::check_update(&patch).unwrap_err().field(), Some("awarded_at"));

        let mut progress = UserProgressCreate::new(1, "diary_read");
        progress.last_activity_at = Some(far);
        assert_eq!(
            UserProgress::check_create(&progress).unwrap_err().field(),
            Some("last_activity_at")
        );
        let patch = UserProgressUpdate {
            last_activity_at: Some(far),
            ..Default::default()
        };
        assert_eq!(
            UserProgress::check_update(&patch).unwrap_err().field(),
            Some("last_activity_at")
        );

        reward.awarded_at = Some(Utc::now());
        assert!(StudentReward::check_create(&reward).is_ok());
    }
}
