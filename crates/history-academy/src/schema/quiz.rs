//! Quiz adventure: levels, their questions, and user attempts
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::curriculum::HistoricalPeriod;
use super::enums::{DifficultyLevel, QuestionType};
use super::users::User;
use crate::error::StoreError;
use crate::store::columns::{
    check_storable_date, json_column, optional_timestamp_column, timestamp_column, Bag, ColumnSet,
};
use crate::store::record::{Dependent, Record, Reference};

fn default_points_reward() -> i32 {
    100
}

fn default_question_points() -> i32 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizLevel {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub historical_period_id: i64,
    pub level_number: i32,
    pub unlock_requirements: Bag,
    pub rewards: Bag,
    pub difficulty_level: DifficultyLevel,
    pub points_reward: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct QuizLevelCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    pub historical_period_id: i64,
    #[validate(range(min = 1))]
    pub level_number: i32,
    #[serde(default)]
    pub unlock_requirements: Bag,
    #[serde(default)]
    pub rewards: Bag,
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
    #[serde(default = "default_points_reward")]
    #[validate(range(min = 0))]
    pub points_reward: i32,
}

impl QuizLevelCreate {
    pub fn new(name: &str, historical_period_id: i64, level_number: i32) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            historical_period_id,
            level_number,
            unlock_requirements: Bag::new(),
            rewards: Bag::new(),
            difficulty_level: DifficultyLevel::default(),
            points_reward: default_points_reward(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct QuizLevelUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub historical_period_id: Option<i64>,
    #[validate(range(min = 1))]
    pub level_number: Option<i32>,
    pub unlock_requirements: Option<Bag>,
    pub rewards: Option<Bag>,
    pub difficulty_level: Option<DifficultyLevel>,
    #[validate(range(min = 0))]
    pub points_reward: Option<i32>,
    pub is_active: Option<bool>,
}

impl Record for QuizLevel {
    const ENTITY: &'static str = "QuizLevel";
    const TABLE: &'static str = "quiz_levels";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("quiz_questions", "quiz_level_id"),
        Dependent::new("quiz_attempts", "quiz_level_id"),
        Dependent::new("user_progress", "quiz_level_id"),
    ];

    type Create = QuizLevelCreate;
    type Update = QuizLevelUpdate;

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
            historical_period_id: row.get("historical_period_id")?,
            level_number: row.get("level_number")?,
            unlock_requirements: json_column(row, "unlock_requirements")?,
            rewards: json_column(row, "rewards")?,
            difficulty_level: row.get("difficulty_level")?,
            points_reward: row.get("points_reward")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &QuizLevelCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("name", input.name.clone())
            .set("description", input.description.clone())
            .set("historical_period_id", input.historical_period_id)
            .set("level_number", input.level_number)
            .set("difficulty_level", input.difficulty_level)
            .set("points_reward", input.points_reward)
            .set("is_active", true)
            .json("unlock_requirements", &input.unlock_requirements)?
            .json("rewards", &input.rewards)
    }

    fn update_columns(patch: &QuizLevelUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("name", patch.name.clone())
            .set_some("description", patch.description.clone())
            .set_some("historical_period_id", patch.historical_period_id)
            .set_some("level_number", patch.level_number)
            .set_some("difficulty_level", patch.difficulty_level)
            .set_some("points_reward", patch.points_reward)
            .set_some("is_active", patch.is_active)
            .json_some("unlock_requirements", patch.unlock_requirements.as_ref())?
            .json_some("rewards", patch.rewards.as_ref())
    }

    fn references(input: &QuizLevelCreate) -> Vec<Reference> {
        vec![Reference::to::<HistoricalPeriod>(
            "historical_period_id",
            input.historical_period_id,
        )]
    }

    fn patch_references(patch: &QuizLevelUpdate) -> Vec<Reference> {
        patch
            .historical_period_id
            .map(|id| Reference::to::<HistoricalPeriod>("historical_period_id", id))
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_level_id: i64,
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub difficulty_level: DifficultyLevel,
    pub points_value: i32,
    pub image_url: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct QuizQuestionCreate {
    pub quiz_level_id: i64,
    #[validate(length(min = 1, max = 1000))]
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[validate(length(max = 500))]
    pub correct_answer: String,
    #[validate(length(max = 1000))]
    pub explanation: String,
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
    #[serde(default = "default_question_points")]
    #[validate(range(min = 0))]
    pub points_value: i32,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub display_order: i32,
}

impl QuizQuestionCreate {
    pub fn new(quiz_level_id: i64, question_text: &str, question_type: QuestionType, correct_answer: &str) -> Self {
        Self {
            quiz_level_id,
            question_text: question_text.to_string(),
            question_type,
            options: Vec::new(),
            correct_answer: correct_answer.to_string(),
            explanation: String::new(),
            difficulty_level: DifficultyLevel::default(),
            points_value: default_question_points(),
            image_url: None,
            display_order: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct QuizQuestionUpdate {
    #[validate(length(min = 1, max = 1000))]
    pub question_text: Option<String>,
    pub question_type: Option<QuestionType>,
    pub options: Option<Vec<String>>,
    #[validate(length(max = 500))]
    pub correct_answer: Option<String>,
    #[validate(length(max = 1000))]
    pub explanation: Option<String>,
    pub difficulty_level: Option<DifficultyLevel>,
    #[validate(range(min = 0))]
    pub points_value: Option<i32>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl Record for QuizQuestion {
    const ENTITY: &'static str = "QuizQuestion";
    const TABLE: &'static str = "quiz_questions";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");

    type Create = QuizQuestionCreate;
    type Update = QuizQuestionUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            quiz_level_id: row.get("quiz_level_id")?,
            question_text: row.get("question_text")?,
            question_type: row.get("question_type")?,
            options: json_column(row, "options")?,
            correct_answer: row.get("correct_answer")?,
            explanation: row.get("explanation")?,
            difficulty_level: row.get("difficulty_level")?,
            points_value: row.get("points_value")?,
            image_url: row.get("image_url")?,
            display_order: row.get("display_order")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &QuizQuestionCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("quiz_level_id", input.quiz_level_id)
            .set("question_text", input.question_text.clone())
            .set("question_type", input.question_type)
            .set("correct_answer", input.correct_answer.clone())
            .set("explanation", input.explanation.clone())
            .set("difficulty_level", input.difficulty_level)
            .set("points_value", input.points_value)
            .set("image_url", input.image_url.clone())
            .set("display_order", input.display_order)
            .set("is_active", true)
            .json("options", &input.options)
    }

    fn update_columns(patch: &QuizQuestionUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("question_text", patch.question_text.clone())
            .set_some("question_type", patch.question_type)
            .set_some("correct_answer", patch.correct_answer.clone())
            .set_some("explanation", patch.explanation.clone())
            .set_some("difficulty_level", patch.difficulty_level)
            .set_some("points_value", patch.points_value)
            .set_some("image_url", patch.image_url.clone())
            .set_some("display_order", patch.display_order)
            .set_some("is_active", patch.is_active)
            .json_some("options", patch.options.as_ref())
    }

    fn references(input: &QuizQuestionCreate) -> Vec<Reference> {
        vec![Reference::to::<QuizLevel>("quiz_level_id", input.quiz_level_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_level_id: i64,
    pub score: i32,
    pub max_score: i32,
    /// Seconds taken to finish the level.
    pub completion_time: Option<i32>,
    pub answers: Bag,
    pub is_completed: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct QuizAttemptCreate {
    pub user_id: i64,
    pub quiz_level_id: i64,
    #[validate(range(min = 0))]
    pub max_score: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct QuizAttemptUpdate {
    #[validate(range(min = 0))]
    pub score: Option<i32>,
    #[validate(range(min = 0))]
    pub max_score: Option<i32>,
    #[validate(range(min = 0))]
    pub completion_time: Option<i32>,
    pub answers: Option<Bag>,
    pub is_completed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Record for QuizAttempt {
    const ENTITY: &'static str = "QuizAttempt";
    const TABLE: &'static str = "quiz_attempts";

    type Create = QuizAttemptCreate;
    type Update = QuizAttemptUpdate;

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
            score: row.get("score")?,
            max_score: row.get("max_score")?,
            completion_time: row.get("completion_time")?,
            answers: json_column(row, "answers")?,
            is_completed: row.get("is_completed")?,
            started_at: timestamp_column(row, "started_at")?,
            completed_at: optional_timestamp_column(row, "completed_at")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &QuizAttemptCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("user_id", input.user_id)
            .set("quiz_level_id", input.quiz_level_id)
            .set("score", 0)
            .set("max_score", input.max_score)
            .set("is_completed", false)
            .time("started_at", Utc::now())
            .json("answers", &Bag::new())
    }

    fn update_columns(patch: &QuizAttemptUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("score", patch.score)
            .set_some("max_score", patch.max_score)
            .set_some("completion_time", patch.completion_time)
            .set_some("is_completed", patch.is_completed)
            .time_some("completed_at", patch.completed_at)
            .json_some("answers", patch.answers.as_ref())
    }

    fn references(input: &QuizAttemptCreate) -> Vec<Reference> {
        vec![
            Reference::to::<User>("user_id", input.user_id),
            Reference::to::<QuizLevel>("quiz_level_id", input.quiz_level_id),
        ]
    }

    fn check_update(patch: &QuizAttemptUpdate) -> Result<(), StoreError> {
        check_storable_date(Self::ENTITY, "completed_at", patch.completed_at.as_ref())
    }
}
