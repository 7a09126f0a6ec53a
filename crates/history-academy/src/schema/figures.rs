//! Hero's diary: historical figures with their diary entries and media
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::curriculum::HistoricalPeriod;
use crate::error::StoreError;
use crate::store::columns::{
    check_storable_date, json_column, optional_timestamp_column, timestamp_column, Bag, ColumnSet,
};
use crate::store::record::{Dependent, Record, Reference};

// ===== Historical figures =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalFigure {
    pub id: i64,
    pub name: String,
    pub birth_date: Option<DateTime<Utc>>,
    pub death_date: Option<DateTime<Utc>>,
    pub biography: String,
    pub historical_period_id: i64,
    pub role_description: String,
    pub portrait_url: Option<String>,
    pub achievements: Vec<String>,
    pub famous_quotes: Vec<String>,
    pub historical_significance: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct HistoricalFigureCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub death_date: Option<DateTime<Utc>>,
    #[validate(length(max = 5000))]
    pub biography: String,
    pub historical_period_id: i64,
    #[validate(length(max = 1000))]
    pub role_description: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub portrait_url: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default)]
    pub famous_quotes: Vec<String>,
    #[validate(length(max = 2000))]
    pub historical_significance: String,
}

impl HistoricalFigureCreate {
    pub fn new(name: &str, historical_period_id: i64) -> Self {
        Self {
            name: name.to_string(),
            birth_date: None,
            death_date: None,
            biography: String::new(),
            historical_period_id,
            role_description: String::new(),
            portrait_url: None,
            achievements: Vec::new(),
            famous_quotes: Vec::new(),
            historical_significance: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct HistoricalFigureUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
    pub death_date: Option<DateTime<Utc>>,
    #[validate(length(max = 5000))]
    pub biography: Option<String>,
    pub historical_period_id: Option<i64>,
    #[validate(length(max = 1000))]
    pub role_description: Option<String>,
    #[validate(length(max = 500))]
    pub portrait_url: Option<String>,
    pub achievements: Option<Vec<String>>,
    pub famous_quotes: Option<Vec<String>>,
    #[validate(length(max = 2000))]
    pub historical_significance: Option<String>,
    pub is_active: Option<bool>,
}

impl Record for HistoricalFigure {
    const ENTITY: &'static str = "HistoricalFigure";
    const TABLE: &'static str = "historical_figures";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("diary_entries", "historical_figure_id"),
        Dependent::new("multimedia_items", "historical_figure_id"),
        Dependent::new("ar_models", "historical_figure_id"),
        Dependent::new("ar_experiences", "historical_figure_id"),
        Dependent::new("user_progress", "historical_figure_id"),
    ];

    type Create = HistoricalFigureCreate;
    type Update = HistoricalFigureUpdate;

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
            birth_date: optional_timestamp_column(row, "birth_date")?,
            death_date: optional_timestamp_column(row, "death_date")?,
            biography: row.get("biography")?,
            historical_period_id: row.get("historical_period_id")?,
            role_description: row.get("role_description")?,
            portrait_url: row.get("portrait_url")?,
            achievements: json_column(row, "achievements")?,
            famous_quotes: json_column(row, "famous_quotes")?,
            historical_significance: row.get("historical_significance")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &HistoricalFigureCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("name", input.name.clone())
            .time_opt("birth_date", input.birth_date)
            .time_opt("death_date", input.death_date)
            .set("biography", input.biography.clone())
            .set("historical_period_id", input.historical_period_id)
            .set("role_description", input.role_description.clone())
            .set("portrait_url", input.portrait_url.clone())
            .set("historical_significance", input.historical_significance.clone())
            .set("is_active", true)
            .json("achievements", &input.achievements)?
            .json("famous_quotes", &input.famous_quotes)
    }

    fn update_columns(patch: &HistoricalFigureUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("name", patch.name.clone())
            .time_some("birth_date", patch.birth_date)
            .time_some("death_date", patch.death_date)
            .set_some("biography", patch.biography.clone())
            .set_some("historical_period_id", patch.historical_period_id)
            .set_some("role_description", patch.role_description.clone())
            .set_some("portrait_url", patch.portrait_url.clone())
            .set_some("historical_significance", patch.historical_significance.clone())
            .set_some("is_active", patch.is_active)
            .json_some("achievements", patch.achievements.as_ref())?
            .json_some("famous_quotes", patch.famous_quotes.as_ref())
    }

    fn references(input: &HistoricalFigureCreate) -> Vec<Reference> {
        vec![Reference::to::<HistoricalPeriod>(
            "historical_period_id",
            input.historical_period_id,
        )]
    }

    fn patch_references(patch: &HistoricalFigureUpdate) -> Vec<Reference> {
        patch
            .historical_period_id
            .map(|id| Reference::to::<HistoricalPeriod>("historical_period_id", id))
            .into_iter()
            .collect()
    }

    fn check_create(input: &HistoricalFigureCreate) -> Result<(), StoreError> {
        check_storable_date(Self::ENTITY, "birth_date", input.birth_date.as_ref())?;
        check_storable_date(Self::ENTITY, "death_date", input.death_date.as_ref())
    }

    fn check_update(patch: &HistoricalFigureUpdate) -> Result<(), StoreError> {
        check_storable_date(Self::ENTITY, "birth_date", patch.birth_date.as_ref())?;
        check_storable_date(Self::ENTITY, "death_date", patch.death_date.as_ref())
    }
}

// ===== Diary entries =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: i64,
    pub historical_figure_id: i64,
    pub title: String,
    pub content: String,
    /// The historical moment the entry is written from, not when it was stored.
    pub entry_date: DateTime<Utc>,
    pub emotional_tone: Option<String>,
    pub key_events: Vec<String>,
    pub historical_context: String,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DiaryEntryCreate {
    pub historical_figure_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub content: String,
    pub entry_date: DateTime<Utc>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub emotional_tone: Option<String>,
    #[serde(default)]
    pub key_events: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub historical_context: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub display_order: i32,
}

impl DiaryEntryCreate {
    pub fn new(historical_figure_id: i64, title: &str, content: &str, entry_date: DateTime<Utc>) -> Self {
        Self {
            historical_figure_id,
            title: title.to_string(),
            content: content.to_string(),
            entry_date,
            emotional_tone: None,
            key_events: Vec::new(),
            historical_context: String::new(),
            display_order: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct DiaryEntryUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub content: Option<String>,
    pub entry_date: Option<DateTime<Utc>>,
    #[validate(length(max = 100))]
    pub emotional_tone: Option<String>,
    pub key_events: Option<Vec<String>>,
    #[validate(length(max = 2000))]
    pub historical_context: Option<String>,
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl Record for DiaryEntry {
    const ENTITY: &'static str = "DiaryEntry";
    const TABLE: &'static str = "diary_entries";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");

    type Create = DiaryEntryCreate;
    type Update = DiaryEntryUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            historical_figure_id: row.get("historical_figure_id")?,
            title: row.get("title")?,
            content: row.get("content")?,
            entry_date: timestamp_column(row, "entry_date")?,
            emotional_tone: row.get("emotional_tone")?,
            key_events: json_column(row, "key_events")?,
            historical_context: row.get("historical_context")?,
            display_order: row.get("display_order")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &DiaryEntryCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("historical_figure_id", input.historical_figure_id)
            .set("title", input.title.clone())
            .set("content", input.content.clone())
            .time("entry_date", input.entry_date)
            .set("emotional_tone", input.emotional_tone.clone())
            .set("historical_context", input.historical_context.clone())
            .set("display_order", input.display_order)
            .set("is_active", true)
            .json("key_events", &input.key_events)
    }

    fn update_columns(patch: &DiaryEntryUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("title", patch.title.clone())
            .set_some("content", patch.content.clone())
            .time_some("entry_date", patch.entry_date)
            .set_some("emotional_tone", patch.emotional_tone.clone())
            .set_some("historical_context", patch.historical_context.clone())
            .set_some("display_order", patch.display_order)
            .set_some("is_active", patch.is_active)
            .json_some("key_events", patch.key_events.as_ref())
    }

    fn references(input: &DiaryEntryCreate) -> Vec<Reference> {
        vec![Reference::to::<HistoricalFigure>(
            "historical_figure_id",
            input.historical_figure_id,
        )]
    }

    fn check_create(input: &DiaryEntryCreate) -> Result<(), StoreError> {
        check_storable_date(Self::ENTITY, "entry_date", Some(&input.entry_date))
    }

    fn check_update(patch: &DiaryEntryUpdate) -> Result<(), StoreError> {
        check_storable_date(Self::ENTITY, "entry_date", patch.entry_date.as_ref())
    }
}

// ===== Multimedia =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultimediaItem {
    pub id: i64,
    pub historical_figure_id: i64,
    pub title: String,
    pub description: String,
    /// Free-form kind such as photo, document, audio or video.
    pub media_type: String,
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub media_metadata: Bag,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MultimediaItemCreate {
    pub historical_figure_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub media_type: String,
    #[validate(length(min = 1, max = 500))]
    pub file_url: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub media_metadata: Bag,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub display_order: i32,
}

impl MultimediaItemCreate {
    pub fn new(historical_figure_id: i64, title: &str, media_type: &str, file_url: &str) -> Self {
        Self {
            historical_figure_id,
            title: title.to_string(),
            description: String::new(),
            media_type: media_type.to_string(),
            file_url: file_url.to_string(),
            thumbnail_url: None,
            media_metadata: Bag::new(),
            display_order: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct MultimediaItemUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub media_type: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub file_url: Option<String>,
    #[validate(length(max = 500))]
    pub thumbnail_url: Option<String>,
    pub media_metadata: Option<Bag>,
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl Record for MultimediaItem {
    const ENTITY: &'static str = "MultimediaItem";
    const TABLE: &'static str = "multimedia_items";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");

    type Create = MultimediaItemCreate;
    type Update = MultimediaItemUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            historical_figure_id: row.get("historical_figure_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            media_type: row.get("media_type")?,
            file_url: row.get("file_url")?,
            thumbnail_url: row.get("thumbnail_url")?,
            media_metadata: json_column(row, "media_metadata")?,
            display_order: row.get("display_order")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &MultimediaItemCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("historical_figure_id", input.historical_figure_id)
            .set("title", input.title.clone())
            .set("description", input.description.clone())
            .set("media_type", input.media_type.clone())
            .set("file_url", input.file_url.clone())
            .set("thumbnail_url", input.thumbnail_url.clone())
            .set("display_order", input.display_order)
            .set("is_active", true)
            .json("media_metadata", &input.media_metadata)
    }

    fn update_columns(patch: &MultimediaItemUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("title", patch.title.clone())
            .set_some("description", patch.description.clone())
            .set_some("media_type", patch.media_type.clone())
            .set_some("file_url", patch.file_url.clone())
            .set_some("thumbnail_url", patch.thumbnail_url.clone())
            .set_some("display_order", patch.display_order)
            .set_some("is_active", patch.is_active)
            .json_some("media_metadata", patch.media_metadata.as_ref())
    }

    fn references(input: &MultimediaItemCreate) -> Vec<Reference> {
        vec![Reference::to::<HistoricalFigure>(
            "historical_figure_id",
            input.historical_figure_id,
        )]
    }
}
