//! Vocabulary explorer: terms and the directed connections between them
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::curriculum::HistoricalPeriod;
use super::enums::DifficultyLevel;
use crate::error::StoreError;
use crate::store::columns::{json_column, timestamp_column, ColumnSet};
use crate::store::record::{Dependent, Record, Reference, UniqueKey};

fn default_strength() -> i32 {
    1
}

fn period_references(ids: &[i64]) -> Vec<Reference> {
    ids.iter()
        .map(|&id| Reference::to::<HistoricalPeriod>("related_periods", id))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyTerm {
    pub id: i64,
    pub term: String,
    pub definition: String,
    pub pronunciation: Option<String>,
    pub audio_url: Option<String>,
    pub image_urls: Vec<String>,
    pub historical_context: Option<String>,
    pub related_periods: Vec<i64>,
    pub tags: Vec<String>,
    pub difficulty_level: DifficultyLevel,
    pub usage_count: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct VocabularyTermCreate {
    #[validate(length(min = 1, max = 200))]
    pub term: String,
    #[validate(length(min = 1, max = 2000))]
    pub definition: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub pronunciation: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub historical_context: Option<String>,
    #[serde(default)]
    pub related_periods: Vec<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
}

impl VocabularyTermCreate {
    pub fn new(term: &str, definition: &str) -> Self {
        Self {
            term: term.to_string(),
            definition: definition.to_string(),
            pronunciation: None,
            audio_url: None,
            image_urls: Vec::new(),
            historical_context: None,
            related_periods: Vec::new(),
            tags: Vec::new(),
            difficulty_level: DifficultyLevel::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct VocabularyTermUpdate {
    #[validate(length(min = 1, max = 200))]
    pub term: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub definition: Option<String>,
    #[validate(length(max = 500))]
    pub pronunciation: Option<String>,
    #[validate(length(max = 500))]
    pub audio_url: Option<String>,
    pub image_urls: Option<Vec<String>>,
    #[validate(length(max = 2000))]
    pub historical_context: Option<String>,
    pub related_periods: Option<Vec<i64>>,
    pub tags: Option<Vec<String>>,
    pub difficulty_level: Option<DifficultyLevel>,
    #[validate(range(min = 0))]
    pub usage_count: Option<i32>,
    pub is_active: Option<bool>,
}

impl Record for VocabularyTerm {
    const ENTITY: &'static str = "VocabularyTerm";
    const TABLE: &'static str = "vocabulary_terms";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("term_connections", "source_term_id"),
        Dependent::new("term_connections", "target_term_id"),
    ];

    type Create = VocabularyTermCreate;
    type Update = VocabularyTermUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            term: row.get("term")?,
            definition: row.get("definition")?,
            pronunciation: row.get("pronunciation")?,
            audio_url: row.get("audio_url")?,
            image_urls: json_column(row, "image_urls")?,
            historical_context: row.get("historical_context")?,
            related_periods: json_column(row, "related_periods")?,
            tags: json_column(row, "tags")?,
            difficulty_level: row.get("difficulty_level")?,
            usage_count: row.get("usage_count")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &VocabularyTermCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("term", input.term.clone())
            .set("definition", input.definition.clone())
            .set("pronunciation", input.pronunciation.clone())
            .set("audio_url", input.audio_url.clone())
            .set("historical_context", input.historical_context.clone())
            .set("difficulty_level", input.difficulty_level)
            .set("usage_count", 0)
            .set("is_active", true)
            .json("image_urls", &input.image_urls)?
            .json("related_periods", &input.related_periods)?
            .json("tags", &input.tags)
    }

    fn update_columns(patch: &VocabularyTermUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("term", patch.term.clone())
            .set_some("definition", patch.definition.clone())
            .set_some("pronunciation", patch.pronunciation.clone())
            .set_some("audio_url", patch.audio_url.clone())
            .set_some("historical_context", patch.historical_context.clone())
            .set_some("difficulty_level", patch.difficulty_level)
            .set_some("usage_count", patch.usage_count)
            .set_some("is_active", patch.is_active)
            .json_some("image_urls", patch.image_urls.as_ref())?
            .json_some("related_periods", patch.related_periods.as_ref())?
            .json_some("tags", patch.tags.as_ref())
    }

    fn references(input: &VocabularyTermCreate) -> Vec<Reference> {
        period_references(&input.related_periods)
    }

    fn patch_references(patch: &VocabularyTermUpdate) -> Vec<Reference> {
        patch
            .related_periods
            .as_deref()
            .map(period_references)
            .unwrap_or_default()
    }

    fn unique_keys(input: &VocabularyTermCreate) -> Vec<UniqueKey> {
        vec![UniqueKey::new("term", &input.term)]
    }

    fn patch_unique_keys(patch: &VocabularyTermUpdate) -> Vec<UniqueKey> {
        patch
            .term
            .as_deref()
            .map(|term| UniqueKey::new("term", term))
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermConnection {
    pub id: i64,
    pub source_term_id: i64,
    pub target_term_id: i64,
    pub connection_type: String,
    pub description: Option<String>,
    pub strength: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TermConnectionCreate {
    pub source_term_id: i64,
    pub target_term_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub connection_type: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default = "default_strength")]
    #[validate(range(min = 1, max = 5))]
    pub strength: i32,
}

impl TermConnectionCreate {
    pub fn new(source_term_id: i64, target_term_id: i64, connection_type: &str) -> Self {
        Self {
            source_term_id,
            target_term_id,
            connection_type: connection_type.to_string(),
            description: None,
            strength: default_strength(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct TermConnectionUpdate {
    pub source_term_id: Option<i64>,
    pub target_term_id: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    pub connection_type: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub strength: Option<i32>,
}

impl Record for TermConnection {
    const ENTITY: &'static str = "TermConnection";
    const TABLE: &'static str = "term_connections";

    type Create = TermConnectionCreate;
    type Update = TermConnectionUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            source_term_id: row.get("source_term_id")?,
            target_term_id: row.get("target_term_id")?,
            connection_type: row.get("connection_type")?,
            description: row.get("description")?,
            strength: row.get("strength")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &TermConnectionCreate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set("source_term_id", input.source_term_id)
            .set("target_term_id", input.target_term_id)
            .set("connection_type", input.connection_type.clone())
            .set("description", input.description.clone())
            .set("strength", input.strength))
    }

    fn update_columns(patch: &TermConnectionUpdate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set_some("source_term_id", patch.source_term_id)
            .set_some("target_term_id", patch.target_term_id)
            .set_some("connection_type", patch.connection_type.clone())
            .set_some("description", patch.description.clone())
            .set_some("strength", patch.strength))
    }

    fn references(input: &TermConnectionCreate) -> Vec<Reference> {
        vec![
            Reference::to::<VocabularyTerm>("source_term_id", input.source_term_id),
            Reference::to::<VocabularyTerm>("target_term_id", input.target_term_id),
        ]
    }

    fn patch_references(patch: &TermConnectionUpdate) -> Vec<Reference> {
        let mut refs = Vec::new();
        if let Some(id) = patch.source_term_id {
            refs.push(Reference::to::<VocabularyTerm>("source_term_id", id));
        }
        if let Some(id) = patch.target_term_id {
            refs.push(Reference::to::<VocabularyTerm>("target_term_id", id));
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_bounds() {
        let mut input = TermConnectionCreate::new(1, 2, "related_to");
        assert!(input.validate().is_ok());
        for bad in [0, 6, -1] {
            input.strength = bad;
            let errors = input.validate().unwrap_err();
            assert!(errors.field_errors().contains_key("strength"));
        }
        input.strength = 5;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_related_periods_each_become_a_reference() {
        let mut input = VocabularyTermCreate::new("Pharaoh", "A ruler of ancient Egypt");
        input.related_periods = vec![3, 9];
        let refs = VocabularyTerm::references(&input);
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|r| r.field == "related_periods" && r.table == "historical_periods"));
        assert_eq!(refs[1].id, 9);
    }

    #[test]
    fn test_term_patch_checks_uniqueness_only_when_renamed() {
        assert!(VocabularyTerm::patch_unique_keys(&VocabularyTermUpdate::default()).is_empty());
        let patch = VocabularyTermUpdate {
            term: Some("Scribe".into()),
            ..Default::default()
        };
        assert_eq!(VocabularyTerm::patch_unique_keys(&patch), vec![UniqueKey::new("term", "Scribe")]);
    }

    #[test]
    fn test_definition_required() {
        let input = VocabularyTermCreate::new("Papyrus", "");
        assert!(input.validate().is_err());
    }
}
