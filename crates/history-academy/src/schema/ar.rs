//! Augmented reality: figure models and the trigger -> experience -> interaction chain
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{ContentType, TriggerType};
use super::figures::HistoricalFigure;
use crate::error::StoreError;
use crate::store::columns::{json_column, timestamp_column, Bag, ColumnSet};
use crate::store::record::{Dependent, Record, Reference};

fn default_scale_factor() -> f64 {
    1.0
}

// ===== Models =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArModel {
    pub id: i64,
    pub historical_figure_id: i64,
    pub model_name: String,
    pub model_file_url: String,
    pub texture_urls: Vec<String>,
    pub animation_data: Bag,
    pub trigger_images: Vec<String>,
    pub interaction_scripts: Vec<Bag>,
    pub scale_factor: f64,
    /// Axis name to offset, e.g. `{"x": 0.0, "y": 1.5}`.
    pub position_offset: BTreeMap<String, f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ArModelCreate {
    pub historical_figure_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub model_name: String,
    #[validate(length(min = 1, max = 500))]
    pub model_file_url: String,
    #[serde(default)]
    pub texture_urls: Vec<String>,
    #[serde(default)]
    pub animation_data: Bag,
    #[serde(default)]
    pub trigger_images: Vec<String>,
    #[serde(default)]
    pub interaction_scripts: Vec<Bag>,
    #[serde(default = "default_scale_factor")]
    #[validate(range(min = 0.0))]
    pub scale_factor: f64,
    #[serde(default)]
    pub position_offset: BTreeMap<String, f64>,
}

impl ArModelCreate {
    pub fn new(historical_figure_id: i64, model_name: &str, model_file_url: &str) -> Self {
        Self {
            historical_figure_id,
            model_name: model_name.to_string(),
            model_file_url: model_file_url.to_string(),
            texture_urls: Vec::new(),
            animation_data: Bag::new(),
            trigger_images: Vec::new(),
            interaction_scripts: Vec::new(),
            scale_factor: default_scale_factor(),
            position_offset: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ArModelUpdate {
    #[validate(length(min = 1, max = 200))]
    pub model_name: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub model_file_url: Option<String>,
    pub texture_urls: Option<Vec<String>>,
    pub animation_data: Option<Bag>,
    pub trigger_images: Option<Vec<String>>,
    pub interaction_scripts: Option<Vec<Bag>>,
    #[validate(range(min = 0.0))]
    pub scale_factor: Option<f64>,
    pub position_offset: Option<BTreeMap<String, f64>>,
    pub is_active: Option<bool>,
}

fn check_scale(value: Option<f64>) -> Result<(), StoreError> {
    match value {
        Some(scale) if !scale.is_finite() => Err(StoreError::validation(
            ArModel::ENTITY,
            "scale_factor",
            "must be a finite number",
        )),
        _ => Ok(()),
    }
}

fn check_offset(value: Option<&BTreeMap<String, f64>>) -> Result<(), StoreError> {
    match value.and_then(|offset| offset.iter().find(|(_, v)| !v.is_finite())) {
        Some((axis, _)) => Err(StoreError::validation(
            ArModel::ENTITY,
            "position_offset",
            format!("{} must be a finite number", axis),
        )),
        None => Ok(()),
    }
}

impl Record for ArModel {
    const ENTITY: &'static str = "ArModel";
    const TABLE: &'static str = "ar_models";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");

    type Create = ArModelCreate;
    type Update = ArModelUpdate;

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
            model_name: row.get("model_name")?,
            model_file_url: row.get("model_file_url")?,
            texture_urls: json_column(row, "texture_urls")?,
            animation_data: json_column(row, "animation_data")?,
            trigger_images: json_column(row, "trigger_images")?,
            interaction_scripts: json_column(row, "interaction_scripts")?,
            scale_factor: row.get("scale_factor")?,
            position_offset: json_column(row, "position_offset")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &ArModelCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("historical_figure_id", input.historical_figure_id)
            .set("model_name", input.model_name.clone())
            .set("model_file_url", input.model_file_url.clone())
            .set("scale_factor", input.scale_factor)
            .set("is_active", true)
            .json("texture_urls", &input.texture_urls)?
            .json("animation_data", &input.animation_data)?
            .json("trigger_images", &input.trigger_images)?
            .json("interaction_scripts", &input.interaction_scripts)?
            .json("position_offset", &input.position_offset)
    }

    fn update_columns(patch: &ArModelUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("model_name", patch.model_name.clone())
            .set_some("model_file_url", patch.model_file_url.clone())
            .set_some("scale_factor", patch.scale_factor)
            .set_some("is_active", patch.is_active)
            .json_some("texture_urls", patch.texture_urls.as_ref())?
            .json_some("animation_data", patch.animation_data.as_ref())?
            .json_some("trigger_images", patch.trigger_images.as_ref())?
            .json_some("interaction_scripts", patch.interaction_scripts.as_ref())?
            .json_some("position_offset", patch.position_offset.as_ref())
    }

    fn references(input: &ArModelCreate) -> Vec<Reference> {
        vec![Reference::to::<HistoricalFigure>(
            "historical_figure_id",
            input.historical_figure_id,
        )]
    }

    fn check_create(input: &ArModelCreate) -> Result<(), StoreError> {
        check_scale(Some(input.scale_factor))?;
        check_offset(Some(&input.position_offset))
    }

    fn check_update(patch: &ArModelUpdate) -> Result<(), StoreError> {
        check_scale(patch.scale_factor)?;
        check_offset(patch.position_offset.as_ref())
    }
}

// ===== Triggers =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArTrigger {
    pub id: i64,
    pub name: String,
    pub trigger_type: TriggerType,
    pub target_url: String,
    pub marker_data: Bag,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ArTriggerCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub trigger_type: TriggerType,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub target_url: String,
    #[serde(default)]
    pub marker_data: Bag,
}

impl ArTriggerCreate {
    pub fn new(name: &str, trigger_type: TriggerType) -> Self {
        Self {
            name: name.to_string(),
            trigger_type,
            target_url: String::new(),
            marker_data: Bag::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ArTriggerUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub trigger_type: Option<TriggerType>,
    #[validate(length(max = 500))]
    pub target_url: Option<String>,
    pub marker_data: Option<Bag>,
    pub is_active: Option<bool>,
}

impl Record for ArTrigger {
    const ENTITY: &'static str = "ArTrigger";
    const TABLE: &'static str = "ar_triggers";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");
    const DEPENDENTS: &'static [Dependent] = &[Dependent::new("ar_experiences", "ar_trigger_id")];

    type Create = ArTriggerCreate;
    type Update = ArTriggerUpdate;

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
            trigger_type: row.get("trigger_type")?,
            target_url: row.get("target_url")?,
            marker_data: json_column(row, "marker_data")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &ArTriggerCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("name", input.name.clone())
            .set("trigger_type", input.trigger_type)
            .set("target_url", input.target_url.clone())
            .set("is_active", true)
            .json("marker_data", &input.marker_data)
    }

    fn update_columns(patch: &ArTriggerUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("name", patch.name.clone())
            .set_some("trigger_type", patch.trigger_type)
            .set_some("target_url", patch.target_url.clone())
            .set_some("is_active", patch.is_active)
            .json_some("marker_data", patch.marker_data.as_ref())
    }
}

// ===== Experiences =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArExperience {
    pub id: i64,
    pub ar_trigger_id: i64,
    pub historical_figure_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub content_type: ContentType,
    pub content_url: String,
    pub animation_url: Option<String>,
    pub settings: Bag,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ArExperienceCreate {
    pub ar_trigger_id: i64,
    #[serde(default)]
    pub historical_figure_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    pub content_type: ContentType,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub content_url: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub animation_url: Option<String>,
    #[serde(default)]
    pub settings: Bag,
}

impl ArExperienceCreate {
    pub fn new(ar_trigger_id: i64, title: &str, content_type: ContentType) -> Self {
        Self {
            ar_trigger_id,
            historical_figure_id: None,
            title: title.to_string(),
            description: String::new(),
            content_type,
            content_url: String::new(),
            animation_url: None,
            settings: Bag::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ArExperienceUpdate {
    pub ar_trigger_id: Option<i64>,
    pub historical_figure_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub content_type: Option<ContentType>,
    #[validate(length(max = 500))]
    pub content_url: Option<String>,
    #[validate(length(max = 500))]
    pub animation_url: Option<String>,
    pub settings: Option<Bag>,
    pub is_active: Option<bool>,
}

impl Record for ArExperience {
    const ENTITY: &'static str = "ArExperience";
    const TABLE: &'static str = "ar_experiences";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");
    const DEPENDENTS: &'static [Dependent] = &[Dependent::new("ar_interactions", "ar_experience_id")];

    type Create = ArExperienceCreate;
    type Update = ArExperienceUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            ar_trigger_id: row.get("ar_trigger_id")?,
            historical_figure_id: row.get("historical_figure_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            content_type: row.get("content_type")?,
            content_url: row.get("content_url")?,
            animation_url: row.get("animation_url")?,
            settings: json_column(row, "settings")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &ArExperienceCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("ar_trigger_id", input.ar_trigger_id)
            .set("historical_figure_id", input.historical_figure_id)
            .set("title", input.title.clone())
            .set("description", input.description.clone())
            .set("content_type", input.content_type)
            .set("content_url", input.content_url.clone())
            .set("animation_url", input.animation_url.clone())
            .set("is_active", true)
            .json("settings", &input.settings)
    }

    fn update_columns(patch: &ArExperienceUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("ar_trigger_id", patch.ar_trigger_id)
            .set_some("historical_figure_id", patch.historical_figure_id)
            .set_some("title", patch.title.clone())
            .set_some("description", patch.description.clone())
            .set_some("content_type", patch.content_type)
            .set_some("content_url", patch.content_url.clone())
            .set_some("animation_url", patch.animation_url.clone())
            .set_some("is_active", patch.is_active)
            .json_some("settings", patch.settings.as_ref())
    }

    fn references(input: &ArExperienceCreate) -> Vec<Reference> {
        let mut refs = vec![Reference::to::<ArTrigger>("ar_trigger_id", input.ar_trigger_id)];
        if let Some(id) = input.historical_figure_id {
            refs.push(Reference::to::<HistoricalFigure>("historical_figure_id", id));
        }
        refs
    }

    fn patch_references(patch: &ArExperienceUpdate) -> Vec<Reference> {
        let mut refs = Vec::new();
        if let Some(id) = patch.ar_trigger_id {
            refs.push(Reference::to::<ArTrigger>("ar_trigger_id", id));
        }
        if let Some(id) = patch.historical_figure_id {
            refs.push(Reference::to::<HistoricalFigure>("historical_figure_id", id));
        }
        refs
    }
}

// ===== Interactions =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArInteraction {
    pub id: i64,
    pub ar_experience_id: i64,
    pub interaction_type: String,
    pub prompt: Option<String>,
    pub interaction_scripts: Vec<Bag>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ArInteractionCreate {
    pub ar_experience_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub interaction_type: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub prompt: Option<String>,
    #[serde(default)]
    pub interaction_scripts: Vec<Bag>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub display_order: i32,
}

impl ArInteractionCreate {
    pub fn new(ar_experience_id: i64, interaction_type: &str) -> Self {
        Self {
            ar_experience_id,
            interaction_type: interaction_type.to_string(),
            prompt: None,
            interaction_scripts: Vec::new(),
            display_order: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ArInteractionUpdate {
    #[validate(length(min = 1, max = 100))]
    pub interaction_type: Option<String>,
    #[validate(length(max = 500))]
    pub prompt: Option<String>,
    pub interaction_scripts: Option<Vec<Bag>>,
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
}

impl Record for ArInteraction {
    const ENTITY: &'static str = "ArInteraction";
    const TABLE: &'static str = "ar_interactions";

    type Create = ArInteractionCreate;
    type Update = ArInteractionUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            ar_experience_id: row.get("ar_experience_id")?,
            interaction_type: row.get("interaction_type")?,
            prompt: row.get("prompt")?,
            interaction_scripts: json_column(row, "interaction_scripts")?,
            display_order: row.get("display_order")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &ArInteractionCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("ar_experience_id", input.ar_experience_id)
            .set("interaction_type", input.interaction_type.clone())
            .set("prompt", input.prompt.clone())
            .set("display_order", input.display_order)
            .json("interaction_scripts", &input.interaction_scripts)
    }

    fn update_columns(patch: &ArInteractionUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("interaction_type", patch.interaction_type.clone())
            .set_some("prompt", patch.prompt.clone())
            .set_some("display_order", patch.display_order)
            .json_some("interaction_scripts", patch.interaction_scripts.as_ref())
    }

    fn references(input: &ArInteractionCreate) -> Vec<Reference> {
        vec![Reference::to::<ArExperience>("ar_experience_id", input.ar_experience_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_scale_defaults_and_bounds() {
        let input: ArModelCreate = serde_json::from_value(serde_json::json!({
            "historical_figure_id": 1,
            "model_name": "Caesar bust",
            "model_file_url": "https://cdn.example.com/caesar.glb",
            "position_offset": {"x": 0.0, "y": 1.5},
        }))
        .unwrap();
        assert_eq!(input.scale_factor, 1.0);
        assert_eq!(input.position_offset.get("y"), Some(&1.5));

        let mut negative = input.clone();
        negative.scale_factor = -0.5;
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_non_finite_scale_rejected() {
        let mut input = ArModelCreate::new(1, "Bust", "https://cdn.example.com/bust.glb");
        input.scale_factor = f64::INFINITY;
        let err = ArModel::check_create(&input).unwrap_err();
        assert_eq!(err.field(), Some("scale_factor"));

        let patch = ArModelUpdate {
            position_offset: Some(BTreeMap::from([("z".to_string(), f64::NAN)])),
            ..Default::default()
        };
        let err = ArModel::check_update(&patch).unwrap_err();
        assert_eq!(err.field(), Some("position_offset"));
    }

    #[test]
    fn test_experience_figure_reference_is_optional() {
        let mut input = ArExperienceCreate::new(3, "Meet Cleopatra", ContentType::Model3d);
        assert_eq!(ArExperience::references(&input).len(), 1);
        input.historical_figure_id = Some(8);
        let refs = ArExperience::references(&input);
        assert_eq!(refs[1].table, "historical_figures");
    }

    #[test]
    fn test_unknown_trigger_type_fails_to_decode() {
        let result = serde_json::from_value::<ArTriggerCreate>(serde_json::json!({
            "name": "Museum plaque",
            "trigger_type": "nfc",
        }));
        assert!(result.is_err());
    }
}
