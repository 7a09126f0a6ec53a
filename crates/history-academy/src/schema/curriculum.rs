//! Historical periods and the classroom material organised under them
use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{ActivityType, GradeLevel, MaterialType};
use super::users::User;
use crate::error::StoreError;
use crate::store::columns::{json_column, timestamp_column, Bag, ColumnSet};
use crate::store::record::{Dependent, Record, Reference};

fn default_activity_points() -> i32 {
    10
}

// ===== Historical periods =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPeriod {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub image_url: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct HistoricalPeriodCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: String,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub display_order: i32,
}

impl HistoricalPeriodCreate {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            start_year: None,
            end_year: None,
            image_url: None,
            display_order: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct HistoricalPeriodUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl Record for HistoricalPeriod {
    const ENTITY: &'static str = "HistoricalPeriod";
    const TABLE: &'static str = "historical_periods";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("learning_modules", "historical_period_id"),
        Dependent::new("quiz_levels", "historical_period_id"),
        Dependent::new("historical_figures", "historical_period_id"),
        Dependent::id_list("vocabulary_terms", "related_periods"),
    ];

    type Create = HistoricalPeriodCreate;
    type Update = HistoricalPeriodUpdate;

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
            start_year: row.get("start_year")?,
            end_year: row.get("end_year")?,
            image_url: row.get("image_url")?,
            display_order: row.get("display_order")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &HistoricalPeriodCreate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set("name", input.name.clone())
            .set("description", input.description.clone())
            .set("start_year", input.start_year)
            .set("end_year", input.end_year)
            .set("image_url", input.image_url.clone())
            .set("display_order", input.display_order)
            .set("is_active", true))
    }

    fn update_columns(patch: &HistoricalPeriodUpdate) -> Result<ColumnSet, StoreError> {
        Ok(ColumnSet::new()
            .set_some("name", patch.name.clone())
            .set_some("description", patch.description.clone())
            .set_some("start_year", patch.start_year)
            .set_some("end_year", patch.end_year)
            .set_some("image_url", patch.image_url.clone())
            .set_some("display_order", patch.display_order)
            .set_some("is_active", patch.is_active))
    }
}

// ===== Learning modules =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningModule {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub historical_period_id: i64,
    pub grade_level: GradeLevel,
    pub curriculum_alignment: String,
    pub learning_objectives: Vec<String>,
    pub teacher_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LearningModuleCreate {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: String,
    pub historical_period_id: i64,
    pub grade_level: GradeLevel,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub curriculum_alignment: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub teacher_id: Option<i64>,
}

impl LearningModuleCreate {
    pub fn new(title: &str, historical_period_id: i64, grade_level: GradeLevel) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            historical_period_id,
            grade_level,
            curriculum_alignment: String::new(),
            learning_objectives: Vec::new(),
            teacher_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct LearningModuleUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub historical_period_id: Option<i64>,
    pub grade_level: Option<GradeLevel>,
    #[validate(length(max = 500))]
    pub curriculum_alignment: Option<String>,
    pub learning_objectives: Option<Vec<String>>,
    pub teacher_id: Option<i64>,
    pub is_active: Option<bool>,
}

impl Record for LearningModule {
    const ENTITY: &'static str = "LearningModule";
    const TABLE: &'static str = "learning_modules";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_active");
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent::new("teaching_materials", "learning_module_id"),
        Dependent::new("lesson_plans", "learning_module_id"),
        Dependent::new("student_activities", "learning_module_id"),
    ];

    type Create = LearningModuleCreate;
    type Update = LearningModuleUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            historical_period_id: row.get("historical_period_id")?,
            grade_level: row.get("grade_level")?,
            curriculum_alignment: row.get("curriculum_alignment")?,
            learning_objectives: json_column(row, "learning_objectives")?,
            teacher_id: row.get("teacher_id")?,
            is_active: row.get("is_active")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &LearningModuleCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("title", input.title.clone())
            .set("description", input.description.clone())
            .set("historical_period_id", input.historical_period_id)
            .set("grade_level", input.grade_level)
            .set("curriculum_alignment", input.curriculum_alignment.clone())
            .set("teacher_id", input.teacher_id)
            .set("is_active", true)
            .json("learning_objectives", &input.learning_objectives)
    }

    fn update_columns(patch: &LearningModuleUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("title", patch.title.clone())
            .set_some("description", patch.description.clone())
            .set_some("historical_period_id", patch.historical_period_id)
            .set_some("grade_level", patch.grade_level)
            .set_some("curriculum_alignment", patch.curriculum_alignment.clone())
            .set_some("teacher_id", patch.teacher_id)
            .set_some("is_active", patch.is_active)
            .json_some("learning_objectives", patch.learning_objectives.as_ref())
    }

    fn references(input: &LearningModuleCreate) -> Vec<Reference> {
        let mut refs = vec![Reference::to::<HistoricalPeriod>(
            "historical_period_id",
            input.historical_period_id,
        )];
        if let Some(teacher_id) = input.teacher_id {
            refs.push(Reference::to::<User>("teacher_id", teacher_id));
        }
        refs
    }

    fn patch_references(patch: &LearningModuleUpdate) -> Vec<Reference> {
        let mut refs = Vec::new();
        if let Some(id) = patch.historical_period_id {
            refs.push(Reference::to::<HistoricalPeriod>("historical_period_id", id));
        }
        if let Some(id) = patch.teacher_id {
            refs.push(Reference::to::<User>("teacher_id", id));
        }
        refs
    }
}

// ===== Teaching materials =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingMaterial {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub learning_module_id: i64,
    pub material_type: MaterialType,
    pub file_url: Option<String>,
    pub content: Option<String>,
    pub material_metadata: Bag,
    pub is_validated: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TeachingMaterialCreate {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    pub learning_module_id: i64,
    pub material_type: MaterialType,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub file_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub material_metadata: Bag,
    #[serde(default)]
    pub is_validated: bool,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub display_order: i32,
}

impl TeachingMaterialCreate {
    pub fn new(title: &str, learning_module_id: i64, material_type: MaterialType) -> Self {
        Self {
            title: title.to_string(),
            description: String::new(),
            learning_module_id,
            material_type,
            file_url: None,
            content: None,
            material_metadata: Bag::new(),
            is_validated: false,
            display_order: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct TeachingMaterialUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub material_type: Option<MaterialType>,
    #[validate(length(max = 500))]
    pub file_url: Option<String>,
    pub content: Option<String>,
    pub material_metadata: Option<Bag>,
    pub is_validated: Option<bool>,
    #[validate(range(min = 0))]
    pub display_order: Option<i32>,
}

impl Record for TeachingMaterial {
    const ENTITY: &'static str = "TeachingMaterial";
    const TABLE: &'static str = "teaching_materials";

    type Create = TeachingMaterialCreate;
    type Update = TeachingMaterialUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            learning_module_id: row.get("learning_module_id")?,
            material_type: row.get("material_type")?,
            file_url: row.get("file_url")?,
            content: row.get("content")?,
            material_metadata: json_column(row, "material_metadata")?,
            is_validated: row.get("is_validated")?,
            display_order: row.get("display_order")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &TeachingMaterialCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("title", input.title.clone())
            .set("description", input.description.clone())
            .set("learning_module_id", input.learning_module_id)
            .set("material_type", input.material_type)
            .set("file_url", input.file_url.clone())
            .set("content", input.content.clone())
            .set("is_validated", input.is_validated)
            .set("display_order", input.display_order)
            .json("material_metadata", &input.material_metadata)
    }

    fn update_columns(patch: &TeachingMaterialUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("title", patch.title.clone())
            .set_some("description", patch.description.clone())
            .set_some("material_type", patch.material_type)
            .set_some("file_url", patch.file_url.clone())
            .set_some("content", patch.content.clone())
            .set_some("is_validated", patch.is_validated)
            .set_some("display_order", patch.display_order)
            .json_some("material_metadata", patch.material_metadata.as_ref())
    }

    fn references(input: &TeachingMaterialCreate) -> Vec<Reference> {
        vec![Reference::to::<LearningModule>("learning_module_id", input.learning_module_id)]
    }
}

// ===== Lesson plans =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPlan {
    pub id: i64,
    pub learning_module_id: i64,
    pub title: String,
    pub overview: String,
    pub objectives: Vec<String>,
    pub duration_minutes: i32,
    pub materials_needed: Vec<String>,
    pub procedure: Vec<String>,
    pub assessment: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LessonPlanCreate {
    pub learning_module_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub overview: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[validate(range(min = 0))]
    pub duration_minutes: i32,
    #[serde(default)]
    pub materials_needed: Vec<String>,
    #[serde(default)]
    pub procedure: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub assessment: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

impl LessonPlanCreate {
    pub fn new(learning_module_id: i64, title: &str, duration_minutes: i32) -> Self {
        Self {
            learning_module_id,
            title: title.to_string(),
            overview: String::new(),
            objectives: Vec::new(),
            duration_minutes,
            materials_needed: Vec::new(),
            procedure: Vec::new(),
            assessment: None,
            is_published: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct LessonPlanUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub overview: Option<String>,
    pub objectives: Option<Vec<String>>,
    #[validate(range(min = 0))]
    pub duration_minutes: Option<i32>,
    pub materials_needed: Option<Vec<String>>,
    pub procedure: Option<Vec<String>>,
    #[validate(length(max = 1000))]
    pub assessment: Option<String>,
    pub is_published: Option<bool>,
}

impl Record for LessonPlan {
    const ENTITY: &'static str = "LessonPlan";
    const TABLE: &'static str = "lesson_plans";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_published");

    type Create = LessonPlanCreate;
    type Update = LessonPlanUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            learning_module_id: row.get("learning_module_id")?,
            title: row.get("title")?,
            overview: row.get("overview")?,
            objectives: json_column(row, "objectives")?,
            duration_minutes: row.get("duration_minutes")?,
            materials_needed: json_column(row, "materials_needed")?,
            procedure: json_column(row, "procedure")?,
            assessment: row.get("assessment")?,
            is_published: row.get("is_published")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &LessonPlanCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("learning_module_id", input.learning_module_id)
            .set("title", input.title.clone())
            .set("overview", input.overview.clone())
            .set("duration_minutes", input.duration_minutes)
            .set("assessment", input.assessment.clone())
            .set("is_published", input.is_published)
            .json("objectives", &input.objectives)?
            .json("materials_needed", &input.materials_needed)?
            .json("procedure", &input.procedure)
    }

    fn update_columns(patch: &LessonPlanUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("title", patch.title.clone())
            .set_some("overview", patch.overview.clone())
            .set_some("duration_minutes", patch.duration_minutes)
            .set_some("assessment", patch.assessment.clone())
            .set_some("is_published", patch.is_published)
            .json_some("objectives", patch.objectives.as_ref())?
            .json_some("materials_needed", patch.materials_needed.as_ref())?
            .json_some("procedure", patch.procedure.as_ref())
    }

    fn references(input: &LessonPlanCreate) -> Vec<Reference> {
        vec![Reference::to::<LearningModule>("learning_module_id", input.learning_module_id)]
    }
}

// ===== Student activities =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentActivity {
    pub id: i64,
    pub learning_module_id: i64,
    pub title: String,
    pub instructions: String,
    pub activity_type: ActivityType,
    pub content: Bag,
    pub points_value: i32,
    pub estimated_minutes: Option<i32>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StudentActivityCreate {
    pub learning_module_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub instructions: String,
    pub activity_type: ActivityType,
    #[serde(default)]
    pub content: Bag,
    #[serde(default = "default_activity_points")]
    #[validate(range(min = 0))]
    pub points_value: i32,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub estimated_minutes: Option<i32>,
    #[serde(default)]
    pub is_published: bool,
}

impl StudentActivityCreate {
    pub fn new(learning_module_id: i64, title: &str, activity_type: ActivityType) -> Self {
        Self {
            learning_module_id,
            title: title.to_string(),
            instructions: String::new(),
            activity_type,
            content: Bag::new(),
            points_value: default_activity_points(),
            estimated_minutes: None,
            is_published: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct StudentActivityUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub instructions: Option<String>,
    pub activity_type: Option<ActivityType>,
    pub content: Option<Bag>,
    #[validate(range(min = 0))]
    pub points_value: Option<i32>,
    #[validate(range(min = 0))]
    pub estimated_minutes: Option<i32>,
    pub is_published: Option<bool>,
}

impl Record for StudentActivity {
    const ENTITY: &'static str = "StudentActivity";
    const TABLE: &'static str = "student_activities";
    const ACTIVE_FLAG: Option<&'static str> = Some("is_published");

    type Create = StudentActivityCreate;
    type Update = StudentActivityUpdate;

    fn id(&self) -> i64 {
        self.id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            learning_module_id: row.get("learning_module_id")?,
            title: row.get("title")?,
            instructions: row.get("instructions")?,
            activity_type: row.get("activity_type")?,
            content: json_column(row, "content")?,
            points_value: row.get("points_value")?,
            estimated_minutes: row.get("estimated_minutes")?,
            is_published: row.get("is_published")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn insert_columns(input: &StudentActivityCreate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set("learning_module_id", input.learning_module_id)
            .set("title", input.title.clone())
            .set("instructions", input.instructions.clone())
            .set("activity_type", input.activity_type)
            .set("points_value", input.points_value)
            .set("estimated_minutes", input.estimated_minutes)
            .set("is_published", input.is_published)
            .json("content", &input.content)
    }

    fn update_columns(patch: &StudentActivityUpdate) -> Result<ColumnSet, StoreError> {
        ColumnSet::new()
            .set_some("title", patch.title.clone())
            .set_some("instructions", patch.instructions.clone())
            .set_some("activity_type", patch.activity_type)
            .set_some("points_value", patch.points_value)
            .set_some("estimated_minutes", patch.estimated_minutes)
            .set_some("is_published", patch.is_published)
            .json_some("content", patch.content.as_ref())
    }

    fn references(input: &StudentActivityCreate) -> Vec<Reference> {
        vec![Reference::to::<LearningModule>("learning_module_id", input.learning_module_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_references_include_optional_teacher() {
        let mut input = LearningModuleCreate::new("Pyramids", 3, GradeLevel::Grade5);
        assert_eq!(LearningModule::references(&input).len(), 1);

        input.teacher_id = Some(9);
        let refs = LearningModule::references(&input);
        assert_eq!(refs[1], Reference::to::<User>("teacher_id", 9));
        assert_eq!(refs[1].table, "users");
    }

    #[test]
    fn test_activity_points_default_from_json() {
        let input: StudentActivityCreate = serde_json::from_value(serde_json::json!({
            "learning_module_id": 1,
            "title": "Build a timeline",
            "activity_type": "project",
        }))
        .unwrap();
        assert_eq!(input.points_value, 10);
        assert!(!input.is_published);
    }

    #[test]
    fn test_negative_display_order_rejected() {
        let mut input = HistoricalPeriodCreate::new("Ancient Egypt", "Nile kingdoms");
        input.display_order = -1;
        assert!(input.validate().is_err());
    }
}
