//! Closed tag sets used by enum-typed columns
//!
//! Each enum serializes as its snake_case tag, is stored as TEXT and is re-checked by a
//! `CHECK (... IN (...))` constraint in the migrations.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $field:literal {
            $($variant:ident => $tag:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $tag)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $tag,)+
                }
            }

            pub fn tags() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($name::$variant),)+
                    other => Err(StoreError::validation(
                        stringify!($name),
                        $field,
                        format!("'{}' is not one of {}", other, Self::tags().join(", ")),
                    )),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let tag = value.as_str()?;
                tag.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

closed_enum! {
    /// Role a user plays on the platform.
    UserRole as "role" {
        Student => "student",
        Teacher => "teacher",
        Admin => "admin",
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Student
    }
}

closed_enum! {
    GradeLevel as "grade_level" {
        Grade4 => "grade_4",
        Grade5 => "grade_5",
        Grade6 => "grade_6",
    }
}

closed_enum! {
    DifficultyLevel as "difficulty_level" {
        Easy => "easy",
        Medium => "medium",
        Hard => "hard",
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        DifficultyLevel::Easy
    }
}

closed_enum! {
    /// Kind of file or document attached to a learning module.
    MaterialType as "material_type" {
        LessonPlan => "lesson_plan",
        Presentation => "presentation",
        Text => "text",
        Image => "image",
        ActivitySheet => "activity_sheet",
        Guide => "guide",
    }
}

closed_enum! {
    QuestionType as "question_type" {
        MultipleChoice => "multiple_choice",
        TrueFalse => "true_false",
        FillInTheBlank => "fill_in_the_blank",
    }
}

closed_enum! {
    BadgeType as "badge_type" {
        LevelCompletion => "level_completion",
        Streak => "streak",
        PerfectScore => "perfect_score",
        Explorer => "explorer",
        Historian => "historian",
    }
}

closed_enum! {
    /// Media delivered by an AR experience once its trigger fires.
    ContentType as "content_type" {
        Model3d => "model_3d",
        Animation => "animation",
        Video => "video",
        Audio => "audio",
        Image => "image",
    }
}

closed_enum! {
    RewardType as "reward_type" {
        Points => "points",
        Badge => "badge",
        Certificate => "certificate",
        Unlock => "unlock",
    }
}

closed_enum! {
    ActivityType as "activity_type" {
        Worksheet => "worksheet",
        Game => "game",
        Discussion => "discussion",
        Project => "project",
        RolePlay => "role_play",
    }
}

closed_enum! {
    TriggerType as "trigger_type" {
        Image => "image",
        QrCode => "qr_code",
        Location => "location",
    }
}

closed_enum! {
    /// Target table of the weak `UserProgress.activity_id` reference.
    TrackedActivity as "activity_type" {
        QuizLevel => "quiz_level",
        HistoricalFigure => "historical_figure",
        VocabularyTerm => "vocabulary_term",
        StudentActivity => "student_activity",
        ArExperience => "ar_experience",
        DiaryEntry => "diary_entry",
    }
}

impl TrackedActivity {
    pub fn table(&self) -> &'static str {
        match self {
            TrackedActivity::QuizLevel => "quiz_levels",
            TrackedActivity::HistoricalFigure => "historical_figures",
            TrackedActivity::VocabularyTerm => "vocabulary_terms",
            TrackedActivity::StudentActivity => "student_activities",
            TrackedActivity::ArExperience => "ar_experiences",
            TrackedActivity::DiaryEntry => "diary_entries",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip_through_from_str() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), *role);
        }
        for kind in TrackedActivity::ALL {
            assert_eq!(kind.as_str().parse::<TrackedActivity>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_unknown_role_is_a_validation_error() {
        let err = "wizard".parse::<UserRole>().unwrap_err();
        match err {
            StoreError::Validation { field, message, .. } => {
                assert_eq!(field, "role");
                assert!(message.contains("student, teacher, admin"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_serde_uses_snake_case_tags() {
        let json = serde_json::to_string(&QuestionType::FillInTheBlank).unwrap();
        assert_eq!(json, "\"fill_in_the_blank\"");
        let parsed: ContentType = serde_json::from_str("\"model_3d\"").unwrap();
        assert_eq!(parsed, ContentType::Model3d);
        assert!(serde_json::from_str::<GradeLevel>("\"grade_9\"").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(UserRole::default(), UserRole::Student);
        assert_eq!(DifficultyLevel::default(), DifficultyLevel::Easy);
    }
}
