//! End-to-end integrity tests against a migrated SQLite database

use chrono::{Duration, TimeZone, Utc};
use history_academy::schema::decode_payload;
use history_academy::store::Repository;
use history_academy::*;
use serde_json::json;

struct Fixture {
    db: Database,
    period: HistoricalPeriod,
    level: QuizLevel,
    student: User,
}

fn fixture() -> Fixture {
    let db = Database::new_in_memory().unwrap();
    let period = db
        .periods
        .create(&HistoricalPeriodCreate::new("Ancient Egypt", "Pharaohs and pyramids"))
        .unwrap();
    let level = db
        .quiz_levels
        .create(&QuizLevelCreate::new("Level 1: The Nile", period.id, 1))
        .unwrap();
    let student = db
        .users
        .create(&UserCreate::new("cleo", "cleo@example.com", "Cleo Patra"))
        .unwrap();
    Fixture {
        db,
        period,
        level,
        student,
    }
}

fn figure(f: &Fixture) -> HistoricalFigure {
    f.db.figures
        .create(&HistoricalFigureCreate::new("Hatshepsut", f.period.id))
        .unwrap()
}

// ===== Create =====

#[test]
fn test_create_assigns_id_and_timestamps_within_call() {
    let db = Database::new_in_memory().unwrap();
    let before = Utc::now();
    let user = db
        .users
        .create(&UserCreate::new("tut", "tut@example.com", "Tutankhamun"))
        .unwrap();
    let after = Utc::now();

    assert!(user.id > 0);
    assert!(user.created_at >= before && user.created_at <= after);
    assert_eq!(user.created_at, user.updated_at);
    assert!(user.is_active);
    assert_eq!(user.role, UserRole::Student);

    let second = db
        .users
        .create(&UserCreate::new("ramses", "ramses@example.com", "Ramses II"))
        .unwrap();
    assert_ne!(second.id, user.id);
}

#[test]
fn test_read_after_write_is_equal_in_every_field() {
    let f = fixture();
    let mut input = QuizQuestionCreate::new(
        f.level.id,
        "Which river flooded every year?",
        QuestionType::MultipleChoice,
        "The Nile",
    );
    input.options = vec!["The Nile".into(), "The Tigris".into(), "The Indus".into()];
    input.image_url = Some("https://cdn.example.com/nile.png".into());

    let created = f.db.questions.create(&input).unwrap();
    assert_eq!(f.db.questions.get(created.id).unwrap(), created);

    let mut model = ArModelCreate::new(figure(&f).id, "Statue", "https://cdn.example.com/statue.glb");
    model.position_offset.insert("y".into(), 0.125);
    model.interaction_scripts = vec![json!({"on": "tap", "say": "Greetings"}).as_object().unwrap().clone()];
    let created = f.db.ar_models.create(&model).unwrap();
    assert_eq!(f.db.ar_models.get(created.id).unwrap(), created);
}

// ===== Update =====

#[test]
fn test_every_update_strictly_advances_updated_at() {
    let f = fixture();
    let mut last = f.student.updated_at;
    for i in 0..20 {
        let patch = UserUpdate {
            full_name: Some(format!("Cleo {}", i)),
            ..Default::default()
        };
        let updated = f.db.users.update(f.student.id, &patch).unwrap();
        assert!(updated.updated_at > last);
        assert_eq!(updated.created_at, f.student.created_at);
        last = updated.updated_at;
    }
}

#[test]
fn test_empty_update_only_advances_updated_at() {
    let f = fixture();
    let updated = f.db.users.update(f.student.id, &UserUpdate::default()).unwrap();
    assert!(updated.updated_at > f.student.updated_at);

    let mut expected = f.student.clone();
    expected.updated_at = updated.updated_at;
    assert_eq!(updated, expected);
}

#[test]
fn test_update_missing_row_is_not_found() {
    let f = fixture();
    let err = f.db.badges.update(404, &BadgeUpdate::default()).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "Badge", id: 404 }));

    let err = f.db.terms.delete(404).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

// ===== Uniqueness =====

#[test]
fn test_duplicate_username_and_email_rejected() {
    let f = fixture();

    let err = f
        .db
        .users
        .create(&UserCreate::new("cleo", "other@example.com", "Another Cleo"))
        .unwrap_err();
    match err {
        StoreError::UniqueConstraint { entity, field, value } => {
            assert_eq!(entity, "User");
            assert_eq!(field, "username");
            assert_eq!(value, "cleo");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = f
        .db
        .users
        .create(&UserCreate::new("cleo2", "cleo@example.com", "Cleo Two"))
        .unwrap_err();
    assert!(matches!(err, StoreError::UniqueConstraint { ref field, .. } if field == "email"));
    assert_eq!(f.db.users.count().unwrap(), 1);
}

#[test]
fn test_update_may_keep_own_unique_value_but_not_take_another() {
    let f = fixture();
    let other = f
        .db
        .users
        .create(&UserCreate::new("nefertiti", "nef@example.com", "Nefertiti"))
        .unwrap();

    let keep = UserUpdate {
        username: Some("cleo".into()),
        ..Default::default()
    };
    assert!(f.db.users.update(f.student.id, &keep).is_ok());

    let steal = UserUpdate {
        email: Some("nef@example.com".into()),
        ..Default::default()
    };
    let err = f.db.users.update(f.student.id, &steal).unwrap_err();
    assert!(matches!(err, StoreError::UniqueConstraint { .. }));
    assert_eq!(f.db.users.get(other.id).unwrap().email, "nef@example.com");
}

#[test]
fn test_duplicate_term_rejected() {
    let f = fixture();
    f.db.terms
        .create(&VocabularyTermCreate::new("Pharaoh", "Ruler of Egypt"))
        .unwrap();
    let err = f
        .db
        .terms
        .create(&VocabularyTermCreate::new("Pharaoh", "Another definition"))
        .unwrap_err();
    assert!(matches!(err, StoreError::UniqueConstraint { entity: "VocabularyTerm", .. }));

    // Exact match only: a different case is a different term.
    assert!(f
        .db
        .terms
        .create(&VocabularyTermCreate::new("pharaoh", "Lower case"))
        .is_ok());
}

// ===== Foreign keys =====

#[test]
fn test_question_for_missing_level_is_a_foreign_key_error() {
    let f = fixture();
    let input = QuizQuestionCreate::new(9999, "Who?", QuestionType::TrueFalse, "true");
    let err = f.db.questions.create(&input).unwrap_err();
    match err {
        StoreError::ForeignKey {
            entity,
            field,
            target,
            id,
        } => {
            assert_eq!(entity, "QuizQuestion");
            assert_eq!(field, "quiz_level_id");
            assert_eq!(target, "QuizLevel");
            assert_eq!(id, 9999);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(f.db.questions.count().unwrap(), 0);
}

#[test]
fn test_related_periods_must_exist() {
    let f = fixture();
    let mut input = VocabularyTermCreate::new("Hieroglyph", "Picture writing");
    input.related_periods = vec![f.period.id, 77];
    let err = f.db.terms.create(&input).unwrap_err();
    assert!(matches!(err, StoreError::ForeignKey { ref field, id: 77, .. } if field == "related_periods"));

    input.related_periods = vec![f.period.id];
    let term = f.db.terms.create(&input).unwrap();
    assert_eq!(term.related_periods, vec![f.period.id]);
}

#[test]
fn test_patch_references_are_checked() {
    let f = fixture();
    let module = f
        .db
        .modules
        .create(&LearningModuleCreate::new("Pyramids", f.period.id, GradeLevel::Grade5))
        .unwrap();
    let patch = LearningModuleUpdate {
        teacher_id: Some(555),
        ..Default::default()
    };
    let err = f.db.modules.update(module.id, &patch).unwrap_err();
    assert!(matches!(err, StoreError::ForeignKey { target: "User", .. }));
}

// ===== Ranges and enums =====

#[test]
fn test_connection_strength_range() {
    let f = fixture();
    let a = f.db.terms.create(&VocabularyTermCreate::new("Nile", "A river")).unwrap();
    let b = f.db.terms.create(&VocabularyTermCreate::new("Delta", "River mouth")).unwrap();

    for strength in [0, 6] {
        let mut input = TermConnectionCreate::new(a.id, b.id, "flows_into");
        input.strength = strength;
        let err = f.db.term_connections.create(&input).unwrap_err();
        assert!(matches!(err, StoreError::Validation { ref field, .. } if field == "strength"));
    }
    for strength in 1..=5 {
        let mut input = TermConnectionCreate::new(a.id, b.id, "flows_into");
        input.strength = strength;
        assert_eq!(f.db.term_connections.create(&input).unwrap().strength, strength);
    }

    // Self-edges are allowed.
    assert!(f
        .db
        .term_connections
        .create(&TermConnectionCreate::new(a.id, a.id, "synonym"))
        .is_ok());
}

#[test]
fn test_unknown_role_tag_is_a_validation_error() {
    let err = decode_payload::<UserCreate>(
        "User",
        json!({
            "username": "merlin",
            "email": "merlin@example.com",
            "full_name": "Merlin",
            "role": "wizard",
        }),
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::Validation { ref field, .. } if field == "role"));
    assert!(err.is_integrity_violation());
    assert!("wizard".parse::<UserRole>().is_err());
}

#[test]
fn test_negative_score_rejected_on_update() {
    let f = fixture();
    let attempt = f
        .db
        .attempts
        .create(&QuizAttemptCreate {
            user_id: f.student.id,
            quiz_level_id: f.level.id,
            max_score: 100,
        })
        .unwrap();
    assert_eq!(attempt.score, 0);
    assert!(!attempt.is_completed);

    let patch = QuizAttemptUpdate {
        score: Some(-1),
        ..Default::default()
    };
    let err = f.db.attempts.update(attempt.id, &patch).unwrap_err();
    assert_eq!(err.field(), Some("score"));

    let done = QuizAttemptUpdate {
        score: Some(90),
        is_completed: Some(true),
        completed_at: Some(Utc::now()),
        ..Default::default()
    };
    let finished = f.db.attempts.update(attempt.id, &done).unwrap();
    assert_eq!(finished.score, 90);
    assert!(finished.completed_at.is_some());
}

#[test]
fn test_timestamps_beyond_year_9999_are_rejected_before_writing() {
    let f = fixture();
    let far = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();

    let attempt = f
        .db
        .attempts
        .create(&QuizAttemptCreate {
            user_id: f.student.id,
            quiz_level_id: f.level.id,
            max_score: 10,
        })
        .unwrap();
    let patch = QuizAttemptUpdate {
        is_completed: Some(true),
        completed_at: Some(far),
        ..Default::default()
    };
    let err = f.db.attempts.update(attempt.id, &patch).unwrap_err();
    assert!(err.is_integrity_violation());
    assert!(matches!(err, StoreError::Validation { ref field, .. } if field == "completed_at"));
    assert_eq!(f.db.attempts.get(attempt.id).unwrap(), attempt);

    let badge = f
        .db
        .badges
        .create(&BadgeCreate::new("Time Traveller", BadgeType::Explorer))
        .unwrap();
    let mut earned = UserBadgeCreate::new(f.student.id, badge.id);
    earned.earned_at = Some(far);
    let err = f.db.user_badges.create(&earned).unwrap_err();
    assert!(matches!(err, StoreError::Validation { ref field, .. } if field == "earned_at"));
    assert_eq!(f.db.user_badges.count().unwrap(), 0);

    let mut progress = UserProgressCreate::new(f.student.id, "quiz_completed");
    progress.last_activity_at = Some(far);
    let err = f.db.progress.create(&progress).unwrap_err();
    assert_eq!(err.field(), Some("last_activity_at"));
    assert_eq!(f.db.progress.count().unwrap(), 0);
}

// ===== Delete and purge =====

#[test]
fn test_soft_delete_keeps_row_and_clears_flag() {
    let f = fixture();
    let outcome = f.db.users.delete(f.student.id).unwrap();
    let deactivated = match outcome {
        Deletion::Deactivated(user) => user,
        other => panic!("expected soft delete, got {other:?}"),
    };
    assert!(!deactivated.is_active);
    assert!(deactivated.updated_at > f.student.updated_at);
    assert_eq!(f.db.users.count().unwrap(), 1);
    assert_eq!(f.db.users.list().unwrap(), vec![deactivated]);

    let patch = UserUpdate {
        is_active: Some(true),
        ..Default::default()
    };
    assert!(f.db.users.update(f.student.id, &patch).unwrap().is_active);
}

#[test]
fn test_unpublish_lesson_plan() {
    let f = fixture();
    let module = f
        .db
        .modules
        .create(&LearningModuleCreate::new("Daily life", f.period.id, GradeLevel::Grade4))
        .unwrap();
    let mut input = LessonPlanCreate::new(module.id, "Bread and beer", 45);
    input.is_published = true;
    let plan = f.db.lesson_plans.create(&input).unwrap();

    match f.db.lesson_plans.delete(plan.id).unwrap() {
        Deletion::Deactivated(plan) => assert!(!plan.is_published),
        other => panic!("expected soft delete, got {other:?}"),
    }
}

#[test]
fn test_delete_without_flag_removes_row() {
    let f = fixture();
    let a = f.db.terms.create(&VocabularyTermCreate::new("Scribe", "Writer")).unwrap();
    let b = f.db.terms.create(&VocabularyTermCreate::new("Papyrus", "Paper")).unwrap();
    let edge = f
        .db
        .term_connections
        .create(&TermConnectionCreate::new(a.id, b.id, "writes_on"))
        .unwrap();

    assert!(matches!(f.db.term_connections.delete(edge.id).unwrap(), Deletion::Removed(_)));
    assert!(f.db.term_connections.find(edge.id).unwrap().is_none());
}

#[test]
fn test_purge_with_dependents_is_restricted() {
    let f = fixture();
    f.db.questions
        .create(&QuizQuestionCreate::new(f.level.id, "Q?", QuestionType::TrueFalse, "true"))
        .unwrap();

    let err = f.db.quiz_levels.purge(f.level.id).unwrap_err();
    match err {
        StoreError::Restricted { entity, id, dependent } => {
            assert_eq!(entity, "QuizLevel");
            assert_eq!(id, f.level.id);
            assert!(dependent.starts_with("quiz_questions.quiz_level_id"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(f.db.quiz_levels.find(f.level.id).unwrap().is_some());

    let err = f.db.periods.purge(f.period.id).unwrap_err();
    assert!(matches!(err, StoreError::Restricted { .. }));
}

#[test]
fn test_purge_restricted_by_related_periods_list() {
    let f = fixture();
    let bronze = f
        .db
        .periods
        .create(&HistoricalPeriodCreate::new("Bronze Age", "Tin, copper and trade"))
        .unwrap();
    let mut input = VocabularyTermCreate::new("Chariot", "Two-wheeled war cart");
    input.related_periods = vec![f.period.id, bronze.id];
    let term = f.db.terms.create(&input).unwrap();

    let err = f.db.periods.purge(bronze.id).unwrap_err();
    match err {
        StoreError::Restricted { entity, id, dependent } => {
            assert_eq!(entity, "HistoricalPeriod");
            assert_eq!(id, bronze.id);
            assert!(dependent.starts_with("vocabulary_terms.related_periods"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(f.db.periods.find(bronze.id).unwrap().is_some());

    f.db.terms.purge(term.id).unwrap();
    assert_eq!(f.db.periods.purge(bronze.id).unwrap().id, bronze.id);
}

#[test]
fn test_purge_without_dependents_succeeds() {
    let f = fixture();
    let badge = f
        .db
        .badges
        .create(&BadgeCreate::new("Explorer", BadgeType::Explorer))
        .unwrap();
    let earned = f
        .db
        .user_badges
        .create(&UserBadgeCreate::new(f.student.id, badge.id))
        .unwrap();
    assert!(matches!(f.db.badges.purge(badge.id), Err(StoreError::Restricted { .. })));

    assert!(matches!(f.db.user_badges.delete(earned.id).unwrap(), Deletion::Removed(_)));
    let removed = f.db.badges.purge(badge.id).unwrap();
    assert_eq!(removed.id, badge.id);
    assert_eq!(f.db.badges.count().unwrap(), 0);
}

#[test]
fn test_references_to_inactive_rows_are_allowed() {
    let f = fixture();
    f.db.quiz_levels.delete(f.level.id).unwrap();
    assert!(f
        .db
        .questions
        .create(&QuizQuestionCreate::new(f.level.id, "Still?", QuestionType::TrueFalse, "yes"))
        .is_ok());
}

// ===== Listing =====

#[test]
fn test_list_by_parent() {
    let f = fixture();
    let second = f
        .db
        .quiz_levels
        .create(&QuizLevelCreate::new("Level 2", f.period.id, 2))
        .unwrap();
    for i in 0..3 {
        f.db.questions
            .create(&QuizQuestionCreate::new(f.level.id, &format!("Q{}", i), QuestionType::TrueFalse, "true"))
            .unwrap();
    }
    f.db.questions
        .create(&QuizQuestionCreate::new(second.id, "Other", QuestionType::TrueFalse, "false"))
        .unwrap();

    let questions = f.db.questions.list_by("quiz_level_id", f.level.id).unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(f.db.questions.list().unwrap().len(), 4);

    assert!(f.db.questions.list_by("quiz_level_id; DROP TABLE users", 1).is_err());
}

// ===== Transactions =====

#[test]
fn test_transaction_rolls_back_on_error() {
    let f = fixture();
    let result = f.db.with_transaction(|conn| {
        Repository::<Badge>::create_in(conn, &BadgeCreate::new("Streak", BadgeType::Streak))?;
        Repository::<UserBadge>::create_in(conn, &UserBadgeCreate::new(f.student.id, 12345))
    });
    assert!(matches!(result, Err(StoreError::ForeignKey { .. })));
    assert_eq!(f.db.badges.count().unwrap(), 0);

    let earned = f
        .db
        .with_transaction(|conn| {
            let badge = Repository::<Badge>::create_in(conn, &BadgeCreate::new("Streak", BadgeType::Streak))?;
            Repository::<UserBadge>::create_in(conn, &UserBadgeCreate::new(f.student.id, badge.id))
        })
        .unwrap();
    assert_eq!(f.db.user_badges.get(earned.id).unwrap(), earned);
}

// ===== Progress and activity references =====

#[test]
fn test_progress_activity_reference() {
    let f = fixture();
    let fig = figure(&f);
    let entry = f
        .db
        .diary_entries
        .create(&DiaryEntryCreate::new(
            fig.id,
            "Coronation",
            "Today I became pharaoh.",
            Utc::now() - Duration::days(30),
        ))
        .unwrap();

    let mut input = UserProgressCreate::new(f.student.id, "diary_read");
    input.historical_figure_id = Some(fig.id);
    input.activity_type = Some(TrackedActivity::DiaryEntry);
    input.activity_id = Some(entry.id);
    input.completion_percentage = 40.0;
    let progress = f.db.progress.create(&input).unwrap();

    let (kind, id) = progress.activity().unwrap();
    assert!(f.db.resolve_activity(kind, id).unwrap());
    assert!(!f.db.resolve_activity(TrackedActivity::ArExperience, id).unwrap());

    let mut half = UserProgressCreate::new(f.student.id, "diary_read");
    half.activity_id = Some(entry.id);
    assert!(matches!(f.db.progress.create(&half), Err(StoreError::Validation { .. })));

    let mut over = UserProgressCreate::new(f.student.id, "quiz_completed");
    over.completion_percentage = 100.1;
    assert!(matches!(f.db.progress.create(&over), Err(StoreError::Validation { .. })));
}

#[test]
fn test_ar_chain() {
    let f = fixture();
    let fig = figure(&f);
    let trigger = f
        .db
        .ar_triggers
        .create(&ArTriggerCreate::new("Museum plaque", TriggerType::QrCode))
        .unwrap();
    let mut input = ArExperienceCreate::new(trigger.id, "Meet Hatshepsut", ContentType::Model3d);
    input.historical_figure_id = Some(fig.id);
    let experience = f.db.ar_experiences.create(&input).unwrap();
    f.db.ar_interactions
        .create(&ArInteractionCreate::new(experience.id, "quiz"))
        .unwrap();

    assert!(matches!(f.db.ar_triggers.purge(trigger.id), Err(StoreError::Restricted { .. })));
    assert!(matches!(f.db.figures.purge(fig.id), Err(StoreError::Restricted { .. })));
    assert!(matches!(f.db.ar_experiences.purge(experience.id), Err(StoreError::Restricted { .. })));
}

// ===== Persistence =====

#[test]
fn test_reopen_keeps_data_and_schema_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("academy.db");

    let user_id = {
        let db = Database::new(&path).unwrap();
        db.users
            .create(&UserCreate::new("imhotep", "imhotep@example.com", "Imhotep"))
            .unwrap()
            .id
    };

    let db = Database::new(&path).unwrap();
    let stats = db.get_stats().unwrap();
    assert_eq!(stats.schema_version, history_academy::store::migration::latest_version());
    assert_eq!(stats.rows("users"), Some(1));
    assert_eq!(db.users.get(user_id).unwrap().username, "imhotep");
    assert!(db.run_maintenance().unwrap().is_healthy());
}

#[test]
fn test_open_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        db_path: dir.path().join("configured.db"),
        pool_size: 2,
        busy_timeout_ms: 1000,
        in_memory: false,
    };
    let db = Database::open(&config).unwrap();
    assert_eq!(db.schema_version().unwrap(), 3);
    assert!(config.db_path.exists());
}

// ===== Range properties =====

mod ranges {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_badge_rarity_accepted_only_in_range(rarity in -10i32..15) {
            let db = Database::new_in_memory().unwrap();
            let mut input = BadgeCreate::new("Historian", BadgeType::Historian);
            input.rarity_level = rarity;
            let result = db.badges.create(&input);
            if (1..=5).contains(&rarity) {
                prop_assert_eq!(result.unwrap().rarity_level, rarity);
            } else {
                prop_assert!(matches!(result, Err(StoreError::Validation { .. })), "expected validation error");
                prop_assert_eq!(db.badges.count().unwrap(), 0);
            }
        }

        #[test]
        fn test_completion_percentage_bounds(percentage in -50.0f64..150.0) {
            let db = Database::new_in_memory().unwrap();
            let user = db.users.create(&UserCreate::new("scholar", "s@example.com", "Scholar")).unwrap();
            let mut input = UserProgressCreate::new(user.id, "vocab_explored");
            input.completion_percentage = percentage;
            let result = db.progress.create(&input);
            if (0.0..=100.0).contains(&percentage) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(StoreError::Validation { .. })), "expected validation error");
            }
        }
    }
}
