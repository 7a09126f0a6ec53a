//! Entity shapes of the history platform
//!
//! Every persisted record comes with a `*Create` and a `*Update` transfer shape and a
//! [`Record`](crate::store::record::Record) impl describing its table.

pub mod analytics;
pub mod ar;
pub mod curriculum;
pub mod enums;
pub mod figures;
pub mod gamification;
pub mod quiz;
pub mod users;
pub mod vocabulary;

pub use analytics::*;
pub use ar::*;
pub use curriculum::*;
pub use enums::*;
pub use figures::*;
pub use gamification::*;
pub use quiz::*;
pub use users::*;
pub use vocabulary::*;

use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_path_to_error::Path;

use crate::error::StoreError;

/// Decode an incoming JSON payload into a transfer shape.
///
/// Malformed input, unknown enum tags and unknown or missing fields all surface as
/// [`StoreError::Validation`] naming the offending field, as a dotted path for nested
/// values.
pub fn decode_payload<T: DeserializeOwned>(entity: &'static str, payload: Value) -> Result<T, StoreError> {
    serde_path_to_error::deserialize(payload).map_err(|e| {
        let message = e.inner().to_string();
        let field = field_path(e.path())
            .or_else(|| named_field(&message))
            .unwrap_or_else(|| "payload".to_string());
        StoreError::validation(entity, field, message)
    })
}

/// `None` for errors raised on the payload object itself.
fn field_path(path: &Path) -> Option<String> {
    path.iter().next().map(|_| path.to_string())
}

/// Missing and unknown fields are reported against the enclosing object; serde names
/// them in backticks.
fn named_field(message: &str) -> Option<String> {
    ["missing field `", "unknown field `"].iter().find_map(|prefix| {
        let rest = &message[message.find(prefix)? + prefix.len()..];
        rest.split('`').next().map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_role_names_the_field() {
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
        match err {
            StoreError::Validation { entity, field, message } => {
                assert_eq!(entity, "User");
                assert_eq!(field, "role");
                assert!(message.contains("wizard"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_and_unknown_fields() {
        let err = decode_payload::<UserCreate>("User", json!({"username": "a", "email": "a@b.co"})).unwrap_err();
        assert_eq!(err.field(), Some("full_name"));

        let err = decode_payload::<UserUpdate>("User", json!({"nickname": "al"})).unwrap_err();
        assert_eq!(err.field(), Some("nickname"));
    }

    #[test]
    fn test_type_mismatch_names_the_field() {
        let err = decode_payload::<TermConnectionCreate>(
            "TermConnection",
            json!({"source_term_id": "one", "target_term_id": 2, "connection_type": "x"}),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
        assert_eq!(err.field(), Some("source_term_id"));
    }

    #[test]
    fn test_unknown_tag_blames_the_enum_field_not_a_lookalike_value() {
        let err = decode_payload::<UserCreate>(
            "User",
            json!({
                "username": "merlin",
                "email": "merlin@camelot.uk",
                "full_name": "wizard",
                "role": "wizard"
            }),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("role"));
    }

    #[test]
    fn test_non_object_payload_is_reported_against_payload() {
        let err = decode_payload::<BadgeCreate>("Badge", json!(["Explorer"])).unwrap_err();
        assert_eq!(err.field(), Some("payload"));
    }

    #[test]
    fn test_valid_payload_decodes() {
        let input: BadgeCreate =
            decode_payload("Badge", json!({"name": "Explorer", "badge_type": "explorer"})).unwrap();
        assert_eq!(input.badge_type, BadgeType::Explorer);
        assert_eq!(input.points_value, 50);
    }
}
