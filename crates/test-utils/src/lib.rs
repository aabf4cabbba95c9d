//! Vetrina test utilities.
//!
//! Helpers for integration testing: draft field builders for each entity
//! type and assertion utilities for JSON content.

use serde_json::{Map, Value as JsonValue};

/// Start an empty draft field map.
pub fn test_fields() -> TestFields {
    TestFields(Map::new())
}

/// Draft fields for a section.
pub fn section_fields(title: &str) -> TestFields {
    test_fields().with_text("title", title)
}

/// Draft fields for a section bullet.
pub fn bullet_fields(text: &str) -> TestFields {
    test_fields().with_text("text", text)
}

/// Draft fields for a project.
pub fn project_fields(title: &str) -> TestFields {
    test_fields().with_text("title", title)
}

/// Draft fields for a project page.
pub fn project_page_fields(title: &str) -> TestFields {
    test_fields().with_text("title", title)
}

/// Draft fields for a social link.
pub fn social_link_fields(platform: &str, url: &str) -> TestFields {
    test_fields()
        .with_text("platform", platform)
        .with_text("url", url)
}

/// Draft fields for a resume asset.
pub fn resume_fields(label: &str, file_url: &str) -> TestFields {
    test_fields()
        .with_text("label", label)
        .with_text("file_url", file_url)
}

/// Draft fields for a key-value settings entry.
pub fn setting_fields(value: JsonValue) -> TestFields {
    test_fields().with("value", value)
}

/// A draft field map builder.
#[derive(Debug, Clone, Default)]
pub struct TestFields(Map<String, JsonValue>);

impl TestFields {
    /// Set a field to an arbitrary JSON value.
    pub fn with(mut self, name: &str, value: JsonValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    /// Set a text field.
    pub fn with_text(self, name: &str, value: &str) -> Self {
        self.with(name, JsonValue::String(value.to_string()))
    }

    /// Set a field to null.
    pub fn with_null(self, name: &str) -> Self {
        self.with(name, JsonValue::Null)
    }

    /// Finish building.
    pub fn build(self) -> Map<String, JsonValue> {
        self.0
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{}', got: {}",
            key,
            value
        );
    }

    /// Assert that a JSON value equals expected.
    pub fn json_eq(actual: &Value, expected: &Value) {
        assert_eq!(
            actual,
            expected,
            "JSON mismatch:\nactual: {}\nexpected: {}",
            serde_json::to_string_pretty(actual).unwrap_or_default(),
            serde_json::to_string_pretty(expected).unwrap_or_default()
        );
    }

    /// Assert that two optional values are structurally equal, treating
    /// an absent value as null.
    pub fn value_eq(actual: Option<&Value>, expected: &Value) {
        let actual = actual.unwrap_or(&Value::Null);
        json_eq(actual, expected);
    }
}
