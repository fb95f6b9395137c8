//! Field-keyed validation errors.
//!
//! Every write path collects failures into a [`ValidationErrors`] map and
//! only touches the store when it comes back empty. The map serializes as
//! `{"field": ["message", ...]}`, with object-level failures under
//! [`NON_FIELD_ERRORS`].

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;

/// Key used for failures that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";
pub const NOT_A_STRING: &str = "Not a valid string.";

/// One field of a client payload.
///
/// Unlike `Option`, this keeps an explicit `null` apart from an omitted key,
/// and a value of the wrong JSON type becomes [`Field::Invalid`] instead of
/// failing the whole body. Input structs mark these `#[serde(default)]`.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Field<T> {
    #[default]
    Absent,
    Null,
    Present(T),
    Invalid,
}

impl<T> Field<T> {
    /// `Some` becomes `Present`, `None` becomes `Null`.
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Field::Null, Field::Present)
    }

    /// Replace an omitted value; anything the client sent is kept.
    pub fn or_else(self, f: impl FnOnce() -> Self) -> Self {
        match self {
            Field::Absent => f(),
            sent => sent,
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Field::Null);
        }
        Ok(serde_json::from_value(value).map_or(Field::Invalid, Field::Present))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a set with a single field error.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Require a non-blank string, recording the standard messages otherwise.
/// Surrounding whitespace is trimmed before checking and storing.
pub fn require_text(errors: &mut ValidationErrors, field: &str, value: Field<String>) -> String {
    let message = match &value {
        Field::Present(v) if !v.trim().is_empty() => return v.trim().to_string(),
        Field::Present(_) => BLANK,
        Field::Absent => REQUIRED,
        Field::Null => NULL,
        Field::Invalid => NOT_A_STRING,
    };
    errors.add(field, message);
    String::new()
}

/// Optional, nullable text. Blank counts as unset.
pub fn optional_text(errors: &mut ValidationErrors, field: &str, value: Field<String>) -> Option<String> {
    match value {
        Field::Present(v) => Some(v.trim().to_string()).filter(|v| !v.is_empty()),
        Field::Absent | Field::Null => None,
        Field::Invalid => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

/// A required typed value; `invalid` is the message for a wrongly typed one.
pub fn require<T>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Field<T>,
    invalid: &str,
) -> Option<T> {
    let message = match value {
        Field::Present(v) => return Some(v),
        Field::Absent => REQUIRED,
        Field::Null => NULL,
        Field::Invalid => invalid,
    };
    errors.add(field, message);
    None
}

/// An optional, nullable typed value.
pub fn optional<T>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Field<T>,
    invalid: &str,
) -> Option<T> {
    match value {
        Field::Present(v) => Some(v),
        Field::Absent | Field::Null => None,
        Field::Invalid => {
            errors.add(field, invalid);
            None
        }
    }
}

/// Enforce a maximum character length on an already-extracted value.
pub fn max_length(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {max} characters."),
        );
    }
}
