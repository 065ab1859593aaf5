//! The todo entity, its identifier, and the input shapes the store accepts.
//!
//! # Design
//! Field constraints live in plain functions run before every write rather
//! than in a declarative schema. Both input shapes are cast from a JSON
//! object body field by field, so a missing title or a `completed` that is
//! not a boolean is reported as a field violation, not as a decode failure.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use rand::Rng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

pub const TITLE_REQUIRED: &str = "Please add a title";
pub const TITLE_TOO_LONG: &str = "Title cannot be more than 100 characters";
pub const DESCRIPTION_TOO_LONG: &str = "Description cannot be more than 500 characters";
pub const TITLE_NOT_TEXT: &str = "Title must be a string";
pub const DESCRIPTION_NOT_TEXT: &str = "Description must be a string";
pub const COMPLETED_NOT_BOOLEAN: &str = "Completed must be true or false";

const OBJECT_ID_BYTES: usize = 12;
const COUNTER_MASK: u32 = 0x00ff_ffff;

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// Store-generated todo identifier.
///
/// Twelve bytes: a big-endian seconds timestamp, five bytes fixed per
/// process, and a 24-bit counter. The text form is exactly 24 hex digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_BYTES]);

impl ObjectId {
    /// Generate a fresh identifier. Ids from one process never repeat until
    /// the 24-bit counter wraps within a single second.
    pub fn generate() -> Self {
        static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
        static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

        let unique = PROCESS_UNIQUE.get_or_init(|| {
            let mut bytes = [0u8; 5];
            rand::rng().fill(&mut bytes);
            bytes
        });
        let counter = COUNTER.get_or_init(|| AtomicU32::new(rand::random::<u32>()));
        let count = counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
        let seconds = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);

        let mut bytes = [0u8; OBJECT_ID_BYTES];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; OBJECT_ID_BYTES]) -> Self {
        Self(bytes)
    }

    /// Seconds since the Unix epoch embedded in the identifier.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

/// A string that is not 24 hexadecimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid object id: {0:?}")]
pub struct InvalidObjectId(pub String);

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != OBJECT_ID_BYTES * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidObjectId(s.to_string()));
        }
        let mut bytes = [0u8; OBJECT_ID_BYTES];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| InvalidObjectId(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current time at the millisecond precision the stores persist.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Timestamp for a mutation of a record last touched at `previous`.
/// Always at least one millisecond later, even under a coarse clock.
pub fn next_update_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    now().max(previous + TimeDelta::milliseconds(1))
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A persisted todo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: ObjectId,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Re-run every field constraint against this record.
    pub fn check(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        check_title(Some(self.title.as_str()), &mut errors);
        check_description(&self.description, &mut errors);
        errors.into_result(())
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// One or more violated field constraints, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", list_fields(.fields))]
pub struct ValidationError {
    fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = Self::default();
        error.add(field, message);
        error
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(field.into(), message.into());
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }

    pub fn message(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn list_fields(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Returns the trimmed title when it is acceptable.
fn check_title(title: Option<&str>, errors: &mut ValidationError) -> Option<String> {
    let trimmed = title.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.add("title", TITLE_REQUIRED);
        None
    } else if trimmed.chars().count() > TITLE_MAX_CHARS {
        errors.add("title", TITLE_TOO_LONG);
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn check_description(description: &str, errors: &mut ValidationError) {
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.add("description", DESCRIPTION_TOO_LONG);
    }
}

// ---------------------------------------------------------------------------
// Input shapes
// ---------------------------------------------------------------------------

/// A request body that decoded as a JSON object.
pub type Body = Map<String, Value>;

/// Look up `field` in `body`: `None` when absent, `Some(None)` when `null`.
/// A value of the wrong JSON type is recorded against the field.
fn cast<'a, T>(
    body: &'a Body,
    field: &str,
    as_type: impl Fn(&'a Value) -> Option<T>,
    message: &str,
    errors: &mut ValidationError,
) -> Option<Option<T>> {
    match body.get(field)? {
        Value::Null => Some(None),
        value => {
            let cast = as_type(value);
            if cast.is_none() {
                errors.add(field, message);
            }
            cast.map(Some)
        }
    }
}

/// Payload for creating a todo.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl NewTodo {
    /// Cast the recognised fields of `body`. Unknown fields are ignored and
    /// `null` counts as absent.
    pub fn from_body(body: &Body) -> Result<Self, ValidationError> {
        let patch = TodoPatch::from_body(body)?;
        Ok(Self {
            title: patch.title.flatten(),
            description: patch.description.flatten(),
            completed: patch.completed.flatten(),
        })
    }

    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Check every field, reporting all violations at once.
    pub fn validate(self) -> Result<TodoFields, ValidationError> {
        let mut errors = ValidationError::default();
        let title = check_title(self.title.as_deref(), &mut errors);
        let description = self.description.unwrap_or_default();
        check_description(&description, &mut errors);

        match title {
            Some(title) if errors.is_empty() => Ok(TodoFields {
                title,
                description,
                completed: self.completed.unwrap_or(false),
            }),
            _ => Err(errors),
        }
    }
}

/// Fields of a new todo after validation and defaulting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoFields {
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl TodoFields {
    pub fn into_todo(self, id: ObjectId, at: DateTime<Utc>) -> Todo {
        Todo {
            id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            created_at: at,
            updated_at: at,
        }
    }
}

/// Partial update. The outer `Option` records whether the field was sent at
/// all; the inner one whether it was sent as `null`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub completed: Option<Option<bool>>,
}

impl TodoPatch {
    /// Cast the recognised fields of `body`; unknown fields are ignored.
    pub fn from_body(body: &Body) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        let text = |value: &Value| value.as_str().map(str::to_string);
        let patch = Self {
            title: cast(body, "title", text, TITLE_NOT_TEXT, &mut errors),
            description: cast(body, "description", text, DESCRIPTION_NOT_TEXT, &mut errors),
            completed: cast(body, "completed", Value::as_bool, COMPLETED_NOT_BOOLEAN, &mut errors),
        };
        errors.into_result(patch)
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Some(title.into()));
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(Some(completed));
        self
    }

    /// Check the provided fields. `null` clears a field to its default,
    /// which for the required title is a violation.
    pub fn validate(self) -> Result<TodoChanges, ValidationError> {
        let mut errors = ValidationError::default();

        let title = match self.title {
            Some(value) => check_title(value.as_deref(), &mut errors),
            None => None,
        };
        let description = self.description.map(|value| {
            let description = value.unwrap_or_default();
            check_description(&description, &mut errors);
            description
        });
        let completed = self.completed.map(|value| value.unwrap_or(false));

        errors.into_result(TodoChanges {
            title,
            description,
            completed,
        })
    }
}

/// Validated partial update; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TodoChanges {
    pub fn apply(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(description) = self.description {
            todo.description = description;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
    }
}
