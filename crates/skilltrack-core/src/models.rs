//! The persisted progress document.
//!
//! A [`Document`] is the whole of a user's saved state: one boolean flag
//! per task key, plus a reserved `notes` record. On the wire it is a single
//! flat JSON object:
//!
//! ```json
//! {
//!   "linux_basic_commands": true,
//!   "docker_dockerfile": false,
//!   "notes": { "to_learn": "", "in_progress": "", "completed": "" }
//! }
//! ```
//!
//! Unknown keys are never dropped. Boolean keys that the current catalogue
//! does not know about stay in [`Document::tasks`]; anything else lands in
//! an opaque `extra` bag and is written back untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved top-level key holding the [`Notes`] record.
pub const NOTES_KEY: &str = "notes";

/// Free-text notes kept alongside the checklist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notes {
    #[serde(default)]
    pub to_learn: String,
    #[serde(default)]
    pub in_progress: String,
    #[serde(default)]
    pub completed: String,
    /// Note fields this version does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One of the three named note fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteField {
    ToLearn,
    InProgress,
    Completed,
}

impl NoteField {
    pub const ALL: [NoteField; 3] = [NoteField::ToLearn, NoteField::InProgress, NoteField::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteField::ToLearn => "to_learn",
            NoteField::InProgress => "in_progress",
            NoteField::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }
}

impl Notes {
    pub fn get(&self, field: NoteField) -> &str {
        match field {
            NoteField::ToLearn => &self.to_learn,
            NoteField::InProgress => &self.in_progress,
            NoteField::Completed => &self.completed,
        }
    }

    pub fn set(&mut self, field: NoteField, text: impl Into<String>) {
        let slot = match field {
            NoteField::ToLearn => &mut self.to_learn,
            NoteField::InProgress => &mut self.in_progress,
            NoteField::Completed => &mut self.completed,
        };
        *slot = text.into();
    }

    /// Lenient decode: a `notes` value that is not an object, or has
    /// mistyped fields, yields empty notes rather than an error.
    fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// The full persisted state: task flags, notes, and preserved unknowns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Document {
    /// Completion flag per composite task key (`<subsection>_<task>`).
    pub tasks: BTreeMap<String, bool>,
    pub notes: Notes,
    /// Top-level entries that are neither booleans nor `notes`.
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the task is marked done. Absent keys are not done.
    pub fn is_complete(&self, key: &str) -> bool {
        self.tasks.get(key).copied().unwrap_or(false)
    }

    /// Set a task flag in memory. Persisting is the caller's job.
    pub fn set_complete(&mut self, key: impl Into<String>, done: bool) {
        let key = key.into();
        // A boolean now owns this key; drop any opaque value that shadowed it.
        self.extra.remove(&key);
        self.tasks.insert(key, done);
    }

    /// True when nothing is recorded at all.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.extra.is_empty() && self.notes == Notes::default()
    }

    /// Parse a document from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Compact JSON, as uploaded to remote stores.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Two-space indented JSON, as written to the local file.
    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        let mut out = serde_json::to_vec_pretty(self)?;
        out.push(b'\n');
        Ok(out)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        let mut doc = Document::default();
        for (key, value) in map {
            match value {
                value if key == NOTES_KEY => doc.notes = Notes::from_value(value),
                Value::Bool(done) => {
                    doc.tasks.insert(key, done);
                }
                other => {
                    doc.extra.insert(key, other);
                }
            }
        }
        doc
    }
}

impl From<Document> for Map<String, Value> {
    fn from(doc: Document) -> Self {
        let mut map = doc.extra;
        for (key, done) in doc.tasks {
            map.insert(key, Value::Bool(done));
        }
        let notes = serde_json::to_value(doc.notes).unwrap_or(Value::Null);
        map.insert(NOTES_KEY.to_string(), notes);
        map
    }
}
