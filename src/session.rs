//! Session context: the one place the in-memory document lives.
//!
//! A [`Session`] is built once per process (or once per `trk serve`
//! instance) from a catalogue and a [`ProgressStore`], and is the only
//! writer of its document. Every mutation saves immediately and returns the
//! store's notices.
//!
//! Resetting is destructive, so it takes two steps:
//!
//! ```text
//! request_reset() -> token      nothing deleted yet
//! confirm_reset(token)          local file removed, document emptied
//! cancel_reset()                back to normal
//! ```

use std::sync::Arc;

use skilltrack_core::{Catalogue, Document, NoteField, Notes, Progress, ProgressReport};

use crate::error::SessionError;
use crate::location::Location;
use crate::notice::Notice;
use crate::store::ProgressStore;

/// Proof that a reset was requested; required to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken(String);

impl ResetToken {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ResetToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

pub struct Session {
    catalogue: Arc<Catalogue>,
    store: ProgressStore,
    document: Document,
    pending_reset: Option<ResetToken>,
}

impl Session {
    /// Load the document and start a session. Load problems are returned as
    /// notices; the session always opens.
    pub async fn open(catalogue: Arc<Catalogue>, store: ProgressStore) -> (Self, Vec<Notice>) {
        let loaded = store.load().await;
        tracing::debug!(
            source = loaded.source.as_deref().unwrap_or("none"),
            tasks = loaded.document.tasks.len(),
            "session opened"
        );
        let session = Self {
            catalogue,
            store,
            document: loaded.document,
            pending_reset: None,
        };
        (session, loaded.notices)
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn location(&self) -> &Location {
        self.store.location()
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn progress(&self) -> Progress<'_> {
        Progress::new(&self.catalogue, &self.document)
    }

    pub fn ratios(&self) -> ProgressReport {
        self.progress().report()
    }

    pub fn is_complete(&self, key: &str) -> bool {
        self.document.is_complete(key)
    }

    /// Mark a catalogue task done or not done, then save.
    pub async fn set_task_state(&mut self, key: &str, done: bool) -> Result<Vec<Notice>, SessionError> {
        self.set_task_states(&[key], done).await
    }

    /// Set several tasks at once with a single save. Nothing changes if any
    /// key is unknown.
    pub async fn set_task_states(&mut self, keys: &[&str], done: bool) -> Result<Vec<Notice>, SessionError> {
        if let Some(unknown) = keys.iter().find(|k| !self.catalogue.contains_task(k)) {
            return Err(SessionError::UnknownTask(unknown.to_string()));
        }
        for key in keys {
            self.document.set_complete(*key, done);
        }
        Ok(self.save().await)
    }

    pub fn notes(&self) -> &Notes {
        &self.document.notes
    }

    /// Replace all notes, then save.
    pub async fn set_notes(&mut self, notes: Notes) -> Vec<Notice> {
        self.document.notes = notes;
        self.save().await
    }

    /// Replace one note field, then save.
    pub async fn set_note(&mut self, field: NoteField, text: impl Into<String>) -> Vec<Notice> {
        self.document.notes.set(field, text);
        self.save().await
    }

    /// Like [`set_note`](Self::set_note), naming the field as a string.
    pub async fn set_note_named(&mut self, field: &str, text: impl Into<String>) -> Result<Vec<Notice>, SessionError> {
        let field = NoteField::parse(field).ok_or_else(|| SessionError::UnknownNoteField(field.to_string()))?;
        Ok(self.set_note(field, text).await)
    }

    /// Persist the current document.
    pub async fn save(&self) -> Vec<Notice> {
        self.store.save(&self.document).await
    }

    /// First step of a reset. Replaces any earlier pending request.
    pub fn request_reset(&mut self) -> ResetToken {
        let token = ResetToken::generate();
        self.pending_reset = Some(token.clone());
        token
    }

    pub fn reset_pending(&self) -> bool {
        self.pending_reset.is_some()
    }

    pub fn cancel_reset(&mut self) {
        self.pending_reset = None;
    }

    /// Second step of a reset: delete the local file and empty the document.
    ///
    /// Under an S3 location the empty document is also uploaded, so the old
    /// state does not come back on the next load. A read-only HTTP location
    /// cannot be cleared; a notice says so.
    pub async fn confirm_reset(&mut self, token: &ResetToken) -> Result<Vec<Notice>, SessionError> {
        match &self.pending_reset {
            None => return Err(SessionError::ResetNotRequested),
            Some(pending) if pending != token => return Err(SessionError::ResetTokenMismatch),
            Some(_) => {}
        }
        self.pending_reset = None;
        self.document = Document::new();

        let mut notices = self.store.discard_local().await;
        match self.store.location() {
            Location::Local => {}
            Location::Http(url) => notices.push(Notice::info(
                "remote_not_cleared",
                format!("{} is read-only and still holds the previous progress", url),
            )),
            Location::ObjectStore { .. } => {
                notices.extend(self.store.save(&self.document).await);
            }
        }
        tracing::info!(location = %self.store.location(), "progress reset");
        notices.push(Notice::success("reset", "Progress has been reset"));
        Ok(notices)
    }
}
