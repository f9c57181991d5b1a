//! # skilltrack core
//!
//! Pure logic for skilltrack: the progress document, the task catalogue,
//! and completion rollups.
//!
//! This crate has no filesystem, network, or runtime dependencies. The
//! `skilltrack` crate layers persistence, the CLI, and the HTTP API on top.

pub mod catalogue;
pub mod models;
pub mod progress;

pub use catalogue::{Catalogue, Section, Subsection, Task, TaskRef};
pub use models::{Document, NoteField, Notes, NOTES_KEY};
pub use progress::{Progress, ProgressReport, SectionReport, SubsectionReport, TaskCounts, TaskReport};
