//! # skilltrack
//!
//! A personal learning-progress tracker. A fixed catalogue of tasks (the
//! built-in one covers a DevOps & SRE learning journey) is ticked off over
//! time; progress and free-text notes live in one JSON document.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────────────────────┐
//! │ CLI trk  │──▶│          │   │ ProgressStore              │
//! └──────────┘   │ Session  │──▶│  remote (HTTP GET / S3)    │
//! ┌──────────┐   │          │   │  └─▶ local JSON file       │
//! │ HTTP API │──▶│          │   └────────────────────────────┘
//! └──────────┘   └────┬─────┘
//!                     ▼
//!           skilltrack-core: Document, Catalogue, Progress
//! ```
//!
//! Loading tries the remote first and falls back to the local file; saving
//! always writes the local file and uploads when the remote is S3. Store
//! problems never abort an action. They are returned as [`notice::Notice`]s.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`location`] | Storage location parsing (`""`, `https://…`, `s3://…`) |
//! | [`backend`] | The `Backend` trait and ordered fallback |
//! | [`backend_local`] | Local JSON file |
//! | [`backend_http`] | Read-only HTTP(S) GET |
//! | [`backend_s3`] | S3 GetObject / PutObject with SigV4 |
//! | [`store`] | Load/save policy over the backends |
//! | [`session`] | The single writer of the in-memory document |
//! | [`catalogue`] | Built-in and custom catalogue loading |
//! | [`report`] | Terminal rendering |
//! | [`export`] | JSON export |
//! | [`server`] | HTTP API |
//! | [`notice`] | User-facing notices and reporters |
//! | [`error`] | Store and session error types |

pub mod backend;
pub mod backend_http;
pub mod backend_local;
pub mod backend_s3;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod export;
pub mod location;
pub mod notice;
pub mod report;
pub mod server;
pub mod session;
pub mod store;

pub use skilltrack_core::{Catalogue, Document, NoteField, Notes, Progress, ProgressReport};
