//! # Warbler Database Crate
//!
//! This crate acts as a high-level, application-specific interface to the
//! PostgreSQL database holding users, the follow graph, messages and likes.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. The rest of the application sees
//!   `core-types` entities and the `DbRepository`/`Session` API.
//! - **Unit of work:** Writes are staged on a `Session` and written in one
//!   transaction on `commit`. Constraint violations surface only then, as
//!   `DbError::Integrity`.
//! - **Asynchronous & Pooled:** All operations are asynchronous over a shared
//!   `PgPool`.
//!
//! ## Public API
//!
//! - `connect`, `run_migrations`, `reset_schema`: pool and schema lifecycle.
//! - `DbRepository`: read queries, authentication, profile updates.
//! - `Session`: staged writes (signup, follow/unfollow, messages, likes).
//! - `DbError` / `IntegrityKind`: the errors returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;
pub mod session;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, reset_schema, run_migrations};
pub use error::{DbError, IntegrityKind};
pub use repository::{DEFAULT_TIMELINE_LIMIT, DbRepository};
pub use session::{Committed, PendingOp, Session};
