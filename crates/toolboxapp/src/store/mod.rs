//! # Storage Layer
//!
//! The toolbox persists into two backends with very different shapes:
//!
//! 1. **Structured store**: named collections of [`Envelope`](crate::model::Envelope)
//!    records. This is the primary backend and the migration target.
//! 2. **Flat-key store**: a plain `String -> String` map. This is the legacy
//!    format, the migration source, and the mirror every preferences write is
//!    copied into so a broken structured store can still be recovered from.
//!
//! ## Layering
//!
//! - [`backend::StructuredBackend`] and [`flat::FlatStore`] handle the "how"
//!   (filesystem vs memory). They know nothing about envelopes' meaning,
//!   lazy initialization, or error classification.
//! - [`kv::KvStore`] handles the "what": lazy `init`, envelope stamping,
//!   secondary-index lookups, and mapping backend failures to
//!   `WriteFailed` / `ReadFailed`.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`] / [`fs_backend::FsFlatStore`]: production, JSON
//!   files under the data directory with atomic writes.
//! - [`mem_backend::MemBackend`] / [`mem_backend::MemFlatStore`]: for tests and
//!   ephemeral sessions, with switches to simulate unavailability and write errors.
//!
//! ## Storage Layout
//!
//! ```text
//! <data>/
//! ├── toolbox.toml                 # Optional configuration
//! ├── flat.json                    # Flat-key store
//! └── structured/
//!     ├── schema.json              # Collections + declared indexes
//!     ├── preferences.json         # { key: envelope, ... }
//!     ├── backups.json
//!     └── ...
//! ```

pub mod backend;
pub mod flat;
pub mod fs_backend;
pub mod kv;
pub mod mem_backend;
