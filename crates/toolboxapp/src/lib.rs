//! # toolboxapp
//!
//! Local persistence core for a collection of small utilities: user
//! preferences, generated identity profiles, curated academic resources and
//! per-game state, kept in two stores that outlive the process.
//!
//! ## Architecture
//!
//! ```text
//! UI (CLI, ...) ──> api::Toolbox ──> prefs::PreferenceManager ──┐
//!                        │           records::* managers         │
//!                        │           games::GameStore            │
//!                        ▼                                       ▼
//!                 store::kv::KvStore (envelopes, lazy init)   FlatStore
//!                        │                                       │
//!                 StructuredBackend (fs | mem)            flat.json | mem
//! ```
//!
//! - The **structured store** is primary: named collections of envelopes.
//! - The **flat-key store** is the legacy format. [`migration`] moves its
//!   contents forward once; afterwards it only carries the preferences mirror
//!   and game state.
//! - [`prefs`] keeps the preferences record behind a pure reducer and persists
//!   it through an observer, so load failures degrade instead of crashing.
//! - [`quota`] reports usage of both stores and decides when to warn.
//!
//! All types are single-threaded (`Rc`, `RefCell`); a UI owns one [`api::Toolbox`].

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod games;
pub mod init;
pub mod migration;
pub mod model;
pub mod prefs;
pub mod quota;
pub mod records;
pub mod store;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use api::Toolbox;
pub use error::{Result, ToolboxError};
