//! # CLI Behavior
//!
//! This is **one possible UI client** for the toolbox core, not the application
//! itself. It is the only place that knows about terminal I/O and exit codes.
//!
//! ## Naked Execution
//!
//! Running `toolbox` with no arguments is `toolbox status`.
//!
//! ## Startup
//!
//! Most commands load preferences first, which also runs a pending migration.
//! `migrate` and `restore` are administrative and act on the stores directly
//! without loading preferences, so `migrate` reports what it actually did.
//!
//! ## Output
//!
//! `--output text` (default) prints aligned, styled text; `--output json`
//! prints the underlying data as JSON for scripting.
//!
//! ## Module Structure
//!
//! - `commands`: logging, context setup and dispatch
//! - `handlers`: one function per command
//! - `render`: text and JSON formatting
//! - `setup`: argument parsing via clap
//! - `styles`: terminal styles

mod commands;
mod handlers;
mod render;
pub mod setup;
mod styles;

pub use commands::run;
