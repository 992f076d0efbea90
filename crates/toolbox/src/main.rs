//! # Toolbox CLI
//!
//! A terminal client for the toolbox persistence core. The binary is thin: the
//! CLI lives in `src/cli/` and this file only invokes `cli::run()` and turns an
//! error into exit code 1.
//!
//! ## Layering
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/toolbox/src/cli/)                     │
//! │  - clap argument parsing (setup.rs)                      │
//! │  - context wiring + dispatch (commands.rs)               │
//! │  - one function per command (handlers.rs)                │
//! │  - text and JSON output (render.rs, styles.rs)           │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Library (crates/toolboxapp)                             │
//! │  - Toolbox facade, preference manager, migration,        │
//! │    record managers, game state, quota reporting          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything in `toolboxapp` is UI agnostic. The CLI owns argument parsing,
//! logging setup, printing, and exit codes.
//!
//! ## Testing Approach
//!
//! Library behavior is tested in `toolboxapp`. The CLI is covered end to end in
//! `tests/cli_e2e.rs`, running the binary against a temporary `--data` directory.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
