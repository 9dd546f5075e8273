//! # pdmvault CLI
//!
//! The binary is intentionally thin: the CLI lives in `src/cli/`, while this file
//! only invokes `cli::run()` and handles process termination.
//!
//! ## Workspace Structure
//!
//! - `crates/pdmvault/`: the vault engine, UI agnostic
//! - `crates/pdmvault-cli/`: this client, depends on the `pdmvault` library
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/pdmvault-cli/src/cli/)                   │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Config loading, logging, dispatch (commands.rs)          │
//! │  - Terminal rendering (render.rs)                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (crates/pdmvault/src/api.rs)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything from `api.rs` inward returns structured values and never touches the
//! terminal. The CLI owns argument parsing, config resolution, the tracing
//! subscriber, rendering and exit codes.
//!
//! ## Testing Approach
//!
//! Rendering helpers carry unit tests; the end-to-end behaviour of the binary is
//! exercised from `tests/` with `assert_cmd` against a temporary vault.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
