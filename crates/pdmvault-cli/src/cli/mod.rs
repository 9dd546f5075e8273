//! # CLI Layer
//!
//! One client of the vault engine. This is the only place that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Parses arguments
//! - Installs a tracing subscriber
//! - Formats output for humans
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: clap derive types in `setup.rs`
//! 2. **Context Setup**: resolve the vault root, user and config files
//! 3. **Dispatch**: call the `Vault` facade
//! 4. **Output Formatting**: `render.rs`
//! 5. **Error Handling**: `anyhow` context, reported by `main`

mod commands;
mod render;
mod setup;

pub use commands::run;
