//! # pdmvault Architecture
//!
//! pdmvault is a **versioned vault storage engine** for design documents. A vault is
//! a shared directory tree; every document in it is an *item* with a permanent
//! number, a renameable name, an append-only list of immutable versions and a
//! single-writer lock. The vault may live on a local disk or a network mount; the
//! engine only ever talks to it through the [`store::VaultFs`] capability.
//!
//! This crate is the library. The `pdmvault` binary is one client of it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade, one method per operation                    │
//! │  - Built from an explicit VaultConfig, no globals           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Composes the components below into operations            │
//! │  - Owns write ordering: filesystem first, catalog second    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Components                                                 │
//! │  catalog · versions · locks · view · metadata               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - VaultFs trait: LocalFs (production), MemFs (testing)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No Terminal Assumptions
//!
//! From `api.rs` inward, code takes Rust values, returns `Result<T, VaultError>`,
//! and never prints or exits. Diagnostics go through `tracing`; installing a
//! subscriber is the client's business.
//!
//! ## Concurrency
//!
//! Operations are synchronous and fail fast. Per-item exclusion comes from the
//! lock table; mutations of the root tables are serialized by an advisory lock on
//! `.vault.lock`, and a busy vault yields [`error::VaultError::CatalogBusy`]
//! instead of blocking.
//!
//! ## Module Overview
//!
//! - [`api`]: The facade, entry point for all operations
//! - [`commands`]: Business logic for each operation
//! - [`catalog`]: Item numbers, names, rename history and locations
//! - [`versions`]: Per-item version containers and ledgers
//! - [`locks`]: Checkout table
//! - [`view`]: Directory listings and purge
//! - [`metadata`]: Reading FreeCAD document properties
//! - [`store`]: Storage abstraction and implementations
//! - [`tables`]: Line codec for the root tables
//! - [`model`]: Core data types
//! - [`owner`]: Username to uid resolution
//! - [`config`]: Configuration
//! - [`error`]: Error types

pub mod api;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod locks;
pub mod metadata;
pub mod model;
pub mod owner;
pub mod store;
pub mod tables;
pub mod versions;
pub mod view;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
