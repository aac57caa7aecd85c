//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → RoutingTable::compile (patterns, hooks)
//!
//! On change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads, validates and compiles
//!     → new table sent to the server
//!     → atomic swap of the shared table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A failed reload keeps the running table

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{HookAction, HookConfig, ProxyConfig, RuleConfig, VhostConfig};
