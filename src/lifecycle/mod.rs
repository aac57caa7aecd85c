//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → wait_for_shutdown_signal resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every listener stops accepting → in-flight requests drain → exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then routing table, then listeners
//! - Any startup error is fatal

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
