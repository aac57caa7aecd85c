//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! config.bind × port
//!     → listener.rs (one TcpListener per address)
//!     → Hand off to HTTP layer
//! ```

pub mod listener;
