//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, routing context)
//!     → routing table decides
//!     → server.rs forwards to the backend (proxy decisions only)
//!     → response.rs (redirects, hook output, error pages, relay)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{HttpServer, SharedTable};
