//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header, method, url, headers, client address)
//!     → vhost.rs (normalize host, last matching vhost wins)
//!     → rewrite.rs (rules in order; `http...` target = redirect)
//!     → hooks.rs (matching hooks in order; any "handled" stops proxying)
//!     → router.rs (backend lookup, forwarding headers)
//!     → Return: Redirect | Proxy | Handled | Error
//!
//! Table Compilation (at startup and on reload):
//!     VhostConfig[]
//!     → table.rs (compile vhost, rule and hook patterns)
//!     → Freeze as immutable RoutingTable
//! ```
//!
//! # Design Decisions
//! - Tables compiled up front, immutable at runtime, swapped whole on reload
//! - No I/O: the decision is a pure function of table and request
//! - Deterministic: same input always yields the same decision

pub mod error;
pub mod hooks;
pub mod matcher;
pub mod rewrite;
pub mod router;
pub mod table;
pub mod vhost;

pub use error::{CompileError, HookError, RoutingError};
pub use hooks::{Hook, HookOutcome, HookPolicy, HookRegistry, ResponseSink};
pub use router::{RequestContext, RoutingDecision, PROXY_SIGNATURE};
pub use table::{RoutingTable, VhostEntry};
