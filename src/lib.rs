//! Virtual-host reverse proxy library.
//!
//! Requests are routed on their Host header: rewrite rules and hooks may
//! redirect, answer or rewrite them before they are forwarded to the backend
//! configured for the vhost.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{RequestContext, RoutingDecision, RoutingTable};
