//! Routing error types.

use thiserror::Error;

/// Failure to turn the vhost configuration into a routing table.
///
/// Any of these aborts startup (or a reload): a pattern that cannot compile
/// must never be silently skipped.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid pattern for virtual host '{vhost}': {source}")]
    VhostPattern {
        vhost: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid rewrite rule '{rule}' for virtual host '{vhost}': {source}")]
    RulePattern {
        vhost: String,
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid hook pattern '{hook}' for virtual host '{vhost}': {source}")]
    HookPattern {
        vhost: String,
        hook: String,
        #[source]
        source: regex::Error,
    },

    #[error("virtual host '{vhost}' references unknown hook '{name}'")]
    UnknownHook { vhost: String, name: String },

    #[error("virtual host '{vhost}' has invalid header '{header}' in a hook")]
    InvalidHeader { vhost: String, header: String },

    #[error("virtual host '{vhost}' has invalid status {status} in a hook")]
    InvalidStatus { vhost: String, status: u16 },
}

/// Per-request routing failure, answered with a 500.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("virtual host not found: {vhost}")]
    VhostNotFound { vhost: String },

    #[error("backend unresolved for vhost: {vhost}")]
    BackendUnresolved { vhost: String },
}

impl RoutingError {
    /// The vhost named in the error, as the client asked for it (or as resolved).
    pub fn vhost(&self) -> &str {
        match self {
            RoutingError::VhostNotFound { vhost } => vhost,
            RoutingError::BackendUnresolved { vhost } => vhost,
        }
    }
}

/// A hook failed while handling a request.
#[derive(Debug, Error)]
#[error("hook '{hook}' failed: {reason}")]
pub struct HookError {
    pub hook: String,
    pub reason: String,
}

impl HookError {
    pub fn new(hook: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            reason: reason.into(),
        }
    }
}
