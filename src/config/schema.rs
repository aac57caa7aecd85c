//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.
//! Ordered mappings (vhosts, rules, hooks) are TOML arrays of tables so the
//! declaration order survives parsing.

use serde::{Deserialize, Serialize};

use crate::routing::hooks::HookPolicy;

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Addresses to listen on, one listener each.
    pub bind: Vec<String>,

    /// Listen port shared by every bind address.
    pub port: u16,

    /// Whether hooks keep running after one has handled a request.
    pub hook_policy: HookPolicy,

    /// Virtual hosts, in declaration order.
    pub vhosts: Vec<VhostConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: vec!["0.0.0.0".to_string()],
            port: 8080,
            hook_policy: HookPolicy::default(),
            vhosts: Vec::new(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// A virtual host and where its requests go.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VhostConfig {
    /// Hostname pattern, matched against the whole Host header.
    pub pattern: String,

    /// Backend host (default: 127.0.0.1).
    #[serde(default)]
    pub host: Option<String>,

    /// Backend port. Requests are rejected when this is missing.
    #[serde(default)]
    pub port: Option<u16>,

    /// Rewrite rules, applied in order.
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    /// Hooks, invoked in order.
    #[serde(default)]
    pub hooks: Vec<HookConfig>,
}

impl VhostConfig {
    /// A vhost proxying to `host:port` with no rules or hooks.
    pub fn new(pattern: impl Into<String>, host: Option<&str>, port: Option<u16>) -> Self {
        Self {
            pattern: pattern.into(),
            host: host.map(str::to_string),
            port,
            rules: Vec::new(),
            hooks: Vec::new(),
        }
    }
}

/// Rewrite rule: URL pattern and replacement template (`$1..$N`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub target: String,
}

/// Hook: URL pattern and the action to run when it matches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HookConfig {
    pub pattern: String,
    pub action: HookAction,
}

/// Built-in hook actions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HookAction {
    /// Answer the request directly.
    Respond {
        #[serde(default = "default_respond_status")]
        status: u16,
        #[serde(default)]
        body: String,
        #[serde(default = "default_content_type")]
        content_type: String,
    },
    /// Set a request header before forwarding.
    SetHeader { name: String, value: String },
    /// Replace the URL sent to the backend.
    SetPath { path: String },
    /// A hook registered in code under this name.
    Named { name: String },
}

fn default_respond_status() -> u16 {
    200
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
