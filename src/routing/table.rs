//! Compiled routing table.
//!
//! # Responsibilities
//! - Compile vhost, rewrite and hook patterns from the configuration
//! - Bind hook actions to `Hook` implementations
//! - Keep vhosts in declaration order
//!
//! # Design Decisions
//! - Compilation is all-or-nothing: the first bad pattern fails the whole table
//! - The table is immutable; reloads build a new one and swap it in

use axum::http::{HeaderName, HeaderValue, StatusCode};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::schema::{HookAction, HookConfig, VhostConfig};
use crate::routing::error::CompileError;
use crate::routing::hooks::{
    CompiledHook, Hook, HookPolicy, HookRegistry, RespondHook, SetHeaderHook, SetPathHook,
};
use crate::routing::matcher::Pattern;
use crate::routing::rewrite::RewriteRule;

/// Backend host used when a vhost names only a port.
pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";

/// One compiled virtual host.
#[derive(Debug, Clone)]
pub struct VhostEntry {
    pattern: Pattern,
    backend_host: String,
    backend_port: Option<u16>,
    rules: Vec<RewriteRule>,
    hooks: Vec<CompiledHook>,
}

impl VhostEntry {
    /// The table key, i.e. the vhost pattern as configured.
    pub fn key(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn backend_host(&self) -> &str {
        &self.backend_host
    }

    pub fn backend_port(&self) -> Option<u16> {
        self.backend_port
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    pub fn hooks(&self) -> &[CompiledHook] {
        &self.hooks
    }
}

/// All virtual hosts, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    entries: Vec<VhostEntry>,
    hook_policy: HookPolicy,
}

impl RoutingTable {
    /// Compile the vhost configuration.
    pub fn compile(
        vhosts: &[VhostConfig],
        hook_policy: HookPolicy,
        registry: &HookRegistry,
    ) -> Result<Self, CompileError> {
        let entries = vhosts
            .iter()
            .map(|vhost| compile_vhost(vhost, registry))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(vhosts = entries.len(), policy = ?hook_policy, "Routing table compiled");

        Ok(Self {
            entries,
            hook_policy,
        })
    }

    pub fn entries(&self) -> &[VhostEntry] {
        &self.entries
    }

    pub fn hook_policy(&self) -> HookPolicy {
        self.hook_policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable listing of every vhost, its rules, hooks and backend.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "http://{}/", entry.key());
            for rule in &entry.rules {
                let _ = writeln!(out, "\tRewriting {} to {}", rule.pattern().as_str(), rule.template());
            }
            for hook in &entry.hooks {
                let _ = writeln!(out, "\tHook {} ({})", hook.pattern().as_str(), hook.hook().name());
            }
            if let Some(port) = entry.backend_port {
                let _ = writeln!(out, "\tproxying to {}:{}", entry.backend_host, port);
            }
        }
        out
    }
}

fn compile_vhost(vhost: &VhostConfig, registry: &HookRegistry) -> Result<VhostEntry, CompileError> {
    let pattern = Pattern::vhost(&vhost.pattern).map_err(|source| CompileError::VhostPattern {
        vhost: vhost.pattern.clone(),
        source,
    })?;

    let rules = vhost
        .rules
        .iter()
        .map(|rule| {
            Pattern::path(&rule.pattern)
                .map(|p| RewriteRule::new(p, rule.target.clone()))
                .map_err(|source| CompileError::RulePattern {
                    vhost: vhost.pattern.clone(),
                    rule: rule.pattern.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let hooks = vhost
        .hooks
        .iter()
        .map(|hook| compile_hook(&vhost.pattern, hook, registry))
        .collect::<Result<Vec<_>, _>>()?;

    let backend_host = vhost
        .host
        .as_deref()
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_BACKEND_HOST)
        .to_string();

    Ok(VhostEntry {
        pattern,
        backend_host,
        backend_port: vhost.port,
        rules,
        hooks,
    })
}

fn compile_hook(
    vhost: &str,
    config: &HookConfig,
    registry: &HookRegistry,
) -> Result<CompiledHook, CompileError> {
    let pattern = Pattern::path(&config.pattern).map_err(|source| CompileError::HookPattern {
        vhost: vhost.to_string(),
        hook: config.pattern.clone(),
        source,
    })?;

    let invalid_header = |header: &str| CompileError::InvalidHeader {
        vhost: vhost.to_string(),
        header: header.to_string(),
    };

    let hook: Arc<dyn Hook> = match &config.action {
        HookAction::Respond {
            status,
            body,
            content_type,
        } => {
            let status = StatusCode::from_u16(*status).map_err(|_| CompileError::InvalidStatus {
                vhost: vhost.to_string(),
                status: *status,
            })?;
            let content_type =
                HeaderValue::from_str(content_type).map_err(|_| invalid_header("content-type"))?;
            Arc::new(RespondHook::new(status, content_type, body.clone()))
        }
        HookAction::SetHeader { name, value } => {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid_header(name))?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid_header(name))?;
            Arc::new(SetHeaderHook::new(header, value))
        }
        HookAction::SetPath { path } => Arc::new(SetPathHook::new(path.clone())),
        HookAction::Named { name } => registry.get(name).ok_or_else(|| CompileError::UnknownHook {
            vhost: vhost.to_string(),
            name: name.clone(),
        })?,
    };

    Ok(CompiledHook::new(pattern, hook))
}
