//! Path-triggered hooks.
//!
//! # Responsibilities
//! - Define the `Hook` capability and its outcome
//! - Provide the built-in hooks that can be declared in the config file
//! - Keep a registry of hooks supplied by code, looked up by name
//! - Dispatch the matching hooks of a vhost in declaration order
//!
//! # Design Decisions
//! - Hooks run sequentially on the request's own flow, never concurrently
//! - Under `HookPolicy::RunAllMatching` every matching hook runs even after one
//!   has handled the request; the results are OR-ed together
//! - A hook returning an error is logged and treated as not having handled
//!   the request; the remaining hooks still run

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::routing::error::HookError;
use crate::routing::matcher::Pattern;
use crate::routing::router::RequestContext;

/// What a hook did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    /// The hook answered the request; it must not be proxied.
    Handled,
    /// Carry on with the next hook, then the backend.
    Continue,
}

/// How many matching hooks run once one of them has handled the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPolicy {
    /// Every matching hook runs; the request is handled if any of them handled it.
    #[default]
    RunAllMatching,
    /// Dispatch stops at the first hook that handled the request.
    StopAtFirstHandled,
}

/// A handler invoked for requests whose URL matches its pattern.
pub trait Hook: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Handle a request for `vhost` (the matched table key) that was received as
    /// `original_vhost`. The hook may modify the request, write to `response`,
    /// or both.
    fn handle(
        &self,
        original_vhost: &str,
        vhost: &str,
        request: &mut RequestContext,
        response: &mut ResponseSink,
    ) -> Result<HookOutcome, HookError>;
}

/// Response written by hooks.
///
/// Writes accumulate: a later `write_head` replaces status and merges headers,
/// body writes are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSink {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_head(&mut self, status: StatusCode, headers: HeaderMap) {
        self.status = Some(status);
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn write(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    /// Status to send; 200 if no hook set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether anything has been written at all.
    pub fn is_written(&self) -> bool {
        self.status.is_some() || !self.headers.is_empty() || !self.body.is_empty()
    }
}

/// Answers the request with a fixed response.
#[derive(Debug, Clone)]
pub struct RespondHook {
    status: StatusCode,
    content_type: HeaderValue,
    body: String,
}

impl RespondHook {
    pub fn new(status: StatusCode, content_type: HeaderValue, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }
}

impl Hook for RespondHook {
    fn name(&self) -> &str {
        "respond"
    }

    fn handle(
        &self,
        _original_vhost: &str,
        _vhost: &str,
        _request: &mut RequestContext,
        response: &mut ResponseSink,
    ) -> Result<HookOutcome, HookError> {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::CONTENT_TYPE, self.content_type.clone());
        response.write_head(self.status, headers);
        response.write(self.body.as_bytes());
        Ok(HookOutcome::Handled)
    }
}

/// Sets a header on the request before it is forwarded.
#[derive(Debug, Clone)]
pub struct SetHeaderHook {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeaderHook {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

impl Hook for SetHeaderHook {
    fn name(&self) -> &str {
        "set_header"
    }

    fn handle(
        &self,
        _original_vhost: &str,
        _vhost: &str,
        request: &mut RequestContext,
        _response: &mut ResponseSink,
    ) -> Result<HookOutcome, HookError> {
        request.headers.insert(self.name.clone(), self.value.clone());
        Ok(HookOutcome::Continue)
    }
}

/// Replaces the URL sent to the backend.
#[derive(Debug, Clone)]
pub struct SetPathHook {
    path: String,
}

impl SetPathHook {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Hook for SetPathHook {
    fn name(&self) -> &str {
        "set_path"
    }

    fn handle(
        &self,
        _original_vhost: &str,
        _vhost: &str,
        request: &mut RequestContext,
        _response: &mut ResponseSink,
    ) -> Result<HookOutcome, HookError> {
        request.url = self.path.clone();
        Ok(HookOutcome::Continue)
    }
}

/// Hooks supplied by code, referenced from the config by name.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Arc<dyn Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, hook: Arc<dyn Hook>) {
        self.hooks.insert(name.into(), hook);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Hook>> {
        self.hooks.get(name).cloned()
    }
}

/// A hook bound to the path pattern that triggers it.
#[derive(Debug, Clone)]
pub struct CompiledHook {
    pattern: Pattern,
    hook: Arc<dyn Hook>,
}

impl CompiledHook {
    pub fn new(pattern: Pattern, hook: Arc<dyn Hook>) -> Self {
        Self { pattern, hook }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn hook(&self) -> &Arc<dyn Hook> {
        &self.hook
    }
}

/// Invoke the hooks whose pattern matches the request's current URL.
///
/// Returns `Handled` if at least one hook handled the request.
pub fn dispatch_hooks(
    hooks: &[CompiledHook],
    policy: HookPolicy,
    original_vhost: &str,
    vhost: &str,
    request: &mut RequestContext,
    response: &mut ResponseSink,
) -> HookOutcome {
    let mut handled = false;

    for compiled in hooks {
        if !compiled.pattern.is_match(&request.url) {
            continue;
        }

        let hook = &compiled.hook;
        tracing::debug!(
            hook = %hook.name(),
            pattern = %compiled.pattern.as_str(),
            url = %request.url,
            "Invoking hook"
        );

        match hook.handle(original_vhost, vhost, request, response) {
            Ok(HookOutcome::Handled) => {
                handled = true;
                if policy == HookPolicy::StopAtFirstHandled {
                    break;
                }
            }
            Ok(HookOutcome::Continue) => {}
            Err(e) => {
                tracing::error!(vhost = %vhost, error = %e, "Hook failed");
            }
        }
    }

    if handled {
        HookOutcome::Handled
    } else {
        HookOutcome::Continue
    }
}
