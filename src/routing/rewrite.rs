//! URL rewriting with capture substitution.
//!
//! # Responsibilities
//! - Apply a vhost's rewrite rules to the request URL, in declaration order
//! - Substitute `$1..$N` placeholders with the rule's capture groups
//! - Turn targets starting with `http` into redirects
//!
//! # Design Decisions
//! - Rules are evaluated once each, never restarted; every rule sees the URL
//!   produced by the rules before it, so rewrites compound
//! - Each placeholder is substituted at its first occurrence only. A template
//!   that repeats `$1` keeps the second `$1` as literal text
//! - A redirect ends rule processing immediately

use crate::routing::matcher::{Captures, Pattern};

/// Prefix that marks a rewrite target as an external redirect.
const REDIRECT_PREFIX: &str = "http";

/// A compiled rewrite rule: path pattern plus replacement template.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Pattern,
    template: String,
}

impl RewriteRule {
    pub fn new(pattern: Pattern, template: impl Into<String>) -> Self {
        Self {
            pattern,
            template: template.into(),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expand the template against `path`, or `None` if the rule doesn't match.
    pub fn apply(&self, path: &str) -> Option<String> {
        self.pattern
            .captures(path)
            .map(|caps| expand_template(&self.template, &caps))
    }
}

/// Replace `$i` with group `i` for every group in the match.
///
/// Groups that did not participate expand to the empty string; placeholders
/// beyond the number of groups are left untouched.
pub fn expand_template(template: &str, caps: &Captures<'_>) -> String {
    let mut expanded = template.to_string();
    for i in 1..caps.len() {
        expanded = expanded.replacen(&format!("${}", i), caps.group(i), 1);
    }
    expanded
}

/// Whether a rewrite target is an absolute URL to redirect to.
pub fn is_redirect(target: &str) -> bool {
    target.starts_with(REDIRECT_PREFIX)
}

/// Result of running all rewrite rules of a vhost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// A rule produced an absolute URL; the client is sent there.
    Redirect(String),
    /// The URL to continue with (unchanged if no rule matched).
    Continue(String),
}

/// Run `rules` over `url` in order.
pub fn rewrite_url(rules: &[RewriteRule], url: &str) -> RewriteOutcome {
    let mut current = url.to_string();

    for rule in rules {
        let Some(target) = rule.apply(&current) else {
            continue;
        };

        if is_redirect(&target) {
            tracing::debug!(rule = %rule.pattern().as_str(), location = %target, "Rewrite produced redirect");
            return RewriteOutcome::Redirect(target);
        }

        tracing::trace!(rule = %rule.pattern().as_str(), from = %current, to = %target, "URL rewritten");
        current = target;
    }

    RewriteOutcome::Continue(current)
}
