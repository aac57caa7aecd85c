//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Resolve the vhost of a request
//! - Run rewrite rules, then hooks
//! - Produce exactly one `RoutingDecision` per request
//!
//! # Design Decisions
//! - Pure and synchronous: no I/O, no hidden state, so the same request against
//!   the same table always yields the same decision (given stateless hooks)
//! - The caller's `RequestContext` is never modified; rules and hooks work on a copy
//! - Explicit errors rather than silent defaults

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use std::net::IpAddr;

use crate::routing::error::RoutingError;
use crate::routing::hooks::{dispatch_hooks, HookOutcome, ResponseSink};
use crate::routing::rewrite::{rewrite_url, RewriteOutcome};
use crate::routing::table::RoutingTable;
use crate::routing::vhost::normalize_host;

/// Appended to the User-Agent of every proxied request.
pub const PROXY_SIGNATURE: &str = "vhost-proxy";

/// Header carrying the client address to the backend.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// The parts of an inbound request that routing looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    /// Host header as received.
    pub original_host: String,
    /// Lowercased Host header without port.
    pub vhost: String,
    pub method: Method,
    /// Request target (path and query).
    pub url: String,
    pub headers: HeaderMap,
    pub client_addr: IpAddr,
}

impl RequestContext {
    /// Build a context, taking the vhost from the Host header in `headers`.
    pub fn new(method: Method, url: impl Into<String>, headers: HeaderMap, client_addr: IpAddr) -> Self {
        let original_host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let vhost = normalize_host(&original_host);

        Self {
            original_host,
            vhost,
            method,
            url: url.into(),
            headers,
            client_addr,
        }
    }
}

/// What to do with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingDecision {
    /// Send a 301 to `url`.
    Redirect { url: String },
    /// Forward to `host:port` with the given URL and headers.
    Proxy {
        host: String,
        port: u16,
        url: String,
        headers: HeaderMap,
    },
    /// A hook answered; `response` is what the hooks wrote.
    Handled { response: ResponseSink },
    /// Answer with an error status.
    Error { status: StatusCode, error: RoutingError },
}

impl RoutingDecision {
    fn error(error: RoutingError) -> Self {
        RoutingDecision::Error {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RoutingDecision::Redirect { .. } => "redirect",
            RoutingDecision::Proxy { .. } => "proxy",
            RoutingDecision::Handled { .. } => "handled",
            RoutingDecision::Error { .. } => "error",
        }
    }
}

impl RoutingTable {
    /// Decide what happens to `request`.
    pub fn route(&self, request: &RequestContext) -> RoutingDecision {
        let mut request = request.clone();

        tracing::debug!(
            vhost = %request.vhost,
            url = %request.url,
            client = %request.client_addr,
            "Request for {}{} from {}",
            request.vhost,
            request.url,
            request.client_addr
        );

        sanitize_url(&mut request);

        let Some(entry) = self.resolve(&request.vhost) else {
            tracing::debug!(vhost = %request.vhost, "No virtual host matched");
            return RoutingDecision::error(RoutingError::VhostNotFound {
                vhost: request.vhost,
            });
        };

        match rewrite_url(entry.rules(), &request.url) {
            RewriteOutcome::Redirect(url) => return RoutingDecision::Redirect { url },
            RewriteOutcome::Continue(url) => request.url = url,
        }

        let original_vhost = request.vhost.clone();
        let mut response = ResponseSink::new();
        let outcome = dispatch_hooks(
            entry.hooks(),
            self.hook_policy(),
            &original_vhost,
            entry.key(),
            &mut request,
            &mut response,
        );

        if outcome == HookOutcome::Handled {
            return RoutingDecision::Handled { response };
        }
        if response.is_written() {
            tracing::debug!(vhost = %entry.key(), "Discarding output of hooks that did not handle the request");
        }

        let Some(port) = entry.backend_port() else {
            tracing::warn!(vhost = %entry.key(), "No backend port configured");
            return RoutingDecision::error(RoutingError::BackendUnresolved {
                vhost: entry.key().to_string(),
            });
        };

        RoutingDecision::Proxy {
            host: entry.backend_host().to_string(),
            port,
            url: request.url,
            headers: forwarding_headers(request.headers, request.client_addr),
        }
    }
}

/// Collapse leading `//`, which some backends answer with 400.
fn sanitize_url(request: &mut RequestContext) {
    if !request.url.starts_with("//") {
        return;
    }
    tracing::warn!(
        client = %request.client_addr,
        url = %format!("http://{}{}", request.vhost, request.url),
        "BOGUS URL requested"
    );
    while request.url.starts_with("//") {
        request.url.remove(0);
    }
}

/// Tag the User-Agent with the proxy signature and set X-Forwarded-For.
fn forwarding_headers(mut headers: HeaderMap, client_addr: IpAddr) -> HeaderMap {
    let agent = match headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        Some(agent) => format!("{}; {}", agent, PROXY_SIGNATURE),
        None => PROXY_SIGNATURE.to_string(),
    };
    let agent = HeaderValue::from_str(&agent).unwrap_or_else(|_| HeaderValue::from_static(PROXY_SIGNATURE));
    headers.insert(header::USER_AGENT, agent);

    if let Ok(client) = HeaderValue::from_str(&client_addr.to_string()) {
        headers.insert(X_FORWARDED_FOR, client);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{HookAction, HookConfig, RuleConfig, VhostConfig};
    use crate::routing::hooks::{HookPolicy, HookRegistry};
    use std::net::Ipv4Addr;

    const CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7));

    fn rule(pattern: &str, target: &str) -> RuleConfig {
        RuleConfig {
            pattern: pattern.to_string(),
            target: target.to_string(),
        }
    }

    fn respond(pattern: &str, body: &str) -> HookConfig {
        HookConfig {
            pattern: pattern.to_string(),
            action: HookAction::Respond {
                status: 200,
                body: body.to_string(),
                content_type: "text/plain".to_string(),
            },
        }
    }

    fn compile(vhosts: Vec<VhostConfig>) -> RoutingTable {
        RoutingTable::compile(&vhosts, HookPolicy::default(), &HookRegistry::new()).unwrap()
    }

    fn request(host: &str, url: &str) -> RequestContext {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        RequestContext::new(Method::GET, url, headers, CLIENT)
    }

    #[test]
    fn test_context_from_headers() {
        let ctx = request("Example.com:8080", "/");
        assert_eq!(ctx.original_host, "Example.com:8080");
        assert_eq!(ctx.vhost, "example.com");

        let ctx = RequestContext::new(Method::GET, "/", HeaderMap::new(), CLIENT);
        assert_eq!(ctx.original_host, "");
        assert_eq!(ctx.vhost, "");
    }

    #[test]
    fn test_proxy_with_rewrite() {
        let mut vhost = VhostConfig::new("example\\.com", None, Some(3000));
        vhost.rules.push(rule("^/old/(.+)$", "/new/$1"));
        let table = compile(vec![vhost]);

        match table.route(&request("example.com", "/old/abc")) {
            RoutingDecision::Proxy { host, port, url, .. } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 3000);
                assert_eq!(url, "/new/abc");
            }
            other => panic!("expected proxy, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_vhost_is_error() {
        let table = compile(vec![VhostConfig::new("example\\.com", None, Some(3000))]);
        let decision = table.route(&request("unknown.org", "/"));
        assert_eq!(
            decision,
            RoutingDecision::Error {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: RoutingError::VhostNotFound {
                    vhost: "unknown.org".to_string()
                },
            }
        );
    }

    #[test]
    fn test_redirect_skips_hooks() {
        let mut vhost = VhostConfig::new("example\\.com", None, Some(3000));
        vhost.rules.push(rule("^/go/(.*)$", "https://elsewhere.example/$1"));
        vhost.hooks.push(respond(".", "hooked"));
        let table = compile(vec![vhost]);

        assert_eq!(
            table.route(&request("example.com", "/go/there")),
            RoutingDecision::Redirect {
                url: "https://elsewhere.example/there".to_string()
            }
        );
    }

    #[test]
    fn test_hook_handles_request() {
        let mut vhost = VhostConfig::new("example\\.com", None, Some(3000));
        vhost.hooks.push(respond("^/ping$", "pong"));
        let table = compile(vec![vhost]);

        match table.route(&request("example.com", "/ping")) {
            RoutingDecision::Handled { response } => assert_eq!(response.body(), b"pong"),
            other => panic!("expected handled, got {:?}", other),
        }
        assert_eq!(table.route(&request("example.com", "/other")).kind(), "proxy");
    }

    #[test]
    fn test_hooks_match_rewritten_url() {
        let mut vhost = VhostConfig::new("example\\.com", None, Some(3000));
        vhost.rules.push(rule("^/a$", "/b"));
        vhost.hooks.push(respond("^/b$", "from b"));
        let table = compile(vec![vhost]);

        assert_eq!(table.route(&request("example.com", "/a")).kind(), "handled");
    }

    #[test]
    fn test_hook_can_redirect_backend_url() {
        let mut vhost = VhostConfig::new("example\\.com", None, Some(3000));
        vhost.hooks.push(HookConfig {
            pattern: "^/legacy".to_string(),
            action: HookAction::SetPath {
                path: "/current".to_string(),
            },
        });
        let table = compile(vec![vhost]);

        match table.route(&request("example.com", "/legacy/x")) {
            RoutingDecision::Proxy { url, .. } => assert_eq!(url, "/current"),
            other => panic!("expected proxy, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_backend_port_is_error_even_after_rewrite() {
        let mut vhost = VhostConfig::new("norules\\.example", Some("10.0.0.1"), None);
        vhost.rules.push(rule("^/a$", "/b"));
        let table = compile(vec![vhost]);

        assert_eq!(
            table.route(&request("norules.example", "/a")),
            RoutingDecision::Error {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: RoutingError::BackendUnresolved {
                    vhost: "norules\\.example".to_string()
                },
            }
        );
    }

    #[test]
    fn test_forwarding_headers_without_user_agent() {
        let table = compile(vec![VhostConfig::new("example\\.com", None, Some(3000))]);
        let mut ctx = request("example.com", "/");
        ctx.headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.9.9.9"));

        match table.route(&ctx) {
            RoutingDecision::Proxy { headers, .. } => {
                assert_eq!(headers[header::USER_AGENT], PROXY_SIGNATURE);
                assert_eq!(headers.get_all(X_FORWARDED_FOR).iter().count(), 1);
                assert_eq!(headers[X_FORWARDED_FOR], "192.0.2.7");
                assert_eq!(headers[header::HOST], "example.com");
            }
            other => panic!("expected proxy, got {:?}", other),
        }
    }

    #[test]
    fn test_forwarding_headers_with_user_agent() {
        let table = compile(vec![VhostConfig::new("example\\.com", None, Some(3000))]);
        let mut ctx = request("example.com", "/");
        ctx.headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        match table.route(&ctx) {
            RoutingDecision::Proxy { headers, .. } => {
                assert_eq!(headers[header::USER_AGENT], "curl/8.0; vhost-proxy");
            }
            other => panic!("expected proxy, got {:?}", other),
        }
    }

    #[test]
    fn test_leading_double_slash_collapsed() {
        let table = compile(vec![VhostConfig::new("example\\.com", None, Some(3000))]);
        match table.route(&request("example.com", "///etc")) {
            RoutingDecision::Proxy { url, .. } => assert_eq!(url, "/etc"),
            other => panic!("expected proxy, got {:?}", other),
        }
    }

    #[test]
    fn test_routing_is_idempotent() {
        let mut vhost = VhostConfig::new("example\\.com", None, Some(3000));
        vhost.rules.push(rule("^/a$", "/b"));
        vhost.rules.push(rule("^/b$", "/c"));
        let table = compile(vec![vhost]);
        let ctx = request("example.com", "/a");

        let first = table.route(&ctx);
        let second = table.route(&ctx);
        assert_eq!(first, second);
        assert_eq!(ctx.url, "/a");
    }

    #[test]
    fn test_resolved_key_passed_to_rules() {
        let mut general = VhostConfig::new(".*\\.example\\.com", None, Some(2));
        general.rules.push(rule("^/$", "/general"));
        let specific = VhostConfig::new("www\\.example\\.com", None, Some(1));
        let table = compile(vec![specific, general]);

        match table.route(&request("WWW.example.com:80", "/")) {
            RoutingDecision::Proxy { port, url, .. } => {
                assert_eq!(port, 2);
                assert_eq!(url, "/general");
            }
            other => panic!("expected proxy, got {:?}", other),
        }
    }
}
