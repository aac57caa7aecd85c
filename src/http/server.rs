//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve a listener until shutdown
//! - Dispatch requests to the routing table
//! - Forward proxied requests to the resolved backend
//! - Swap in recompiled routing tables

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri},
    response::Response,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{request_context, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response;
use crate::observability::metrics;
use crate::routing::{RoutingDecision, RoutingTable};

/// Routing table shared by every listener, replaced whole on reload.
pub type SharedTable = Arc<ArcSwap<RoutingTable>>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub table: SharedTable,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the reverse proxy.
///
/// Cheap to clone; clones serve the same routing table.
#[derive(Clone)]
pub struct HttpServer {
    router: Router,
    table: SharedTable,
}

impl HttpServer {
    /// Create a new HTTP server serving `table`.
    pub fn new(table: SharedTable, config: &ProxyConfig) -> Self {
        // No idle connections are kept: every proxied request opens its own.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(HttpConnector::new());

        let state = AppState {
            table: table.clone(),
            client,
        };

        let router = Self::build_router(config, state);
        Self { router, table }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// The table this server routes with.
    pub fn table(&self) -> SharedTable {
        self.table.clone()
    }

    /// Install every table received on `updates` until the sender goes away.
    pub fn watch_updates(&self, mut updates: mpsc::UnboundedReceiver<RoutingTable>) -> JoinHandle<()> {
        let table = self.table.clone();
        tokio::spawn(async move {
            while let Some(next) = updates.recv().await {
                tracing::info!(vhosts = next.len(), "Routing table swapped");
                table.store(Arc::new(next));
            }
        })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Routes the request, then redirects, answers, rejects or forwards it.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let context = request_context(&parts, peer);

    let table = state.table.load_full();
    let label = vhost_label(&table, &context.vhost);
    let decision = table.route(&context);
    metrics::record_decision(decision.kind());

    let response = match decision {
        RoutingDecision::Redirect { url } => {
            tracing::debug!(vhost = %context.vhost, location = %url, "Redirecting");
            response::redirect(&url)
        }
        RoutingDecision::Handled { response: written } => response::handled(written),
        RoutingDecision::Error { status, error } => {
            tracing::warn!(client = %peer, error = %error, "Request not routed");
            response::routing_error(status, &error)
        }
        RoutingDecision::Proxy {
            host,
            port,
            url,
            headers,
        } => {
            let client_connection = parts.headers.get(header::CONNECTION).cloned();
            let target = Target {
                vhost: &context.vhost,
                host: &host,
                port,
            };
            forward(&state, target, parts.method, &url, headers, body, client_connection).await
        }
    };

    metrics::record_request(context.method.as_str(), response.status().as_u16(), &label, start_time);
    response
}

/// Where a proxied request goes.
struct Target<'a> {
    vhost: &'a str,
    host: &'a str,
    port: u16,
}

impl Target<'_> {
    /// Backend URI for `url`, or `None` when `url` is not origin-form.
    ///
    /// The authority always comes from the target, never from `url`.
    fn uri(&self, url: &str) -> Option<Uri> {
        let url = if url.is_empty() { "/" } else { url };
        if !url.starts_with('/') {
            return None;
        }

        let authority = if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        };

        Uri::builder()
            .scheme("http")
            .authority(authority)
            .path_and_query(url)
            .build()
            .ok()
    }
}

/// Metrics label for a request: the matched vhost pattern, never the raw Host header.
fn vhost_label(table: &RoutingTable, vhost: &str) -> String {
    table
        .resolve(vhost)
        .map_or(metrics::UNKNOWN_VHOST, |entry| entry.key())
        .to_string()
}

/// Send the request to the backend and relay its answer.
async fn forward(
    state: &AppState,
    target: Target<'_>,
    method: Method,
    url: &str,
    headers: HeaderMap,
    body: Body,
    client_connection: Option<HeaderValue>,
) -> Response {
    let Some(uri) = target.uri(url) else {
        tracing::error!(vhost = %target.vhost, url = %url, "Rewritten URL is not a valid request target");
        return response::backend_unreachable();
    };

    let mut request = Request::new(body);
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;

    tracing::debug!(vhost = %target.vhost, backend = %format!("{}:{}", target.host, target.port), url = %url, "Proxying request");

    match state.client.request(request).await {
        Ok(backend) => response::relay(backend, client_connection),
        Err(e) => {
            tracing::warn!(
                vhost = %target.vhost,
                host = %target.host,
                port = target.port,
                error = %e,
                "Request for {} failed - back-end server {}:{} unreachable",
                target.vhost,
                target.host,
                target.port
            );
            response::backend_unreachable()
        }
    }
}
