//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for tracing
//! - Extract the routing-relevant parts of a request
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The request body is never read here; it is streamed to the backend later

use axum::http::{request::Parts, HeaderValue, Request};
use std::net::SocketAddr;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::routing::RequestContext;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates request IDs from random UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Build the routing view of a request from its head and peer address.
pub fn request_context(parts: &Parts, peer: SocketAddr) -> RequestContext {
    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    RequestContext::new(parts.method.clone(), url, parts.headers.clone(), peer.ip())
}
