//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn routing decisions into client responses
//! - Relay backend responses, adjusting the Connection header
//! - Map failures to status codes (500 routing, 503 backend unreachable)
//!
//! # Design Decisions
//! - Backend bodies are streamed, never buffered
//! - A 304 from the backend is answered without a body
//! - Error pages name the vhost, HTML-escaped

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;

use crate::routing::{ResponseSink, RoutingError};

/// 301 to `url`.
pub fn redirect(url: &str) -> Response {
    match HeaderValue::from_str(url) {
        Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            tracing::error!(location = %url, "Redirect target is not a valid header value");
            html(StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect target.".to_string())
        }
    }
}

/// Whatever the hooks wrote.
pub fn handled(sink: ResponseSink) -> Response {
    let mut response = Response::new(Body::from(sink.body().to_vec()));
    *response.status_mut() = sink.status();
    *response.headers_mut() = sink.headers().clone();
    response
}

/// Error page for a request that could not be routed.
pub fn routing_error(status: StatusCode, error: &RoutingError) -> Response {
    html(
        status,
        format!(
            "Error finding host details for virtual host <tt>{}</tt>",
            escape_html(error.vhost())
        ),
    )
}

/// The backend could not be reached.
pub fn backend_unreachable() -> Response {
    html(StatusCode::SERVICE_UNAVAILABLE, "Back-end unreachable.".to_string())
}

/// Relay a backend response to the client.
///
/// `client_connection` is the Connection header the client sent, if any.
pub fn relay(backend: Response<Incoming>, client_connection: Option<HeaderValue>) -> Response {
    let (mut parts, body) = backend.into_parts();

    if parts.headers.contains_key(header::CONNECTION) {
        let value = client_connection.unwrap_or(HeaderValue::from_static("close"));
        parts.headers.insert(header::CONNECTION, value);
    }

    if parts.status == StatusCode::NOT_MODIFIED {
        return Response::from_parts(parts, Body::empty());
    }

    Response::from_parts(parts, Body::new(body))
}

fn html(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
}

/// Escape text for inclusion in an HTML page.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
