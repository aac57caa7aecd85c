//! TCP listener setup.
//!
//! # Responsibilities
//! - Bind one listener per configured address, all on the same port
//! - Report which address failed to bind
//!
//! # Design Decisions
//! - Hostnames and bare IPv6 literals are accepted (resolved by the OS)
//! - Binding is all-or-nothing: one failure aborts startup

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind {
        address: String,
        port: u16,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { address, port, source } => {
                write!(f, "Failed to bind {}:{}: {}", address, port, source)
            }
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
        }
    }
}

/// Bind `port` on every address in `addresses`.
pub async fn bind_all(addresses: &[String], port: u16) -> Result<Vec<TcpListener>, ListenerError> {
    let mut listeners = Vec::with_capacity(addresses.len());

    for address in addresses {
        tracing::info!("Binding to {}:{}", address, port);
        let listener = TcpListener::bind((address.as_str(), port))
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.clone(),
                port,
                source,
            })?;

        if let Ok(local_addr) = listener.local_addr() {
            tracing::debug!(address = %local_addr, "Listener bound");
        }
        listeners.push(listener);
    }

    Ok(listeners)
}
