//! Virtual host resolution.
//!
//! # Responsibilities
//! - Normalize the Host header (lowercase, drop `:port`)
//! - Find the table entry whose pattern matches the whole hostname
//!
//! # Design Decisions
//! - Every entry is tested and the LAST match wins, so a later, more general
//!   pattern overrides an earlier specific one
//! - A `:` in first position is not treated as a port separator

use crate::routing::table::{RoutingTable, VhostEntry};

/// Lowercase `host` and strip a trailing `:port`.
pub fn normalize_host(host: &str) -> String {
    let host = host.to_lowercase();
    match host.find(':') {
        Some(idx) if idx > 0 => host[..idx].to_string(),
        _ => host,
    }
}

impl RoutingTable {
    /// Find the entry for an already-normalized hostname.
    pub fn resolve(&self, vhost: &str) -> Option<&VhostEntry> {
        self.entries()
            .iter()
            .filter(|entry| entry.pattern().is_match(vhost))
            .last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::VhostConfig;
    use crate::routing::hooks::{HookPolicy, HookRegistry};

    fn table(vhosts: &[(&str, u16)]) -> RoutingTable {
        let configs: Vec<_> = vhosts
            .iter()
            .map(|(pattern, port)| VhostConfig::new(*pattern, None, Some(*port)))
            .collect();
        RoutingTable::compile(&configs, HookPolicy::default(), &HookRegistry::new()).unwrap()
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("Example.COM"), "example.com");
        assert_eq!(normalize_host("example.com:8080"), "example.com");
        assert_eq!(normalize_host(""), "");
        assert_eq!(normalize_host(":8080"), ":8080");
    }

    #[test]
    fn test_port_suffix_resolves_identically() {
        let table = table(&[("example\\.com", 1)]);
        let with_port = table.resolve(&normalize_host("example.com:8080")).unwrap();
        let without = table.resolve(&normalize_host("example.com")).unwrap();
        assert_eq!(with_port.key(), without.key());
    }

    #[test]
    fn test_last_match_wins() {
        let table = table(&[("www\\.example\\.com", 1), (".*\\.example\\.com", 2)]);
        let entry = table.resolve("www.example.com").unwrap();
        assert_eq!(entry.backend_port(), Some(2));

        let entry = table.resolve("api.example.com").unwrap();
        assert_eq!(entry.backend_port(), Some(2));
    }

    #[test]
    fn test_last_match_wins_regardless_of_specificity() {
        let table = table(&[(".*\\.example\\.com", 2), ("www\\.example\\.com", 1)]);
        assert_eq!(table.resolve("www.example.com").unwrap().backend_port(), Some(1));
        assert_eq!(table.resolve("api.example.com").unwrap().backend_port(), Some(2));
    }

    #[test]
    fn test_no_match() {
        let table = table(&[("example\\.com", 1)]);
        assert!(table.resolve("other.org").is_none());
        assert!(table.resolve("").is_none());
    }
}
