//! Pattern matching for virtual hosts, rewrite rules and hooks.
//!
//! # Responsibilities
//! - Compile user-supplied pattern syntax once, at table build time
//! - Match hostnames as a whole (anchored, case-insensitive)
//! - Match request paths partially (unanchored, case-sensitive)
//! - Expose capture groups with 1-based indexing
//!
//! # Design Decisions
//! - Patterns are regular expressions; the raw source is kept for dumps and logs
//! - A compiled pattern is never mutated after construction

use regex::{Regex, RegexBuilder};
use std::fmt;

/// A compiled pattern together with the text it was compiled from.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a vhost pattern that must match the entire hostname.
    ///
    /// The key is wrapped in a non-capturing group so alternations such as
    /// `a.com|b.com` stay anchored on both ends.
    pub fn vhost(key: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(&format!("^(?:{})$", key))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            source: key.to_string(),
            regex,
        })
    }

    /// Compile a path pattern. Matches may be partial.
    pub fn path(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(pattern)?,
        })
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    /// Run the pattern against `input`, returning the leftmost match.
    pub fn captures<'t>(&self, input: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(input).map(Captures)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

/// Capture groups of a successful match.
///
/// Index 0 is the whole match, groups are numbered from 1.
#[derive(Debug)]
pub struct Captures<'t>(regex::Captures<'t>);

impl<'t> Captures<'t> {
    /// Number of entries in the match array, whole match included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    /// Text of group `i`, or the empty string if the group did not participate.
    pub fn group(&self, i: usize) -> &'t str {
        self.0.get(i).map(|m| m.as_str()).unwrap_or("")
    }
}
