//! Token name filtering
//!
//! Cheap regex screen applied to candidates before any network call.

use regex::Regex;
use tracing::debug;

use crate::candidate::CandidateToken;
use crate::config::FilterConfig;
use crate::error::{Error, Result};

/// Reason why a token was filtered
#[derive(Debug, Clone, PartialEq)]
pub enum FilterReason {
    /// Token name matches blocked pattern
    BlockedName(String),
    /// Token name doesn't match required pattern
    NamePatternMismatch,
}

impl std::fmt::Display for FilterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterReason::BlockedName(pattern) => {
                write!(f, "name matches blocked pattern: {}", pattern)
            }
            FilterReason::NamePatternMismatch => write!(f, "name doesn't match required patterns"),
        }
    }
}

/// Filter result
#[derive(Debug, Clone, PartialEq)]
pub enum FilterResult {
    Pass,
    Filtered(FilterReason),
}

impl FilterResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, FilterResult::Pass)
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, FilterResult::Filtered(_))
    }
}

pub struct TokenFilter {
    name_patterns: Vec<Regex>,
    blocked_patterns: Vec<Regex>,
}

impl TokenFilter {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        Ok(Self {
            name_patterns: compile(&config.name_patterns)?,
            blocked_patterns: compile(&config.blocked_patterns)?,
        })
    }

    /// A filter that lets everything through
    pub fn permissive() -> Self {
        Self {
            name_patterns: Vec::new(),
            blocked_patterns: Vec::new(),
        }
    }

    pub fn filter(&self, token: &CandidateToken) -> FilterResult {
        // Blocked patterns win over required ones
        for pattern in &self.blocked_patterns {
            if pattern.is_match(&token.name) || pattern.is_match(&token.symbol) {
                debug!(
                    "Token {} ({}) blocked by pattern: {}",
                    token.name, token.symbol, pattern
                );
                return FilterResult::Filtered(FilterReason::BlockedName(pattern.to_string()));
            }
        }

        if !self.name_patterns.is_empty() {
            let matches = self
                .name_patterns
                .iter()
                .any(|p| p.is_match(&token.name) || p.is_match(&token.symbol));

            if !matches {
                debug!(
                    "Token {} ({}) doesn't match required patterns",
                    token.name, token.symbol
                );
                return FilterResult::Filtered(FilterReason::NamePatternMismatch);
            }
        }

        FilterResult::Pass
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::InvalidRegex(e.to_string()))
}
