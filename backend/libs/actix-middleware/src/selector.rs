//! Route selection for admission stages

use std::collections::HashSet;

/// Canonical form of an operation identifier: trimmed, with a leading `/`
/// and no trailing `/`.
///
/// `api.shop.service.v1.Shop/GetUser/` becomes
/// `/api.shop.service.v1.Shop/GetUser`.
pub fn normalize_operation(operation: &str) -> String {
    let trimmed = operation.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Which operations a stage applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteSelector {
    /// Every operation, including ones not declared at startup
    All,
    /// Exact match against a normalized allow-list
    Only(HashSet<String>),
}

impl RouteSelector {
    pub fn only<I, S>(operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RouteSelector::Only(
            operations
                .into_iter()
                .map(|op| normalize_operation(op.as_ref()))
                .collect(),
        )
    }

    /// `operation` must already be normalized.
    pub fn matches(&self, operation: &str) -> bool {
        match self {
            RouteSelector::All => true,
            RouteSelector::Only(allowed) => allowed.contains(operation),
        }
    }

    pub fn is_universal(&self) -> bool {
        matches!(self, RouteSelector::All)
    }
}
