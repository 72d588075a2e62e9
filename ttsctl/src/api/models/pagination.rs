//! Offset pagination shared by list endpoints.

use serde::Deserialize;
use utoipa::IntoParams;

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 20;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// `skip`/`limit` query parameters.
///
/// The `limit` is clamped to `1..=MAX_LIMIT`, so neither an empty page nor an
/// unbounded scan can be requested.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct Pagination {
    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    pub skip: Option<i64>,

    /// Maximum number of items to return (default: 20, max: 100)
    #[param(default = 20, minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Get both skip and limit as a tuple, useful for destructuring.
    #[inline]
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        assert_eq!(Pagination::default().params(), (0, DEFAULT_LIMIT));
        let p = Pagination {
            skip: Some(-5),
            limit: Some(1000),
        };
        assert_eq!(p.params(), (0, MAX_LIMIT));
        let p = Pagination {
            skip: Some(40),
            limit: Some(0),
        };
        assert_eq!(p.params(), (40, 1));
    }
}
