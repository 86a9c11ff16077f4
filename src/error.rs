//! Error types for the cache core.
//!
//! ## Key Components
//!
//! - [`InsertError`]: Returned when `insert` does not admit a new entry.
//! - [`ConfigError`]: Returned when user-facing configuration input is
//!   invalid (e.g. an unknown policy name).
//!
//! All failures are values; nothing in the public cache API panics on bad
//! keys or a saturated cache.

use std::fmt;

// ---------------------------------------------------------------------------
// InsertError
// ---------------------------------------------------------------------------

/// Error returned when `insert` refuses a new entry.
///
/// # Example
///
/// ```
/// use pagecache::cache::CacheCore;
/// use pagecache::error::InsertError;
/// use pagecache::policy::lru::LruPolicy;
///
/// let mut cache: CacheCore<u64, &str, LruPolicy> = CacheCore::new(1);
/// cache.insert(1, "a").unwrap();
/// cache.pin(&1);
/// assert_eq!(cache.insert(2, "b"), Err(InsertError::NotAdmitted));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// The key is already resident. The stored value was left untouched
    /// (use `upsert` for overwrite semantics).
    AlreadyResident,
    /// The cache is full and every resident entry is pinned or dirty, so no
    /// victim could be selected.
    NotAdmitted,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::AlreadyResident => f.write_str("key is already resident"),
            InsertError::NotAdmitted => {
                f.write_str("cache is full and no entry is eligible for eviction")
            },
        }
    }
}

impl std::error::Error for InsertError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when configuration input is invalid.
///
/// Produced by fallible parsers such as `PolicyKind::from_str`. Carries a
/// human-readable description of what failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_error_display() {
        assert_eq!(
            InsertError::AlreadyResident.to_string(),
            "key is already resident"
        );
        assert!(InsertError::NotAdmitted.to_string().contains("no entry"));
    }

    #[test]
    fn insert_error_is_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<InsertError>();
        assert_error::<ConfigError>();
    }

    #[test]
    fn config_error_message_accessor() {
        let err = ConfigError::new("unknown policy: mfu");
        assert_eq!(err.message(), "unknown policy: mfu");
        assert_eq!(err.to_string(), "unknown policy: mfu");
    }

    #[test]
    fn config_error_clone_and_eq() {
        let a = ConfigError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }
}
