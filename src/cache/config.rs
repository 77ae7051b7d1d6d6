//! Cache policy applied by the entity services.

use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 500;

/// How long snapshots live and how long a single cache call may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Expiry attached to every snapshot write.
    pub ttl: Duration,
    /// Upper bound for one get/set/delete; an elapsed call counts as a cache error.
    pub operation_timeout: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CachePolicy {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            ttl: settings.ttl,
            operation_timeout: settings.operation_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_one_day() {
        let policy = CachePolicy::default();
        assert_eq!(policy.ttl, Duration::from_secs(86_400));
        assert_eq!(policy.operation_timeout, Duration::from_millis(500));
    }
}
