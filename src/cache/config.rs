//! Cache behaviour knobs.
//!
//! Loaded from the `[cache]` table of `edudash.toml` (see `crate::config`).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_KEEP_UNUSED_FOR_SECS: u64 = 60;

/// Whether a new subscription refetches an entry that already holds data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefetchOnMount {
    /// Reuse cached data until it is invalidated.
    #[default]
    Never,
    /// Always refetch, serving cached data while the request is in flight.
    Always,
    /// Refetch when the last successful fetch is older than the given age.
    IfOlderThan(Duration),
}

impl FromStr for RefetchOnMount {
    type Err = String;

    /// Accepts `never`, `always` or an age in whole seconds.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "never" | "false" => Ok(RefetchOnMount::Never),
            "always" | "true" => Ok(RefetchOnMount::Always),
            other => other
                .parse::<u64>()
                .map(|secs| RefetchOnMount::IfOlderThan(Duration::from_secs(secs)))
                .map_err(|_| format!("expected `never`, `always` or seconds, got `{other}`")),
        }
    }
}

impl fmt::Display for RefetchOnMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefetchOnMount::Never => f.write_str("never"),
            RefetchOnMount::Always => f.write_str("always"),
            RefetchOnMount::IfOlderThan(age) => write!(f, "{}", age.as_secs()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry without subscribers is retained before collection.
    pub keep_unused_for: Duration,
    /// Default refetch policy for new subscriptions.
    pub refetch_on_mount: RefetchOnMount,
    /// Abort the in-flight request when its last subscriber goes away.
    /// The response is suppressed either way.
    pub abort_on_unsubscribe: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            keep_unused_for: Duration::from_secs(DEFAULT_KEEP_UNUSED_FOR_SECS),
            refetch_on_mount: RefetchOnMount::Never,
            abort_on_unsubscribe: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.keep_unused_for, Duration::from_secs(60));
        assert_eq!(config.refetch_on_mount, RefetchOnMount::Never);
        assert!(!config.abort_on_unsubscribe);
    }

    #[test]
    fn refetch_policy_parses() {
        assert_eq!("never".parse(), Ok(RefetchOnMount::Never));
        assert_eq!("Always".parse(), Ok(RefetchOnMount::Always));
        assert_eq!(
            "30".parse(),
            Ok(RefetchOnMount::IfOlderThan(Duration::from_secs(30)))
        );
        assert!("sometimes".parse::<RefetchOnMount>().is_err());
    }

    #[test]
    fn refetch_policy_display_round_trips() {
        for policy in [
            RefetchOnMount::Never,
            RefetchOnMount::Always,
            RefetchOnMount::IfOlderThan(Duration::from_secs(90)),
        ] {
            assert_eq!(policy.to_string().parse(), Ok(policy));
        }
    }
}
