use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock the cache state, recovering the guard if a panicking holder poisoned it.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = target,
            result = "poisoned_recovered",
            hint = "cache entries may be stale after a panic while the state was held",
            "Recovered from poisoned cache state lock"
        );
        poisoned.into_inner()
    })
}
