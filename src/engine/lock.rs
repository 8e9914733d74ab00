use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::warn;

pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_poisoned(target, op, "mutex.lock");
            poisoned.into_inner()
        }
    }
}

/// Wait on `condvar` until `condition` is false or `timeout` elapses.
pub(crate) fn condvar_wait_while<'a, T, F>(
    condvar: &Condvar,
    guard: MutexGuard<'a, T>,
    timeout: Duration,
    condition: F,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T>
where
    F: FnMut(&mut T) -> bool,
{
    match condvar.wait_timeout_while(guard, timeout, condition) {
        Ok((guard, _timeout)) => guard,
        Err(poisoned) => {
            warn_poisoned(target, op, "condvar.wait");
            poisoned.into_inner().0
        }
    }
}

fn warn_poisoned(target: &'static str, op: &'static str, lock_kind: &'static str) {
    warn!(
        op,
        target_module = target,
        lock_kind,
        result = "poisoned_recovered",
        hint = "state may be stale after panic in another thread",
        "Recovered from poisoned engine pool lock"
    );
}
