//! Lock acquisition that survives poisoning.
//!
//! Cache state is always safe to read after a panic elsewhere; at worst an entry
//! is stale until the next invalidation or TTL expiry.

use std::sync::{LockResult, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recover<G>(result: LockResult<G>, owner: &'static str, op: &'static str, kind: &str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            target: "safecircle::cache::lock",
            owner,
            op,
            lock_kind = kind,
            "recovered poisoned cache lock"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn read<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), owner, op, "read")
}

pub(crate) fn write<'a, T>(
    lock: &'a RwLock<T>,
    owner: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), owner, op, "write")
}

pub(crate) fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    owner: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    recover(mutex.lock(), owner, op, "mutex")
}
