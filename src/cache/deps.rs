//! Tag collector for response cache registration.
//!
//! Content queries record the tags they read through [`record`]; the response
//! cache middleware wraps each handler in [`with_collector`] and registers the
//! rendered response under everything the handler touched.

use std::cell::RefCell;
use std::collections::HashSet;
use std::future::Future;

use super::keys::CacheTag;

tokio::task_local! {
    static TAGS: RefCell<HashSet<CacheTag>>;
}

/// Record a tag for the current request. No-op outside a collector.
pub fn record(tag: CacheTag) {
    let _ = TAGS.try_with(|tags| {
        tags.borrow_mut().insert(tag);
    });
}

pub fn record_all<I>(tags: I)
where
    I: IntoIterator<Item = CacheTag>,
{
    let _ = TAGS.try_with(|collected| {
        collected.borrow_mut().extend(tags);
    });
}

/// Run `future` with a fresh collector and return its output with the recorded tags.
pub async fn with_collector<F, R>(future: F) -> (R, HashSet<CacheTag>)
where
    F: Future<Output = R>,
{
    TAGS.scope(RefCell::new(HashSet::new()), async move {
        let output = future.await;
        let tags = TAGS
            .try_with(|tags| tags.take())
            .unwrap_or_default();
        (output, tags)
    })
    .await
}
