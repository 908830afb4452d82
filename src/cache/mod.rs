//! Tag-scoped cache.
//!
//! - **Data cache**: memoized content queries keyed by [`DataKey`] and labelled
//!   with [`CacheTag`]s
//! - **Response cache**: rendered public responses keyed by path and query,
//!   labelled with every tag their handler read
//!
//! Entries are dropped by tag or by path through a [`Revalidator`]; the
//! revalidation hooks decide which tags and paths a mutation affects.

mod config;
pub mod deps;
mod events;
mod keys;
mod lock;
mod middleware;
mod planner;
mod registry;
mod revalidator;
mod service;
mod store;

pub use config::CacheConfig;
pub use events::{ContentEvent, MutationKind};
pub use keys::{CacheKey, CacheTag, DataKey, EntityKind, ResponseKey, hash_query};
pub use middleware::{CacheState, response_cache_layer};
pub use planner::{Invalidation, PostLocation, RevalidationPlan};
pub use registry::TagRegistry;
pub use revalidator::{LocalRevalidator, RevalidateError, Revalidator, path_variants};
pub use service::SiteCache;
pub use store::{CachedResponse, DataStore, Lookup, ResponseStore};
