//! Caching of resolved name colors
//!
//! Colors are keyed by [`AuthorKey`](crate::identity::AuthorKey) and expire
//! after a fixed TTL. Member records fetched alongside a color are keyed by
//! [`MemberKey`](crate::identity::MemberKey) and share the color's lifetime.

mod color_cache;
mod types;

pub use color_cache::ColorCache;
pub use types::{CacheStats, ColorEntry, MemberInfo};
