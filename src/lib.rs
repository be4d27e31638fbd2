//! Name colors for proxied chat messages.
//!
//! Messages relayed by the proxy bot arrive through a webhook, so the host
//! knows nothing about who really sent them. This crate resolves that from
//! the proxy service's public API, under its request budget, and caches the
//! result so rendering never waits on the network more than once per author.
//!
//! Data flow: renderer → [`identity`] (derive key) → [`cache`] (check) →
//! on a miss [`lookup::FetchQueue`] → [`lookup::FetchWorker`] (rate-limited
//! remote call, store) → waiting caller of [`service::ProxyColorService`].

pub mod cache;
pub mod color;
pub mod config;
pub mod error;
pub mod host;
pub mod identity;
pub mod lookup;
pub mod remote;
pub mod service;

pub use config::{ColorMode, LookupConfig, Settings};
pub use error::ServiceError;
pub use host::{AccountColors, Author, InMemoryHost, Message, MessageStore};
pub use identity::{AuthorKey, MemberKey, MessageRef};
pub use service::{ColorLookup, ProxyColorService, ServiceHandle};
