//! Remote message lookup: the client, its response model, and the seam the
//! fetch worker calls through.

pub mod client;
pub mod error;
pub mod models;

use std::future::Future;

pub use client::PluralKitClient;
pub use error::RemoteError;
pub use models::{PkMember, PkSystem, ProxiedMessage};

/// Something that can look a proxied message up by id.
pub trait RemoteLookup: Send + Sync + 'static {
    fn fetch_message(
        &self,
        message_id: &str,
    ) -> impl Future<Output = Result<ProxiedMessage, RemoteError>> + Send;
}
