//! The lookup façade and the service object that owns the pipeline.
//!
//! Renderers call [`ProxyColorService::resolve_color`] (or
//! [`ProxyColorService::request_color`] for a handle to await later). A cache
//! hit answers immediately; a miss registers a waiter, queues a lookup, and
//! waits at most `lookup_timeout` for the worker before falling back to an
//! unstyled name.

use crate::cache::{CacheStats, MemberInfo};
use crate::config::{ColorMode, LookupConfig, Settings};
use crate::error::ServiceError;
use crate::host::{AccountColors, Message, MessageStore};
use crate::identity::{AuthorKey, MemberKey, MessageRef, derive_author_key};
use crate::lookup::{FetchWorker, LookupRequest, Pipeline, WorkerState, run_sweeper};
use crate::remote::{PluralKitClient, RemoteLookup};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Label shown instead of the host's bot tag on proxied messages.
pub const PROXY_TAG: &str = "PK";

/// Outcome of asking for a message's color without waiting.
#[derive(Debug)]
pub enum ColorLookup {
    /// Colors are off or the message is not proxied; render it as is.
    Passthrough,
    Ready(String),
    Pending(PendingColor),
}

impl ColorLookup {
    /// Waits for a pending color. `None` means render without a color.
    pub async fn wait(self) -> Option<String> {
        match self {
            ColorLookup::Passthrough => None,
            ColorLookup::Ready(color) => Some(color),
            ColorLookup::Pending(pending) => pending.wait().await,
        }
    }
}

/// A queued lookup the caller can await.
#[derive(Debug)]
pub struct PendingColor {
    key: AuthorKey,
    rx: oneshot::Receiver<String>,
    timeout: Duration,
}

impl PendingColor {
    pub fn key(&self) -> &AuthorKey {
        &self.key
    }

    pub async fn wait(self) -> Option<String> {
        match tokio::time::timeout(self.timeout, self.rx).await {
            Ok(Ok(color)) => Some(color),
            Ok(Err(_)) => None,
            Err(_) => {
                log::debug!(
                    "lookup: no color for {} after {:?}, rendering unstyled",
                    self.key,
                    self.timeout
                );
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceStats {
    pub cache: CacheStats,
    pub queued: usize,
    pub waiting_authors: usize,
    pub worker: WorkerState,
}

/// Background tasks of a started service.
pub struct ServiceHandle {
    cancel: CancellationToken,
    worker: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl ServiceHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops the worker and the sweeper and waits for both to exit.
    /// Queued lookups are abandoned.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        self.cancel.cancel();
        self.worker.await?;
        self.sweeper.await?;
        Ok(())
    }
}

/// Owns the cache, queue, and settings, and hands out colors.
pub struct ProxyColorService<R: RemoteLookup = PluralKitClient> {
    pipeline: Arc<Pipeline>,
    remote: Arc<R>,
    started: AtomicBool,
}

impl ProxyColorService<PluralKitClient> {
    /// Service backed by the HTTP client described by `config`.
    pub fn connect(
        config: LookupConfig,
        settings: Settings,
        messages: Arc<dyn MessageStore>,
        accounts: Arc<dyn AccountColors>,
        current_user_id: Option<String>,
    ) -> Result<Self, ServiceError> {
        let client = PluralKitClient::new(&config)?;
        Ok(Self::new(
            config,
            settings,
            client,
            messages,
            accounts,
            current_user_id,
        ))
    }
}

impl<R: RemoteLookup> ProxyColorService<R> {
    pub fn new(
        config: LookupConfig,
        settings: Settings,
        remote: R,
        messages: Arc<dyn MessageStore>,
        accounts: Arc<dyn AccountColors>,
        current_user_id: Option<String>,
    ) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new(
                config,
                settings,
                messages,
                accounts,
                current_user_id,
            )),
            remote: Arc::new(remote),
            started: AtomicBool::new(false),
        }
    }

    /// Spawns the fetch worker and the sweeper. Only the first call succeeds;
    /// a stopped service is not restarted.
    pub fn start(&self) -> Result<ServiceHandle, ServiceError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::AlreadyStarted);
        }

        let cancel = CancellationToken::new();
        let worker = FetchWorker::new(self.pipeline.clone(), self.remote.clone(), cancel.clone());
        let worker = tokio::spawn(worker.run());
        let sweeper = tokio::spawn(run_sweeper(self.pipeline.clone(), cancel.clone()));

        Ok(ServiceHandle {
            cancel,
            worker,
            sweeper,
        })
    }

    pub fn settings(&self) -> Settings {
        self.pipeline.settings()
    }

    /// Applies new settings, clearing cached colors first when the color mode
    /// or readability changed. Returns whether the cache was cleared.
    pub fn update_settings(&self, settings: Settings) -> bool {
        self.pipeline.update_settings(settings)
    }

    fn is_proxied(&self, message: &Message) -> bool {
        self.pipeline.messages.is_proxied_message(message)
    }

    /// Cached color for `message`, without queueing anything.
    pub fn cached_color(&self, message: &Message) -> Option<String> {
        if !self.is_proxied(message) {
            return None;
        }
        self.pipeline
            .cache
            .get(&derive_author_key(message))
            .map(|entry| entry.color)
    }

    /// Answers from the cache or queues a lookup and returns a handle to it.
    pub fn request_color(&self, message: &Message) -> ColorLookup {
        if self.settings().color_mode == ColorMode::None || !self.is_proxied(message) {
            return ColorLookup::Passthrough;
        }

        let key = derive_author_key(message);
        if let Some(entry) = self.pipeline.cache.get(&key) {
            return ColorLookup::Ready(entry.color);
        }

        let rx = self.pipeline.waiters.register(key.clone());
        // the worker may have stored the color between the check and the registration
        if let Some(entry) = self.pipeline.cache.get(&key) {
            return ColorLookup::Ready(entry.color);
        }

        self.pipeline
            .queue
            .enqueue(LookupRequest::new(MessageRef::from(message)));

        ColorLookup::Pending(PendingColor {
            key,
            rx,
            timeout: self.pipeline.config.lookup_timeout,
        })
    }

    /// Color to render `message`'s author name with, or `None` for the
    /// host's default rendering.
    pub async fn resolve_color(&self, message: &Message) -> Option<String> {
        self.request_color(message).wait().await
    }

    /// Drops the cached color for `message`'s author in its channel.
    pub fn invalidate(&self, message: &Message) -> bool {
        self.pipeline.cache.invalidate(&derive_author_key(message))
    }

    /// Whether the local user sent `message`, directly or through the proxy.
    pub fn is_own_message(&self, message: &Message) -> bool {
        let own_account = self
            .pipeline
            .current_user_id
            .as_deref()
            .is_some_and(|id| id == message.author.id);

        own_account
            || (self.is_proxied(message)
                && self.pipeline.cache.is_owned(&derive_author_key(message)))
    }

    /// Remote member record last seen for a handle + avatar.
    ///
    /// Ordinary users can share a `MemberKey` with a proxied member; prefer
    /// [`Self::profile_for`] unless the caller already knows the message is
    /// proxied.
    pub fn member_profile(&self, key: &MemberKey) -> Option<MemberInfo> {
        self.pipeline.cache.member_info(key)
    }

    pub fn profile_for(&self, message: &Message) -> Option<MemberInfo> {
        if !self.is_proxied(message) {
            return None;
        }
        self.member_profile(&MemberKey::from(message))
    }

    pub fn tag_label(&self, message: &Message) -> Option<&'static str> {
        (self.settings().enable_tag && self.is_proxied(message)).then_some(PROXY_TAG)
    }

    /// Command that edits `message` through the proxy bot, when edit buttons
    /// are enabled and the message is the local user's own proxied message.
    pub fn edit_command_for(
        &self,
        message: &Message,
        guild_id: &str,
        new_content: &str,
    ) -> Option<String> {
        if !self.settings().enable_buttons || !self.is_proxied(message) {
            return None;
        }
        if !self.pipeline.cache.is_owned(&derive_author_key(message)) {
            return None;
        }
        Some(edit_command(
            guild_id,
            &message.channel_id,
            &message.id,
            new_content,
        ))
    }

    /// Most recent message in `messages` (oldest first) the local user may edit.
    pub fn last_editable_message<'a>(&self, messages: &'a [Message]) -> Option<&'a Message> {
        messages
            .iter()
            .rev()
            .find(|message| self.is_own_message(message))
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            cache: self.pipeline.cache.stats(),
            queued: self.pipeline.queue.len(),
            waiting_authors: self.pipeline.waiters.len(),
            worker: self.pipeline.tracker.snapshot(),
        }
    }
}

/// Proxy bot command that replaces the content of a proxied message.
pub fn edit_command(guild_id: &str, channel_id: &str, message_id: &str, content: &str) -> String {
    format!(
        "pk;e https://discord.com/channels/{}/{}/{} {}",
        guild_id, channel_id, message_id, content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InMemoryHost;
    use crate::host::test_support::proxied;
    use crate::remote::{ProxiedMessage, RemoteError};

    struct NeverCalled;

    impl RemoteLookup for NeverCalled {
        async fn fetch_message(&self, message_id: &str) -> Result<ProxiedMessage, RemoteError> {
            panic!("unexpected remote call for {message_id}");
        }
    }

    fn service(settings: Settings) -> (Arc<InMemoryHost>, ProxyColorService<NeverCalled>) {
        let host = Arc::new(InMemoryHost::new());
        let config = LookupConfig::from_env().with_lookup_timeout(Duration::from_secs(1));
        let service = ProxyColorService::new(
            config,
            settings,
            NeverCalled,
            host.clone(),
            host.clone(),
            Some("U1".to_string()),
        );
        (host, service)
    }

    #[test]
    fn edit_command_format() {
        assert_eq!(
            edit_command("g1", "c1", "m1", "fixed typo"),
            "pk;e https://discord.com/channels/g1/c1/m1 fixed typo"
        );
    }

    #[test]
    fn passthrough_when_disabled_or_not_proxied() {
        let (_, colors_off) = service(Settings {
            color_mode: ColorMode::None,
            ..Settings::default()
        });
        let message = proxied("m1", "c1", "Ash", None);
        assert!(matches!(colors_off.request_color(&message), ColorLookup::Passthrough));

        let (_, colors_on) = service(Settings::default());
        let plain = Message {
            webhook_id: None,
            ..message
        };
        assert!(matches!(colors_on.request_color(&plain), ColorLookup::Passthrough));
        assert_eq!(colors_on.stats().queued, 0);
    }

    #[test]
    fn cache_hit_is_ready_without_queueing() {
        let (_, service) = service(Settings::default());
        let message = proxied("m1", "c1", "Ash", None);
        service
            .pipeline
            .cache
            .put(derive_author_key(&message), "#abcdef");

        match service.request_color(&message) {
            ColorLookup::Ready(color) => assert_eq!(color, "#abcdef"),
            other => panic!("expected a cached color, got {other:?}"),
        }
        assert_eq!(service.stats().queued, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn miss_times_out_to_unstyled() {
        let (_, service) = service(Settings::default());
        let message = proxied("m1", "c1", "Ash", None);

        // not started: nothing will ever answer
        let pending = match service.request_color(&message) {
            ColorLookup::Pending(pending) => pending,
            other => panic!("expected a queued lookup, got {other:?}"),
        };
        assert_eq!(pending.key(), &derive_author_key(&message));
        assert_eq!(pending.wait().await, None);
        assert_eq!(service.stats().queued, 1);
    }

    #[tokio::test]
    async fn cancelling_the_token_stops_background_tasks() {
        let (_, service) = service(Settings::default());
        let handle = service.start().unwrap();

        handle.cancellation_token().cancel();
        handle.shutdown().await.unwrap();
        assert_eq!(service.stats().worker.status, crate::lookup::WorkerStatus::Stopped);
    }

    #[test]
    fn invalidate_drops_one_author() {
        let (_, service) = service(Settings::default());
        let ash = proxied("m1", "c1", "Ash", None);
        let birch = proxied("m2", "c1", "Birch", None);
        service.pipeline.cache.put(derive_author_key(&ash), "#abcdef");
        service.pipeline.cache.put(derive_author_key(&birch), "#123456");

        assert!(service.invalidate(&ash));
        assert!(!service.invalidate(&ash));
        assert_eq!(service.cached_color(&ash), None);
        assert_eq!(service.cached_color(&birch).as_deref(), Some("#123456"));
    }

    #[tokio::test]
    async fn start_only_once() {
        let (_, service) = service(Settings::default());
        let handle = service.start().unwrap();
        assert!(matches!(service.start(), Err(ServiceError::AlreadyStarted)));
        handle.shutdown().await.unwrap();
    }

    #[test]
    fn mode_change_clears_cache() {
        let (_, service) = service(Settings::default());
        let message = proxied("m1", "c1", "Ash", None);
        service
            .pipeline
            .cache
            .put(derive_author_key(&message), "#abcdef");

        let tag_only = Settings {
            enable_tag: false,
            ..service.settings()
        };
        assert!(!service.update_settings(tag_only));
        assert!(service.cached_color(&message).is_some());

        let member_mode = Settings {
            color_mode: ColorMode::Member,
            ..service.settings()
        };
        assert!(service.update_settings(member_mode));
        assert!(service.cached_color(&message).is_none());
    }

    #[test]
    fn ownership_and_editing() {
        let (_, service) = service(Settings::default());
        let mine = proxied("m1", "c1", "Ash", None);
        let theirs = proxied("m2", "c1", "Birch", None);
        let direct = Message {
            application_id: None,
            webhook_id: None,
            author: crate::host::Author {
                id: "U1".to_string(),
                username: "me".to_string(),
                avatar: None,
            },
            ..proxied("m3", "c1", "me", None)
        };
        service.pipeline.cache.mark_owned(derive_author_key(&mine));

        assert!(service.is_own_message(&mine));
        assert!(!service.is_own_message(&theirs));
        assert!(service.is_own_message(&direct));

        assert!(service.edit_command_for(&mine, "g1", "hi").is_some());
        assert!(service.edit_command_for(&theirs, "g1", "hi").is_none());
        assert!(service.edit_command_for(&direct, "g1", "hi").is_none());

        let history = vec![direct.clone(), mine.clone(), theirs];
        assert_eq!(service.last_editable_message(&history).unwrap().id, "m1");

        let buttons_off = Settings {
            enable_buttons: false,
            ..service.settings()
        };
        service.update_settings(buttons_off);
        assert!(service.edit_command_for(&mine, "g1", "hi").is_none());
    }

    #[test]
    fn tag_label_follows_setting() {
        let (_, service) = service(Settings::default());
        let message = proxied("m1", "c1", "Ash", None);
        assert_eq!(service.tag_label(&message), Some(PROXY_TAG));

        service.update_settings(Settings {
            enable_tag: false,
            ..service.settings()
        });
        assert_eq!(service.tag_label(&message), None);
    }
}
