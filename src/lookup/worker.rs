use super::{LookupRequest, Pipeline, WorkerStatus};
use crate::color::{self, PLACEHOLDER_COLOR, Rgb};
use crate::config::{ColorMode, Settings};
use crate::host::AccountColors;
use crate::identity::{AuthorKey, resolve_author_key};
use crate::remote::{ProxiedMessage, RemoteLookup};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Drains the fetch queue one request at a time.
///
/// Remote calls are strictly sequential and every call is followed by a pause
/// (`request_interval` after a success, `retry_backoff` after a failure), so
/// two calls are never closer together than `request_interval`. Transient
/// failures are retried after everything else pending; an unknown message
/// gets the placeholder color like any other lookup without one. Requests whose
/// author already has an unexpired color are answered from the cache with no
/// call and no pause.
pub struct FetchWorker<R: RemoteLookup> {
    pipeline: Arc<Pipeline>,
    remote: Arc<R>,
    cancel: CancellationToken,
}

impl<R: RemoteLookup> FetchWorker<R> {
    pub fn new(pipeline: Arc<Pipeline>, remote: Arc<R>, cancel: CancellationToken) -> Self {
        Self {
            pipeline,
            remote,
            cancel,
        }
    }

    /// Run until cancelled. Individual lookup failures never end the loop.
    pub async fn run(self) {
        let tracker = self.pipeline.tracker.clone();
        tracker.mark_started();
        log::info!("fetch worker started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let Some(request) = self.pipeline.queue.dequeue_next() else {
                tracker.update_status(WorkerStatus::Idle);
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = self.pipeline.queue.wait_for_work(self.pipeline.config.idle_interval) => {}
                }
                continue;
            };

            if let Some(pause) = self.process(request).await {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        tracker.mark_stopped();
        log::info!("fetch worker stopped");
    }

    /// Handles one request and returns how long to pause before the next one.
    async fn process(&self, request: LookupRequest) -> Option<Duration> {
        let pipeline = &self.pipeline;
        let tracker = &pipeline.tracker;
        tracker.update_status(WorkerStatus::Processing);

        let (message, key) = match resolve_author_key(pipeline.messages.as_ref(), &request.message) {
            Ok(found) => found,
            Err(err) => {
                log::warn!("worker: skipping lookup: {}", err);
                tracker.update_metrics(|metrics| metrics.unresolvable_skips += 1);
                return None;
            }
        };

        if let Some(entry) = pipeline.cache.get(&key) {
            log::debug!("worker: {} already cached, skipping remote call", key);
            pipeline.waiters.fulfill(&key, &entry.color);
            tracker.update_metrics(|metrics| metrics.cache_skips += 1);
            return None;
        }

        if pipeline.settings().color_mode == ColorMode::None {
            log::debug!("worker: colors disabled, dropping lookup for {}", request.message);
            pipeline.waiters.abandon(&key);
            return None;
        }

        let generation = pipeline.cache.generation();
        tracker.update_status(WorkerStatus::Calling);
        tracker.update_metrics(|metrics| metrics.remote_calls += 1);

        match self.remote.fetch_message(&request.message.message_id).await {
            Ok(response) => {
                self.apply(request, &message.channel_id, key, generation, response);
                Some(pipeline.config.request_interval)
            }
            Err(err) if !err.is_transient() => {
                // final answer: the author gets the placeholder
                log::debug!("worker: no remote record for {}: {}", request.message, err);
                tracker.update_metrics(|metrics| metrics.unknown_messages += 1);
                self.apply(
                    request,
                    &message.channel_id,
                    key,
                    generation,
                    ProxiedMessage::default(),
                );
                Some(pipeline.config.request_interval)
            }
            Err(err) => {
                log::warn!(
                    "worker: lookup for {} failed (attempt {}): {}",
                    request.message,
                    request.attempts + 1,
                    err
                );
                tracker.record_failure(err.to_string());
                tracker.update_status(WorkerStatus::BackingOff);
                pipeline.queue.requeue(request);
                Some(pipeline.config.retry_backoff)
            }
        }
    }

    fn apply(
        &self,
        request: LookupRequest,
        channel_id: &str,
        key: AuthorKey,
        generation: u64,
        response: ProxiedMessage,
    ) {
        let pipeline = &self.pipeline;
        let settings = pipeline.settings();
        let color = select_color(&settings, &response, channel_id, pipeline.accounts.as_ref());

        if response.sender.is_some() && response.sender == pipeline.current_user_id {
            pipeline.cache.mark_owned(key.clone());
        }

        match pipeline
            .cache
            .store(generation, key.clone(), color, response.member)
        {
            Some(entry) => {
                log::debug!("worker: {} -> {}", key, entry.color);
                pipeline.waiters.fulfill(&key, &entry.color);
                pipeline
                    .tracker
                    .update_metrics(|metrics| metrics.colors_stored += 1);
            }
            None => {
                // settings changed mid-call; redo it under the new ones
                log::debug!("worker: discarding stale color for {}", key);
                pipeline
                    .tracker
                    .update_metrics(|metrics| metrics.stale_writes += 1);
                pipeline.queue.enqueue(request);
            }
        }
    }
}

/// Picks the display color for a resolved message under `settings`.
///
/// Member and system modes read the remote colors and, when readable colors
/// are on, lift their lightness. Account mode asks the host and ignores the
/// remote colors entirely. A missing or malformed color becomes the neutral
/// placeholder instead of failing the lookup.
pub fn select_color(
    settings: &Settings,
    response: &ProxiedMessage,
    channel_id: &str,
    accounts: &dyn AccountColors,
) -> String {
    if settings.color_mode.uses_remote_color() {
        let raw = if settings.color_mode == ColorMode::Member {
            response.member_color()
        } else {
            response.system_color()
        };

        return match raw.and_then(Rgb::parse_hex) {
            Some(rgb) if settings.readable_colors => color::readable(rgb).to_hex(),
            Some(rgb) => rgb.to_hex(),
            None => PLACEHOLDER_COLOR.to_string(),
        };
    }

    match settings.color_mode {
        ColorMode::Account => response
            .sender
            .as_deref()
            .and_then(|sender| accounts.local_color_for_sender(channel_id, sender))
            .and_then(|local| color::normalize_hex(Some(&local)))
            .unwrap_or_else(|| PLACEHOLDER_COLOR.to_string()),
        _ => PLACEHOLDER_COLOR.to_string(),
    }
}
