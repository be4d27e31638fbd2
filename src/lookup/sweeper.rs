use super::Pipeline;
use std::sync::Arc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Periodically drops expired colors so the cache stays bounded, independent
/// of lookup traffic. Also forgets waiters whose callers stopped listening.
pub async fn run_sweeper(pipeline: Arc<Pipeline>, cancel: CancellationToken) {
    let mut ticker = interval(pipeline.config.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let cleared = pipeline.cache.sweep_expired();
                let abandoned = pipeline.waiters.prune_closed();
                log::info!("sweeper: cleared {} expired colors", cleared);
                if abandoned > 0 {
                    log::debug!("sweeper: dropped {} abandoned waiters", abandoned);
                }
            }
        }
    }

    log::debug!("sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LookupConfig, Settings};
    use crate::host::InMemoryHost;
    use crate::identity::AuthorKey;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn sweeps_on_its_own_timer() {
        let host = Arc::new(InMemoryHost::new());
        let config = LookupConfig::from_env()
            .with_color_ttl(Duration::from_secs(120))
            .with_sweep_interval(Duration::from_secs(300));
        let pipeline = Arc::new(Pipeline::new(
            config,
            Settings::default(),
            host.clone(),
            host,
            None,
        ));
        let key = AuthorKey {
            handle: "Ash".to_string(),
            avatar: None,
            channel_id: "c1".to_string(),
        };
        pipeline.cache.put(key, "#ff0000");

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_sweeper(pipeline.clone(), cancel.clone()));

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(pipeline.cache.len(), 1, "expired but not yet swept");

        tokio::time::sleep(Duration::from_secs(101)).await;
        assert_eq!(pipeline.cache.len(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
