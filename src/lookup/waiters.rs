use crate::identity::AuthorKey;
use dashmap::DashMap;
use tokio::sync::oneshot;

/// Callers waiting for a color to be resolved, keyed by author.
///
/// Every registered receiver gets the color at most once: `fulfill` removes
/// the senders it completes.
#[derive(Default)]
pub struct Waiters {
    pending: DashMap<AuthorKey, Vec<oneshot::Sender<String>>>,
}

impl Waiters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: AuthorKey) -> oneshot::Receiver<String> {
        let (tx, rx) = oneshot::channel();
        self.pending.entry(key).or_default().push(tx);
        rx
    }

    /// Hands `color` to everyone waiting on `key`; returns how many were
    /// still listening.
    pub fn fulfill(&self, key: &AuthorKey, color: &str) -> usize {
        let Some((_, senders)) = self.pending.remove(key) else {
            return 0;
        };

        senders
            .into_iter()
            .filter_map(|tx| tx.send(color.to_string()).ok())
            .count()
    }

    /// Releases everyone waiting on `key` without a color; their waits end
    /// with `None` right away.
    pub fn abandon(&self, key: &AuthorKey) -> usize {
        self.pending
            .remove(key)
            .map(|(_, senders)| senders.len())
            .unwrap_or(0)
    }

    /// Drops senders whose receivers gave up; returns how many were dropped.
    pub fn prune_closed(&self) -> usize {
        let mut pruned = 0;
        self.pending.retain(|_, senders| {
            let before = senders.len();
            senders.retain(|tx| !tx.is_closed());
            pruned += before - senders.len();
            !senders.is_empty()
        });
        pruned
    }

    /// Number of authors with at least one waiter.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(handle: &str) -> AuthorKey {
        AuthorKey {
            handle: handle.to_string(),
            avatar: None,
            channel_id: "c1".to_string(),
        }
    }

    #[tokio::test]
    async fn fulfill_reaches_every_waiter_once() {
        let waiters = Waiters::new();
        let first = waiters.register(key("Ash"));
        let second = waiters.register(key("Ash"));
        let other = waiters.register(key("Birch"));

        assert_eq!(waiters.fulfill(&key("Ash"), "#ff0000"), 2);
        assert_eq!(first.await.unwrap(), "#ff0000");
        assert_eq!(second.await.unwrap(), "#ff0000");

        assert_eq!(waiters.fulfill(&key("Ash"), "#00ff00"), 0);
        assert_eq!(waiters.len(), 1);
        drop(other);
    }

    #[tokio::test]
    async fn abandon_releases_waiters_without_a_color() {
        let waiters = Waiters::new();
        let rx = waiters.register(key("Ash"));

        assert_eq!(waiters.abandon(&key("Ash")), 1);
        assert!(rx.await.is_err());
        assert!(waiters.is_empty());
        assert_eq!(waiters.abandon(&key("Ash")), 0);
    }

    #[test]
    fn prune_drops_abandoned_receivers() {
        let waiters = Waiters::new();
        let kept = waiters.register(key("Ash"));
        drop(waiters.register(key("Ash")));
        drop(waiters.register(key("Birch")));

        assert_eq!(waiters.prune_closed(), 2);
        assert_eq!(waiters.len(), 1);
        drop(kept);
    }
}
