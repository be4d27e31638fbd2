use crate::identity::MessageRef;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// A pending color lookup for one rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub message: MessageRef,
    /// Failed remote calls made for this request so far
    pub attempts: u32,
}

impl LookupRequest {
    pub fn new(message: MessageRef) -> Self {
        Self {
            message,
            attempts: 0,
        }
    }
}

/// Pending lookups, served newest first.
///
/// The message requested last is the one most likely on screen, so the
/// queue is a stack. Retries go to the bottom, behind everything already
/// waiting, so one failing lookup cannot hold the top. Duplicates are allowed in here; the worker drops them by
/// re-checking the cache before calling out. No back-pressure: requests arrive
/// at the pace a person scrolls.
#[derive(Default)]
pub struct FetchQueue {
    stack: Mutex<Vec<LookupRequest>>,
    notify: Notify,
}

impl FetchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, request: LookupRequest) {
        self.stack.lock().push(request);
        self.notify.notify_one();
    }

    /// Puts a failed request under all pending work with its attempt count
    /// bumped.
    pub fn requeue(&self, mut request: LookupRequest) {
        request.attempts = request.attempts.saturating_add(1);
        self.stack.lock().insert(0, request);
        self.notify.notify_one();
    }

    pub fn dequeue_next(&self) -> Option<LookupRequest> {
        self.stack.lock().pop()
    }

    pub fn len(&self) -> usize {
        self.stack.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.lock().is_empty()
    }

    /// Returns when something is enqueued or after `idle`, whichever is first.
    pub async fn wait_for_work(&self, idle: Duration) {
        let _ = tokio::time::timeout(idle, self.notify.notified()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> LookupRequest {
        LookupRequest::new(MessageRef::new("c1", id))
    }

    #[test]
    fn dequeues_most_recent_first() {
        let queue = FetchQueue::new();
        queue.enqueue(request("1"));
        queue.enqueue(request("2"));
        queue.enqueue(request("3"));

        assert_eq!(queue.dequeue_next().unwrap().message.message_id, "3");
        assert_eq!(queue.dequeue_next().unwrap().message.message_id, "2");
        assert_eq!(queue.dequeue_next().unwrap().message.message_id, "1");
        assert!(queue.dequeue_next().is_none());
    }

    #[test]
    fn requeue_bumps_attempts_and_goes_to_the_bottom() {
        let queue = FetchQueue::new();
        queue.enqueue(request("1"));
        queue.enqueue(request("2"));

        let failed = queue.dequeue_next().unwrap();
        queue.requeue(failed);
        queue.enqueue(request("3"));

        assert_eq!(queue.dequeue_next().unwrap().message.message_id, "3");
        assert_eq!(queue.dequeue_next().unwrap().message.message_id, "1");

        let retried = queue.dequeue_next().unwrap();
        assert_eq!(retried.message.message_id, "2");
        assert_eq!(retried.attempts, 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn lone_retry_is_next() {
        let queue = FetchQueue::new();
        queue.requeue(request("1"));
        assert_eq!(queue.dequeue_next().unwrap().attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_early_when_work_arrives() {
        let queue = std::sync::Arc::new(FetchQueue::new());
        let producer = queue.clone();

        let started = tokio::time::Instant::now();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            producer.enqueue(request("1"));
        });

        queue.wait_for_work(Duration::from_secs(10)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_when_idle() {
        let queue = FetchQueue::new();
        let started = tokio::time::Instant::now();

        queue.wait_for_work(Duration::from_millis(500)).await;
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
