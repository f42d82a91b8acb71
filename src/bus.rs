use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast topic with bounded capacity.
/// Slow subscribers skip ahead instead of blocking publishers.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes `msg`, returning how many subscribers will see it.
    pub fn publish(&self, msg: T) -> usize {
        self.tx.send(Arc::new(msg)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let topic: Topic<u32> = Topic::new(4);
        assert_eq!(topic.publish(1), 0);

        let mut a = topic.subscribe();
        let mut b = topic.subscribe();
        assert_eq!(topic.publish(2), 2);
        assert_eq!(*a.recv().await.unwrap(), 2);
        assert_eq!(*b.recv().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_receiver_closes_with_last_publisher() {
        let topic: Topic<u32> = Topic::new(4);
        let mut rx = topic.subscribe();
        drop(topic);
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));
    }
}
