// Event feed abstraction and the bridge driving cache refreshes
//
// Change notifications are minimal envelopes: a subject naming the changed
// file and the namespace the event was published in. The bridge subscribes
// an engine to its namespaces and turns each notification into a refresh of
// the affected resource collection. Event-handling errors are logged and
// swallowed; a failed refresh never crashes the listening process.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use overture_error::ProviderResult;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::ProviderEngine;

/// The per-namespace broadcast capacity. Batches beyond this lag the
/// subscriber, which then simply misses a refresh it will pick up on the
/// next change.
const CHANNEL_CAPACITY: usize = 64;

/// A change notification delivered through the event feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The path of the changed file; the trailing segment is the file name.
    pub subject: String,
    /// The namespace the event was published in.
    pub namespace: String,
}

impl EventEnvelope {
    /// Creates an envelope for the given subject and namespace.
    pub fn new(subject: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { subject: subject.into(), namespace: namespace.into() }
    }

    /// The trailing path segment of the subject, i.e. the file name.
    pub fn file_name(&self) -> &str {
        self.subject.rsplit('/').next().unwrap_or("")
    }
}

/// Interface to a publish/subscribe event feed delivering batched change
/// notifications.
#[async_trait]
pub trait EventService: Send + Sync {
    /// Subscribes to a namespace, returning a receiver of event batches.
    fn subscribe(&self, namespace: &str) -> broadcast::Receiver<Vec<EventEnvelope>>;

    /// Publishes a batch of events into a namespace.
    async fn publish(
        &self,
        namespace: &str,
        events: Vec<EventEnvelope>,
    ) -> ProviderResult<()>;
}

/// In-process event feed backed by tokio broadcast channels.
///
/// Stands in for the cloud event feed in tests and single-host
/// deployments; every engine subscribed to a namespace sees every batch
/// published into it, including batches for its own writes (refreshes are
/// merges, so self-delivery is harmless).
pub struct InMemoryEventService {
    channels: DashMap<String, broadcast::Sender<Vec<EventEnvelope>>>,
}

impl InMemoryEventService {
    /// Creates an event service with no subscriptions.
    pub fn new() -> Self {
        Self { channels: DashMap::new() }
    }

    fn sender(&self, namespace: &str) -> broadcast::Sender<Vec<EventEnvelope>> {
        self.channels
            .entry(namespace.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for InMemoryEventService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventService for InMemoryEventService {
    fn subscribe(&self, namespace: &str) -> broadcast::Receiver<Vec<EventEnvelope>> {
        self.sender(namespace).subscribe()
    }

    async fn publish(
        &self,
        namespace: &str,
        events: Vec<EventEnvelope>,
    ) -> ProviderResult<()> {
        // A send error only means there are no subscribers right now.
        let _ = self.sender(namespace).send(events);
        Ok(())
    }
}

/// Subscribes an engine to its event namespaces and drives cache refreshes
/// from incoming notifications.
pub struct EventBridge;

impl EventBridge {
    /// Starts one background task per namespace the engine listens on.
    ///
    /// The tasks run until the event service drops the channels; they
    /// never terminate because of a failed refresh.
    pub fn start(
        engine: Arc<ProviderEngine>,
        events: Arc<dyn EventService>,
    ) -> Vec<JoinHandle<()>> {
        engine
            .event_namespaces()
            .iter()
            .map(|namespace| {
                let mut receiver = events.subscribe(namespace);
                let engine = Arc::clone(&engine);
                let namespace = namespace.clone();
                tokio::spawn(async move {
                    info!(namespace = %namespace, provider = engine.name(), "event bridge started");
                    loop {
                        match receiver.recv().await {
                            Ok(batch) => {
                                info!(
                                    namespace = %namespace,
                                    count = batch.len(),
                                    "events received"
                                );
                                for envelope in &batch {
                                    engine.handle_event(envelope).await;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(
                                    namespace = %namespace,
                                    skipped,
                                    "event bridge lagged; skipped batches"
                                );
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_the_trailing_segment() {
        let envelope = EventEnvelope::new(
            "/resource-provider/model/_model-references.json",
            "resource-provider:model",
        );
        assert_eq!(envelope.file_name(), "_model-references.json");

        let bare = EventEnvelope::new("plain.json", "ns");
        assert_eq!(bare.file_name(), "plain.json");
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let service = InMemoryEventService::new();
        let mut first = service.subscribe("ns");
        let mut second = service.subscribe("ns");

        service
            .publish("ns", vec![EventEnvelope::new("a.json", "ns")])
            .await
            .unwrap();

        assert_eq!(first.recv().await.unwrap()[0].subject, "a.json");
        assert_eq!(second.recv().await.unwrap()[0].subject, "a.json");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let service = InMemoryEventService::new();
        service
            .publish("empty", vec![EventEnvelope::new("a.json", "empty")])
            .await
            .unwrap();
    }
}
