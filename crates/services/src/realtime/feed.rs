//! In-process insert feed.
//!
//! The DAO layer publishes every successful insert here; WebSocket sessions
//! subscribe to one collection, optionally narrowed by an equality filter on
//! a single field.

use std::sync::Arc;

use bson::{Bson, Document};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub collection: String,
    pub document: Document,
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Arc<ChangeEvent>>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, collection: &str, document: Document) {
        // No receivers is not an error.
        let _ = self.sender.send(Arc::new(ChangeEvent {
            collection: collection.to_string(),
            document,
        }));
    }

    /// Inserts into `collection` whose `field == value` when a filter is
    /// given. Events published before this call are not delivered.
    pub fn subscribe(&self, collection: &str, filter: Option<(String, Bson)>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            collection: collection.to_string(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<Arc<ChangeEvent>>,
    collection: String,
    filter: Option<(String, Bson)>,
}

impl Subscription {
    /// Next matching document, or `None` once the feed is gone. Cancel safe.
    pub async fn next(&mut self) -> Option<Document> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(event.document.clone());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(collection = %self.collection, skipped, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn accepts(&self, event: &ChangeEvent) -> bool {
        if event.collection != self.collection {
            return false;
        }
        match &self.filter {
            Some((field, value)) => event.document.get(field) == Some(value),
            None => true,
        }
    }
}
