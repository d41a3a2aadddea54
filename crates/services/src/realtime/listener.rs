use bson::{Bson, oid::ObjectId};
use studyx_db::models::Notification;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::feed::{ChangeFeed, Subscription};
use super::inbox::{InboxEvent, NotificationInbox};

/// Transient notice raised when a notification arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct InboxUpdate {
    pub event: InboxEvent,
    pub inbox: NotificationInbox,
    pub alert: Option<Alert>,
}

/// Keeps one user's inbox current for as long as it lives.
///
/// Take the subscription with [`NotificationListener::subscribe`] before
/// loading the initial list: an insert landing between the two then shows
/// up in the list, the feed, or both, and the copy already in the list is
/// not reported again. Dropping the listener stops its task and releases
/// the subscription.
pub struct NotificationListener {
    events: mpsc::UnboundedSender<InboxEvent>,
    task: JoinHandle<()>,
}

impl NotificationListener {
    /// Notification inserts addressed to `user_id`.
    pub fn subscribe(feed: &ChangeFeed, user_id: ObjectId) -> Subscription {
        feed.subscribe(
            Notification::COLLECTION,
            Some(("user_id".to_string(), Bson::ObjectId(user_id))),
        )
    }

    pub fn start(
        mut subscription: Subscription,
        user_id: ObjectId,
        initial: Vec<Notification>,
    ) -> (Self, mpsc::UnboundedReceiver<InboxUpdate>) {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<InboxEvent>();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel::<InboxUpdate>();

        let task = tokio::spawn(async move {
            let mut inbox = NotificationInbox::default().apply(&InboxEvent::Loaded(initial));

            loop {
                let (event, alert) = tokio::select! {
                    doc = subscription.next() => {
                        let Some(doc) = doc else { break };
                        match bson::from_document::<Notification>(doc) {
                            Ok(notification) if inbox.contains(notification.id) => continue,
                            Ok(notification) => {
                                let alert = Alert {
                                    title: notification.title.clone(),
                                    message: notification.message.clone(),
                                };
                                (InboxEvent::Inserted(notification), Some(alert))
                            }
                            Err(e) => {
                                warn!(%user_id, error = %e, "Skipping malformed notification");
                                continue;
                            }
                        }
                    }
                    event = events_rx.recv() => {
                        let Some(event) = event else { break };
                        (event, None)
                    }
                };

                inbox = inbox.apply(&event);
                let update = InboxUpdate {
                    event,
                    inbox: inbox.clone(),
                    alert,
                };
                if updates_tx.send(update).is_err() {
                    break;
                }
            }
            debug!(%user_id, "Notification listener stopped");
        });

        (
            Self {
                events: events_tx,
                task,
            },
            updates_rx,
        )
    }

    /// Feeds a local event (e.g. a notification marked read) to the inbox.
    pub fn dispatch(&self, event: InboxEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for NotificationListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
