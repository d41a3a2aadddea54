use bson::oid::ObjectId;
use studyx_db::models::Notification;

#[derive(Debug, Clone)]
pub enum InboxEvent {
    Loaded(Vec<Notification>),
    Inserted(Notification),
    MarkedRead(ObjectId),
}

/// A user's notification list (newest first) and unread count.
///
/// Values are never mutated in place; [`NotificationInbox::apply`] returns
/// the next state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationInbox {
    items: Vec<Notification>,
    unread: usize,
}

impl NotificationInbox {
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn contains(&self, id: Option<ObjectId>) -> bool {
        id.is_some() && self.items.iter().any(|n| n.id == id)
    }

    pub fn apply(&self, event: &InboxEvent) -> Self {
        match event {
            InboxEvent::Loaded(list) => Self {
                unread: list.iter().filter(|n| !n.read).count(),
                items: list.clone(),
            },
            InboxEvent::Inserted(notification) => {
                if self.contains(notification.id) {
                    return self.clone();
                }
                let mut items = Vec::with_capacity(self.items.len() + 1);
                items.push(notification.clone());
                items.extend(self.items.iter().cloned());
                Self {
                    items,
                    unread: self.unread + usize::from(!notification.read),
                }
            }
            InboxEvent::MarkedRead(id) => {
                let was_unread = self
                    .items
                    .iter()
                    .any(|n| n.id == Some(*id) && !n.read);
                if !was_unread {
                    return self.clone();
                }
                let items = self
                    .items
                    .iter()
                    .map(|n| {
                        let mut n = n.clone();
                        if n.id == Some(*id) {
                            n.read = true;
                        }
                        n
                    })
                    .collect();
                Self {
                    items,
                    unread: self.unread.saturating_sub(1),
                }
            }
        }
    }
}
