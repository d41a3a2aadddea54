pub mod feed;
pub mod inbox;
pub mod listener;

pub use feed::{ChangeEvent, ChangeFeed, Subscription};
pub use inbox::{InboxEvent, NotificationInbox};
pub use listener::{Alert, InboxUpdate, NotificationListener};
