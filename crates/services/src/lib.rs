pub mod auth;
pub mod dao;
pub mod due_dates;
pub mod invitation;
pub mod realtime;
pub mod session;
pub mod storage;

pub use auth::AuthService;
pub use dao::*;
pub use due_dates::{DerivationReport, DueDateNotifier};
pub use invitation::InvitationCodeIssuer;
pub use realtime::{ChangeFeed, NotificationListener};
pub use session::Session;
pub use storage::{LocalStorage, ObjectStorage};
