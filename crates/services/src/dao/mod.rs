pub mod base;
pub mod classroom;
pub mod conversation;
pub mod notification;
pub mod task;
pub mod user;

pub use base::{Backend, BaseDao, DaoError, DaoResult};
pub use classroom::ClassroomDao;
pub use conversation::ConversationDao;
pub use notification::NotificationDao;
pub use task::TaskDao;
pub use user::UserDao;
