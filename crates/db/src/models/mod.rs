pub mod classroom;
pub mod classroom_member;
pub mod conversation;
pub mod message;
pub mod notification;
pub mod task;
pub mod task_completion;
pub mod task_submission;
pub mod user;

pub use classroom::Classroom;
pub use classroom_member::ClassroomMember;
pub use conversation::Conversation;
pub use message::{Attachment, Message};
pub use notification::{Notification, NotificationType};
pub use task::{DocumentRef, Priority, Task};
pub use task_completion::TaskCompletion;
pub use task_submission::TaskSubmission;
pub use user::{Role, User};
