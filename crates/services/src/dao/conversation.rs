use bson::{DateTime, doc, oid::ObjectId};
use studyx_db::models::{Attachment, Conversation, Message};

use super::base::{Backend, BaseDao, DaoError, DaoResult};

pub struct ConversationDao {
    pub base: BaseDao<Conversation>,
    pub messages: BaseDao<Message>,
}

impl ConversationDao {
    pub fn new(backend: &Backend) -> Self {
        Self {
            base: BaseDao::new(backend, Conversation::COLLECTION),
            messages: BaseDao::new(backend, Message::COLLECTION),
        }
    }

    /// Returns the conversation for the triple, creating it on first use.
    pub async fn get_or_create(
        &self,
        student_id: ObjectId,
        teacher_id: ObjectId,
        classroom_id: ObjectId,
    ) -> DaoResult<Conversation> {
        let key = doc! {
            "student_id": student_id,
            "teacher_id": teacher_id,
            "classroom_id": classroom_id,
        };
        if let Some(existing) = self.base.find_one(key.clone()).await? {
            return Ok(existing);
        }

        let conversation = Conversation {
            id: None,
            student_id,
            teacher_id,
            classroom_id,
            created_at: DateTime::now(),
        };
        match self.base.create(&conversation).await {
            Ok(created) => Ok(created),
            // Lost a race with a concurrent create.
            Err(DaoError::DuplicateKey(_)) => {
                self.base.find_one(key).await?.ok_or(DaoError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_for_user(&self, user_id: ObjectId) -> DaoResult<Vec<Conversation>> {
        self.base
            .find_many(
                doc! { "$or": [ { "student_id": user_id }, { "teacher_id": user_id } ] },
                Some(doc! { "created_at": -1 }),
            )
            .await
    }

    /// The conversation if `user_id` takes part in it.
    pub async fn find_for_participant(
        &self,
        conversation_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Conversation> {
        let conversation = self.base.find_by_id(conversation_id).await?;
        if !conversation.has_participant(user_id) {
            return Err(DaoError::Forbidden(
                "Not a participant in this conversation".to_string(),
            ));
        }
        Ok(conversation)
    }

    pub async fn list_messages(&self, conversation_id: ObjectId) -> DaoResult<Vec<Message>> {
        self.messages
            .find_many(
                doc! { "conversation_id": conversation_id },
                Some(doc! { "created_at": 1 }),
            )
            .await
    }

    pub async fn send_message(
        &self,
        conversation_id: ObjectId,
        sender_id: ObjectId,
        content: Option<String>,
        attachment: Option<Attachment>,
    ) -> DaoResult<Message> {
        let content = content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if content.is_none() && attachment.is_none() {
            return Err(DaoError::Validation(
                "A message needs text or a file".to_string(),
            ));
        }

        let message = Message {
            id: None,
            conversation_id,
            sender_id,
            content,
            attachment,
            created_at: DateTime::now(),
        };
        self.messages.create(&message).await
    }
}
