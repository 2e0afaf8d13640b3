use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::users::UserSummary;
use crate::{
    data::postgres::schema::{chat_participants, chats, messages},
    pagination::{Timestamped, TimestampedKey},
};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = chats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Chat {
    pub id: Uuid,
    /// Either `direct` or `group`
    pub chat_type: String,
    pub name: Option<String>,
    /// Set for direct chats only, see [`direct_chat_key`]
    pub direct_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Key shared by both directions of a one-to-one conversation
///
/// `chats.direct_key` is unique, so at most one direct chat exists per pair.
pub fn direct_chat_key(user_a: Uuid, user_b: Uuid) -> String {
    let (low, high) = if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    };
    format!("{low}:{high}")
}

impl Timestamped for Chat {
    fn timestamped_key(&self) -> TimestampedKey {
        TimestampedKey::new(self.created_at, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = chat_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatParticipant {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Timestamped for Message {
    fn timestamped_key(&self) -> TimestampedKey {
        TimestampedKey::new(self.sent_at, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDto {
    pub chat_id: Uuid,
    pub chat_name: Option<String>,
    pub chat_type: String,
    pub created_at: DateTime<Utc>,
    pub participants: Vec<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub message_id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub username: Option<String>,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl MessageDto {
    pub fn from_message(message: Message, username: Option<String>) -> Self {
        Self {
            message_id: message.id,
            chat_id: message.chat_id,
            user_id: message.user_id,
            username,
            content: message.content,
            sent_at: message.sent_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
}
