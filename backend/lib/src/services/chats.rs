//! Chats and direct messages
//!
//! Direct message history is paged newest first. Besides the forward cursor
//! (`before`: older than), a request may carry an `until` cursor (`after`:
//! newer than) to fetch only what arrived since a known message.

use std::{collections::HashMap, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::{require_author, require_content, require_user, summary_of, user_summaries};
use crate::{
    data::{
        sources::{ChatList, MessageHistory},
        SocialRepository,
    },
    error::{Error, Result},
    models::{Chat, ChatDto, Message, MessageDto, SendMessageRequest, User, UserSummary},
    pagination::{Chronological, Page, PageRequest, PaginationMode, Paginator},
};

pub struct ChatService {
    repository: Arc<dyn SocialRepository>,
    paginator: Paginator,
    shutdown: CancellationToken,
}

impl ChatService {
    pub fn new(
        repository: Arc<dyn SocialRepository>,
        paginator: Paginator,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            repository,
            paginator,
            shutdown,
        }
    }

    /// Chats `user_id` takes part in, newest first, with their participants
    pub async fn list_chats(&self, user_id: Uuid, request: PageRequest) -> Result<Page<ChatDto>> {
        let source = ChatList {
            repository: self.repository.as_ref(),
            user_id,
        };

        let page = self
            .paginator
            .paginate_cancellable(
                &source,
                &Chronological,
                &request.descending(),
                PaginationMode::Standard,
                &self.shutdown,
            )
            .await?;

        self.with_participants(page).await
    }

    /// Messages between `user_id` and `other_user_id`, newest first
    ///
    /// Users that never talked get an empty page rather than an error.
    pub async fn list_direct_messages(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<MessageDto>> {
        self.require_peer(user_id, other_user_id).await?;

        let Some(chat) = self
            .repository
            .find_direct_chat(user_id, other_user_id)
            .await?
        else {
            return Ok(Page::empty());
        };

        let source = MessageHistory {
            repository: self.repository.as_ref(),
            chat_id: chat.id,
        };

        let page = self
            .paginator
            .paginate_cancellable(
                &source,
                &Chronological,
                &request.descending(),
                PaginationMode::Standard,
                &self.shutdown,
            )
            .await?;

        self.with_senders(page).await
    }

    /// Sends a direct message, opening the chat on the first message
    pub async fn send_direct_message(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
        body: SendMessageRequest,
    ) -> Result<MessageDto> {
        let content = require_content(&body.content, "content")?;
        let sender = require_user(self.repository.as_ref(), user_id).await?;
        self.require_peer(sender.id, other_user_id).await?;

        let (chat, opened) = self
            .repository
            .find_or_create_direct_chat(sender.id, other_user_id)
            .await?;
        if opened {
            info!(chat_id = %chat.id, "Opened direct chat");
        }

        let message = self
            .repository
            .create_message(chat.id, sender.id, content)
            .await?;
        debug!(message_id = %message.id, chat_id = %chat.id, "Message sent");

        Ok(MessageDto::from_message(message, Some(sender.username)))
    }

    /// Hides a message from the history; only its sender may do so
    pub async fn delete_message(&self, user_id: Uuid, message_id: Uuid) -> Result<()> {
        let message = self
            .repository
            .get_message(message_id)
            .await?
            .filter(|message| !message.is_deleted)
            .ok_or_else(|| Error::NotFound(format!("Message {message_id}")))?;
        require_author(message.user_id, user_id, "message")?;

        if !self.repository.delete_message(message_id).await? {
            return Err(Error::NotFound(format!("Message {message_id}")));
        }

        debug!(%message_id, chat_id = %message.chat_id, "Message deleted");
        Ok(())
    }

    /// The other side of a direct chat must exist and differ from the caller
    async fn require_peer(&self, user_id: Uuid, other_user_id: Uuid) -> Result<User> {
        if user_id == other_user_id {
            return Err(Error::BadRequest(
                "Direct chats need two different users".to_string(),
            ));
        }

        self.repository
            .get_user(other_user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {other_user_id}")))
    }

    async fn with_participants(&self, page: Page<Chat>) -> Result<Page<ChatDto>> {
        let chat_ids: Vec<Uuid> = page.items.iter().map(|chat| chat.id).collect();
        let participants = self.repository.list_participants(&chat_ids).await?;

        let summaries = user_summaries(
            self.repository.as_ref(),
            participants.iter().map(|p| p.user_id),
        )
        .await?;

        let mut members: HashMap<Uuid, Vec<UserSummary>> = HashMap::new();
        for participant in &participants {
            members
                .entry(participant.chat_id)
                .or_default()
                .push(summary_of(&summaries, participant.user_id));
        }

        Ok(page.map(|chat| ChatDto {
            participants: members.remove(&chat.id).unwrap_or_default(),
            chat_id: chat.id,
            chat_name: chat.name,
            chat_type: chat.chat_type,
            created_at: chat.created_at,
        }))
    }

    async fn with_senders(&self, page: Page<Message>) -> Result<Page<MessageDto>> {
        let senders = user_summaries(
            self.repository.as_ref(),
            page.items.iter().map(|message| message.user_id),
        )
        .await?;

        Ok(page.map(|message| {
            let username = senders.get(&message.user_id).map(|s| s.username.clone());
            MessageDto::from_message(message, username)
        }))
    }
}
