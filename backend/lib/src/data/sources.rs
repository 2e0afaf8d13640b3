//! Repository list queries exposed as keyset sources
//!
//! Each adapter pins the non-key filters of one list endpoint (author, post,
//! chat...) and forwards the key window to the repository.

use async_trait::async_trait;
use uuid::Uuid;

use super::{error::RepositoryResult, SocialRepository};
use crate::{
    models::{Chat, Comment, Message, Post, PostFilter, Reaction, ReactionTarget},
    pagination::{KeyWindow, KeysetSource, TimestampedKey},
};

/// Posts matching a [`PostFilter`]
pub struct PostFeed<'a> {
    pub repository: &'a dyn SocialRepository,
    pub filter: PostFilter,
}

#[async_trait]
impl KeysetSource for PostFeed<'_> {
    type Item = Post;
    type Key = TimestampedKey;

    async fn fetch(&self, window: KeyWindow<TimestampedKey>) -> RepositoryResult<Vec<Post>> {
        self.repository.fetch_posts(self.filter, window).await
    }
}

/// Comments of one post sharing the same parent
pub struct CommentThread<'a> {
    pub repository: &'a dyn SocialRepository,
    pub post_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
}

#[async_trait]
impl KeysetSource for CommentThread<'_> {
    type Item = Comment;
    type Key = TimestampedKey;

    async fn fetch(&self, window: KeyWindow<TimestampedKey>) -> RepositoryResult<Vec<Comment>> {
        self.repository
            .fetch_comments(self.post_id, self.parent_comment_id, window)
            .await
    }
}

/// Chats a user participates in
pub struct ChatList<'a> {
    pub repository: &'a dyn SocialRepository,
    pub user_id: Uuid,
}

#[async_trait]
impl KeysetSource for ChatList<'_> {
    type Item = Chat;
    type Key = TimestampedKey;

    async fn fetch(&self, window: KeyWindow<TimestampedKey>) -> RepositoryResult<Vec<Chat>> {
        self.repository.fetch_chats(self.user_id, window).await
    }
}

/// Visible messages of one chat
pub struct MessageHistory<'a> {
    pub repository: &'a dyn SocialRepository,
    pub chat_id: Uuid,
}

#[async_trait]
impl KeysetSource for MessageHistory<'_> {
    type Item = Message;
    type Key = TimestampedKey;

    async fn fetch(&self, window: KeyWindow<TimestampedKey>) -> RepositoryResult<Vec<Message>> {
        self.repository.fetch_messages(self.chat_id, window).await
    }
}

/// Reactions left on one post or comment
pub struct ReactionList<'a> {
    pub repository: &'a dyn SocialRepository,
    pub target: ReactionTarget,
    pub target_id: Uuid,
}

#[async_trait]
impl KeysetSource for ReactionList<'_> {
    type Item = Reaction;
    type Key = TimestampedKey;

    async fn fetch(&self, window: KeyWindow<TimestampedKey>) -> RepositoryResult<Vec<Reaction>> {
        self.repository
            .fetch_reactions(self.target, self.target_id, window)
            .await
    }
}
