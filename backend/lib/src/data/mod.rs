//! Data access layer using the repository pattern
//!
//! ## Key Components
//! - [`SocialRepository`] - every read and write the services need
//! - [`postgres::PostgresRepository`] - production implementation on diesel-async
//! - [`memory::InMemoryRepository`] - in-memory implementation for mock mode and tests
//! - [`sources`] - adapters exposing repository list queries as [`KeysetSource`]s
//!
//! List queries never take an offset: they receive a [`KeyWindow`] and must
//! return the rows strictly inside it, ordered by `(timestamp, id)` in the
//! window direction.
//!
//! [`KeysetSource`]: crate::pagination::KeysetSource

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    models::{
        Chat, ChatParticipant, Comment, Message, Post, PostFilter, Reaction, ReactionCounts,
        ReactionTarget, ReactionType, User,
    },
    pagination::{KeyWindow, TimestampedKey},
};

pub mod error;
pub mod memory;
pub mod postgres;
pub mod sources;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// Main trait defining all storage operations.
///
/// ## Implementation Notes
/// - `get_*` return `None` for missing rows, `create_*` return the stored row
/// - `update_*` return `None` and `delete_*` return `false` when the row is missing
/// - `fetch_*` are keyset queries driven by a [`KeyWindow`]
/// - deleting a post or comment also deletes the replies and reactions hanging off it
#[async_trait]
pub trait SocialRepository: Send + Sync {
    /// Cheap round trip used by health checks and startup
    async fn test_connection(&self) -> RepositoryResult<()>;

    // ============ Users ============

    async fn create_user(&self, username: &str) -> RepositoryResult<User>;

    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>>;

    /// Users for the given ids; unknown ids are skipped
    async fn get_users(&self, ids: &[Uuid]) -> RepositoryResult<Vec<User>>;

    // ============ Posts ============

    async fn create_post(&self, user_id: Uuid, content: &str) -> RepositoryResult<Post>;

    async fn get_post(&self, id: Uuid) -> RepositoryResult<Option<Post>>;

    /// Replaces the content and stamps `updated_at`
    async fn update_post(&self, id: Uuid, content: &str) -> RepositoryResult<Option<Post>>;

    /// Returns whether a post was removed
    async fn delete_post(&self, id: Uuid) -> RepositoryResult<bool>;

    /// Number of comments (replies included) per post; posts without comments are absent
    async fn count_comments(&self, post_ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, i64>>;

    async fn fetch_posts(
        &self,
        filter: PostFilter,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Post>>;

    // ============ Comments ============

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        parent_comment_id: Option<Uuid>,
        content: &str,
    ) -> RepositoryResult<Comment>;

    async fn get_comment(&self, id: Uuid) -> RepositoryResult<Option<Comment>>;

    async fn update_comment(&self, id: Uuid, content: &str) -> RepositoryResult<Option<Comment>>;

    /// Removes the comment and its whole reply subtree
    async fn delete_comment(&self, id: Uuid) -> RepositoryResult<bool>;

    /// Comments of `post_id` whose parent is `parent_comment_id` (`None` for top level)
    async fn fetch_comments(
        &self,
        post_id: Uuid,
        parent_comment_id: Option<Uuid>,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Comment>>;

    /// Number of direct replies per comment; comments without replies are absent
    async fn count_replies(&self, comment_ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, i64>>;

    // ============ Chats ============

    async fn create_chat(
        &self,
        chat_type: &str,
        name: Option<&str>,
        participants: &[Uuid],
    ) -> RepositoryResult<Chat>;

    /// The direct chat shared by `user_a` and `user_b`, if any
    async fn find_direct_chat(&self, user_a: Uuid, user_b: Uuid)
        -> RepositoryResult<Option<Chat>>;

    /// The direct chat of the pair, created with both participants if missing
    ///
    /// Atomic: concurrent calls for the same pair, in either order, all return
    /// the same chat and exactly one of them reports `true` (created).
    async fn find_or_create_direct_chat(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> RepositoryResult<(Chat, bool)>;

    async fn list_participants(&self, chat_ids: &[Uuid]) -> RepositoryResult<Vec<ChatParticipant>>;

    /// Chats `user_id` participates in
    async fn fetch_chats(
        &self,
        user_id: Uuid,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Chat>>;

    // ============ Messages ============

    async fn create_message(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> RepositoryResult<Message>;

    async fn get_message(&self, id: Uuid) -> RepositoryResult<Option<Message>>;

    /// Soft-deletes a message; returns whether a visible message was hidden
    async fn delete_message(&self, id: Uuid) -> RepositoryResult<bool>;

    /// Non-deleted messages of `chat_id`
    async fn fetch_messages(
        &self,
        chat_id: Uuid,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Message>>;

    // ============ Reactions ============

    /// Stores the reaction of `user_id`, replacing the kind of an existing one
    async fn upsert_reaction(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
        target_id: Uuid,
        kind: ReactionType,
    ) -> RepositoryResult<Reaction>;

    /// Removes the reaction of `user_id` only; returns whether one existed
    async fn delete_reaction(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
        target_id: Uuid,
    ) -> RepositoryResult<bool>;

    async fn fetch_reactions(
        &self,
        target: ReactionTarget,
        target_id: Uuid,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Reaction>>;

    /// Reaction counts per target; targets without reactions are absent
    async fn count_reactions(
        &self,
        target: ReactionTarget,
        target_ids: &[Uuid],
    ) -> RepositoryResult<HashMap<Uuid, ReactionCounts>>;

    /// The reaction `user_id` left on each target, if any
    async fn user_reactions(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
        target_ids: &[Uuid],
    ) -> RepositoryResult<HashMap<Uuid, ReactionType>>;
}
