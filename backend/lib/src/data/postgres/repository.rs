//! PostgreSQL repository implementation.
//!
//! This module provides the production repository implementation using
//! PostgreSQL as the backing database through diesel-async.
//!
//! ## Key Components
//! - [`PostgresRepository`] - PostgreSQL implementation of [`SocialRepository`]
//!
//! Every list query is a keyset query: the window bounds become a
//! `(timestamp, id)` row comparison, followed by `ORDER BY timestamp, id` and
//! `LIMIT`. No query uses `OFFSET`.
//!
//! Reactions reference posts and comments polymorphically, so the cascades
//! the foreign keys cannot express are done inside the delete transactions.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use super::{
    pool::{PoolSettings, SmartPool},
    schema::{chat_participants, chats, comments, messages, posts, reactions, users},
};
use crate::{
    data::{
        error::{RepositoryError, RepositoryResult},
        SocialRepository,
    },
    constants::api::DIRECT_CHAT_TYPE,
    models::{
        direct_chat_key, Chat, ChatParticipant, Comment, Message, Post, PostFilter, Reaction,
        ReactionCounts, ReactionTarget, ReactionType, User,
    },
    pagination::{Direction, KeyWindow, TimestampedKey},
};

/// Restricts a boxed query to a key window over `($at, $id)`, orders it in the
/// window direction and applies the window limit.
macro_rules! keyset_window {
    ($query:expr, $at:expr, $id:expr, $window:expr) => {{
        let window: KeyWindow<TimestampedKey> = $window;
        let mut query = $query;

        if let Some(after) = window.after {
            query = match window.direction {
                Direction::Ascending => query
                    .filter($at.gt(after.at).or($at.eq(after.at).and($id.gt(after.id)))),
                Direction::Descending => query
                    .filter($at.lt(after.at).or($at.eq(after.at).and($id.lt(after.id)))),
            };
        }

        if let Some(until) = window.until {
            query = match window.direction {
                Direction::Ascending => query
                    .filter($at.lt(until.at).or($at.eq(until.at).and($id.lt(until.id)))),
                Direction::Descending => query
                    .filter($at.gt(until.at).or($at.eq(until.at).and($id.gt(until.id)))),
            };
        }

        query = match window.direction {
            Direction::Ascending => query.order(($at.asc(), $id.asc())),
            Direction::Descending => query.order(($at.desc(), $id.desc())),
        };

        query.limit(i64::try_from(window.limit).unwrap_or(i64::MAX))
    }};
}

/// PostgreSQL repository implementation.
///
/// Provides all database operations using a connection pool.
pub struct PostgresRepository {
    pool: SmartPool,
}

impl PostgresRepository {
    /// Create a new repository connected to `database_url`.
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    /// * `settings` - pool sizing and timeouts
    pub async fn new(database_url: &str, settings: PoolSettings) -> RepositoryResult<Self> {
        Ok(Self {
            pool: SmartPool::new(database_url, settings).await?,
        })
    }
}

#[async_trait]
impl SocialRepository for PostgresRepository {
    async fn test_connection(&self) -> RepositoryResult<()> {
        let mut conn = self.pool.get().await?;
        diesel::sql_query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }

    // ============ Users ============

    async fn create_user(&self, username: &str) -> RepositoryResult<User> {
        let mut conn = self.pool.get().await?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: Utc::now(),
        };

        let stored = diesel::insert_into(users::table)
            .values(&user)
            .returning(User::as_returning())
            .get_result(&mut *conn)
            .await?;

        Ok(stored)
    }

    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let mut conn = self.pool.get().await?;

        let result: Option<User> = users::table
            .filter(users::id.eq(id))
            .select(User::as_select())
            .first(&mut *conn)
            .await
            .optional()?;

        Ok(result)
    }

    async fn get_users(&self, ids: &[Uuid]) -> RepositoryResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.get().await?;

        let results: Vec<User> = users::table
            .filter(users::id.eq_any(ids.to_vec()))
            .select(User::as_select())
            .load(&mut *conn)
            .await?;

        Ok(results)
    }

    // ============ Posts ============

    async fn create_post(&self, user_id: Uuid, content: &str) -> RepositoryResult<Post> {
        let mut conn = self.pool.get().await?;

        let post = Post {
            id: Uuid::new_v4(),
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };

        let stored = diesel::insert_into(posts::table)
            .values(&post)
            .returning(Post::as_returning())
            .get_result(&mut *conn)
            .await?;

        Ok(stored)
    }

    async fn get_post(&self, id: Uuid) -> RepositoryResult<Option<Post>> {
        let mut conn = self.pool.get().await?;

        let result: Option<Post> = posts::table
            .filter(posts::id.eq(id))
            .select(Post::as_select())
            .first(&mut *conn)
            .await
            .optional()?;

        Ok(result)
    }

    async fn update_post(&self, id: Uuid, content: &str) -> RepositoryResult<Option<Post>> {
        let mut conn = self.pool.get().await?;

        let result: Option<Post> = diesel::update(posts::table.filter(posts::id.eq(id)))
            .set((
                posts::content.eq(content),
                posts::updated_at.eq(Some(Utc::now())),
            ))
            .returning(Post::as_returning())
            .get_result(&mut *conn)
            .await
            .optional()?;

        Ok(result)
    }

    async fn delete_post(&self, id: Uuid) -> RepositoryResult<bool> {
        let mut conn = self.pool.get().await?;

        // comments go with the post through ON DELETE CASCADE
        let deleted = conn
            .transaction::<_, RepositoryError, _>(|conn| {
                async move {
                    let comment_ids: Vec<Uuid> = comments::table
                        .filter(comments::post_id.eq(id))
                        .select(comments::id)
                        .load(conn)
                        .await?;

                    diesel::delete(
                        reactions::table
                            .filter(reactions::target_type.eq(ReactionTarget::Comment.as_str()))
                            .filter(reactions::target_id.eq_any(comment_ids)),
                    )
                    .execute(conn)
                    .await?;

                    diesel::delete(
                        reactions::table
                            .filter(reactions::target_type.eq(ReactionTarget::Post.as_str()))
                            .filter(reactions::target_id.eq(id)),
                    )
                    .execute(conn)
                    .await?;

                    let deleted = diesel::delete(posts::table.filter(posts::id.eq(id)))
                        .execute(conn)
                        .await?;

                    Ok(deleted > 0)
                }
                .scope_boxed()
            })
            .await?;

        Ok(deleted)
    }

    async fn count_comments(&self, post_ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, i64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.pool.get().await?;

        let rows: Vec<(Uuid, i64)> = comments::table
            .filter(comments::post_id.eq_any(post_ids.to_vec()))
            .group_by(comments::post_id)
            .select((comments::post_id, diesel::dsl::count_star()))
            .load(&mut *conn)
            .await?;

        Ok(rows.into_iter().collect())
    }

    async fn fetch_posts(
        &self,
        filter: PostFilter,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Post>> {
        let mut conn = self.pool.get().await?;

        let mut query = posts::table.select(Post::as_select()).into_boxed();
        if let Some(author) = filter.author {
            query = query.filter(posts::user_id.eq(author));
        }

        let results: Vec<Post> = keyset_window!(query, posts::created_at, posts::id, window)
            .load(&mut *conn)
            .await?;

        Ok(results)
    }

    // ============ Comments ============

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        parent_comment_id: Option<Uuid>,
        content: &str,
    ) -> RepositoryResult<Comment> {
        let mut conn = self.pool.get().await?;

        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            parent_comment_id,
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };

        let stored = diesel::insert_into(comments::table)
            .values(&comment)
            .returning(Comment::as_returning())
            .get_result(&mut *conn)
            .await?;

        Ok(stored)
    }

    async fn get_comment(&self, id: Uuid) -> RepositoryResult<Option<Comment>> {
        let mut conn = self.pool.get().await?;

        let result: Option<Comment> = comments::table
            .filter(comments::id.eq(id))
            .select(Comment::as_select())
            .first(&mut *conn)
            .await
            .optional()?;

        Ok(result)
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> RepositoryResult<Option<Comment>> {
        let mut conn = self.pool.get().await?;

        let result: Option<Comment> = diesel::update(comments::table.filter(comments::id.eq(id)))
            .set((
                comments::content.eq(content),
                comments::updated_at.eq(Some(Utc::now())),
            ))
            .returning(Comment::as_returning())
            .get_result(&mut *conn)
            .await
            .optional()?;

        Ok(result)
    }

    async fn delete_comment(&self, id: Uuid) -> RepositoryResult<bool> {
        let mut conn = self.pool.get().await?;

        // replies go with their parent through ON DELETE CASCADE
        let deleted = conn
            .transaction::<_, RepositoryError, _>(|conn| {
                async move {
                    let mut subtree = vec![id];
                    let mut frontier = vec![id];
                    while !frontier.is_empty() {
                        let parents: Vec<Option<Uuid>> =
                            frontier.iter().copied().map(Some).collect();
                        frontier = comments::table
                            .filter(comments::parent_comment_id.eq_any(parents))
                            .select(comments::id)
                            .load(conn)
                            .await?;
                        subtree.extend(&frontier);
                    }

                    diesel::delete(
                        reactions::table
                            .filter(reactions::target_type.eq(ReactionTarget::Comment.as_str()))
                            .filter(reactions::target_id.eq_any(subtree)),
                    )
                    .execute(conn)
                    .await?;

                    let deleted = diesel::delete(comments::table.filter(comments::id.eq(id)))
                        .execute(conn)
                        .await?;

                    Ok(deleted > 0)
                }
                .scope_boxed()
            })
            .await?;

        Ok(deleted)
    }

    async fn fetch_comments(
        &self,
        post_id: Uuid,
        parent_comment_id: Option<Uuid>,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Comment>> {
        let mut conn = self.pool.get().await?;

        let mut query = comments::table
            .filter(comments::post_id.eq(post_id))
            .select(Comment::as_select())
            .into_boxed();

        query = match parent_comment_id {
            Some(parent) => query.filter(comments::parent_comment_id.eq(parent)),
            None => query.filter(comments::parent_comment_id.is_null()),
        };

        let results: Vec<Comment> =
            keyset_window!(query, comments::created_at, comments::id, window)
                .load(&mut *conn)
                .await?;

        Ok(results)
    }

    async fn count_replies(&self, comment_ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, i64>> {
        if comment_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.pool.get().await?;

        let parents: Vec<Option<Uuid>> = comment_ids.iter().copied().map(Some).collect();
        let rows: Vec<(Option<Uuid>, i64)> = comments::table
            .filter(comments::parent_comment_id.eq_any(parents))
            .group_by(comments::parent_comment_id)
            .select((comments::parent_comment_id, diesel::dsl::count_star()))
            .load(&mut *conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(parent, count)| parent.map(|parent| (parent, count)))
            .collect())
    }

    // ============ Chats ============

    async fn create_chat(
        &self,
        chat_type: &str,
        name: Option<&str>,
        participants: &[Uuid],
    ) -> RepositoryResult<Chat> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now();
        let direct_key = match participants {
            [a, b] if chat_type == DIRECT_CHAT_TYPE => Some(direct_chat_key(*a, *b)),
            _ => None,
        };
        let chat = Chat {
            id: Uuid::new_v4(),
            chat_type: chat_type.to_string(),
            name: name.map(str::to_string),
            direct_key,
            created_at: now,
        };
        let members: Vec<ChatParticipant> = participants
            .iter()
            .map(|&user_id| ChatParticipant {
                chat_id: chat.id,
                user_id,
                joined_at: now,
            })
            .collect();

        // chat and participants become visible together
        let stored = conn
            .transaction::<_, RepositoryError, _>(|conn| {
                async move {
                    let stored = diesel::insert_into(chats::table)
                        .values(&chat)
                        .returning(Chat::as_returning())
                        .get_result(conn)
                        .await?;

                    diesel::insert_into(chat_participants::table)
                        .values(&members)
                        .execute(conn)
                        .await?;

                    Ok(stored)
                }
                .scope_boxed()
            })
            .await?;

        Ok(stored)
    }

    async fn find_direct_chat(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> RepositoryResult<Option<Chat>> {
        let mut conn = self.pool.get().await?;

        let result: Option<Chat> = chats::table
            .filter(chats::direct_key.eq(direct_chat_key(user_a, user_b)))
            .select(Chat::as_select())
            .first(&mut *conn)
            .await
            .optional()?;

        Ok(result)
    }

    async fn find_or_create_direct_chat(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> RepositoryResult<(Chat, bool)> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now();
        let key = direct_chat_key(user_a, user_b);
        let chat = Chat {
            id: Uuid::new_v4(),
            chat_type: DIRECT_CHAT_TYPE.to_string(),
            name: None,
            direct_key: Some(key.clone()),
            created_at: now,
        };
        let members: Vec<ChatParticipant> = [user_a, user_b]
            .into_iter()
            .map(|user_id| ChatParticipant {
                chat_id: chat.id,
                user_id,
                joined_at: now,
            })
            .collect();

        // the unique direct_key turns a concurrent insert into a no-op,
        // the loser then reads the winner's row
        let result = conn
            .transaction::<_, RepositoryError, _>(|conn| {
                async move {
                    let inserted: Option<Chat> = diesel::insert_into(chats::table)
                        .values(&chat)
                        .on_conflict(chats::direct_key)
                        .do_nothing()
                        .returning(Chat::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?;

                    match inserted {
                        Some(created) => {
                            diesel::insert_into(chat_participants::table)
                                .values(&members)
                                .execute(conn)
                                .await?;
                            Ok((created, true))
                        }
                        None => {
                            let existing = chats::table
                                .filter(chats::direct_key.eq(&key))
                                .select(Chat::as_select())
                                .first(conn)
                                .await?;
                            Ok((existing, false))
                        }
                    }
                }
                .scope_boxed()
            })
            .await?;

        Ok(result)
    }

    async fn list_participants(&self, chat_ids: &[Uuid]) -> RepositoryResult<Vec<ChatParticipant>> {
        if chat_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.pool.get().await?;

        let results: Vec<ChatParticipant> = chat_participants::table
            .filter(chat_participants::chat_id.eq_any(chat_ids.to_vec()))
            .order((
                chat_participants::chat_id.asc(),
                chat_participants::joined_at.asc(),
            ))
            .select(ChatParticipant::as_select())
            .load(&mut *conn)
            .await?;

        Ok(results)
    }

    async fn fetch_chats(
        &self,
        user_id: Uuid,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Chat>> {
        let mut conn = self.pool.get().await?;

        let query = chats::table
            .inner_join(chat_participants::table)
            .filter(chat_participants::user_id.eq(user_id))
            .select(Chat::as_select())
            .into_boxed();

        let results: Vec<Chat> = keyset_window!(query, chats::created_at, chats::id, window)
            .load(&mut *conn)
            .await?;

        Ok(results)
    }

    // ============ Messages ============

    async fn create_message(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> RepositoryResult<Message> {
        let mut conn = self.pool.get().await?;

        let message = Message {
            id: Uuid::new_v4(),
            chat_id,
            user_id,
            content: content.to_string(),
            sent_at: Utc::now(),
            is_deleted: false,
        };

        let stored = diesel::insert_into(messages::table)
            .values(&message)
            .returning(Message::as_returning())
            .get_result(&mut *conn)
            .await?;

        Ok(stored)
    }

    async fn get_message(&self, id: Uuid) -> RepositoryResult<Option<Message>> {
        let mut conn = self.pool.get().await?;

        let result: Option<Message> = messages::table
            .filter(messages::id.eq(id))
            .select(Message::as_select())
            .first(&mut *conn)
            .await
            .optional()?;

        Ok(result)
    }

    async fn delete_message(&self, id: Uuid) -> RepositoryResult<bool> {
        let mut conn = self.pool.get().await?;

        let hidden = diesel::update(
            messages::table
                .filter(messages::id.eq(id))
                .filter(messages::is_deleted.eq(false)),
        )
        .set(messages::is_deleted.eq(true))
        .execute(&mut *conn)
        .await?;

        Ok(hidden > 0)
    }

    async fn fetch_messages(
        &self,
        chat_id: Uuid,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Message>> {
        let mut conn = self.pool.get().await?;

        let query = messages::table
            .filter(messages::chat_id.eq(chat_id))
            .filter(messages::is_deleted.eq(false))
            .select(Message::as_select())
            .into_boxed();

        let results: Vec<Message> =
            keyset_window!(query, messages::sent_at, messages::id, window)
                .load(&mut *conn)
                .await?;

        Ok(results)
    }

    // ============ Reactions ============

    async fn upsert_reaction(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
        target_id: Uuid,
        kind: ReactionType,
    ) -> RepositoryResult<Reaction> {
        let mut conn = self.pool.get().await?;

        let reaction = Reaction::new(user_id, target, target_id, kind);

        let stored = diesel::insert_into(reactions::table)
            .values(&reaction)
            .on_conflict((
                reactions::user_id,
                reactions::target_type,
                reactions::target_id,
            ))
            .do_update()
            .set(reactions::reaction_type.eq(kind.code()))
            .returning(Reaction::as_returning())
            .get_result(&mut *conn)
            .await?;

        Ok(stored)
    }

    async fn delete_reaction(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
        target_id: Uuid,
    ) -> RepositoryResult<bool> {
        let mut conn = self.pool.get().await?;

        let deleted = diesel::delete(
            reactions::table
                .filter(reactions::user_id.eq(user_id))
                .filter(reactions::target_type.eq(target.as_str()))
                .filter(reactions::target_id.eq(target_id)),
        )
        .execute(&mut *conn)
        .await?;

        Ok(deleted > 0)
    }

    async fn fetch_reactions(
        &self,
        target: ReactionTarget,
        target_id: Uuid,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Reaction>> {
        let mut conn = self.pool.get().await?;

        let query = reactions::table
            .filter(reactions::target_type.eq(target.as_str()))
            .filter(reactions::target_id.eq(target_id))
            .select(Reaction::as_select())
            .into_boxed();

        let results: Vec<Reaction> =
            keyset_window!(query, reactions::created_at, reactions::id, window)
                .load(&mut *conn)
                .await?;

        Ok(results)
    }

    async fn count_reactions(
        &self,
        target: ReactionTarget,
        target_ids: &[Uuid],
    ) -> RepositoryResult<HashMap<Uuid, ReactionCounts>> {
        if target_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.pool.get().await?;

        let rows: Vec<(Uuid, i16, i64)> = reactions::table
            .filter(reactions::target_type.eq(target.as_str()))
            .filter(reactions::target_id.eq_any(target_ids.to_vec()))
            .group_by((reactions::target_id, reactions::reaction_type))
            .select((
                reactions::target_id,
                reactions::reaction_type,
                diesel::dsl::count_star(),
            ))
            .load(&mut *conn)
            .await?;

        let mut counts: HashMap<Uuid, ReactionCounts> = HashMap::new();
        for (target_id, code, count) in rows {
            if let Some(kind) = ReactionType::from_code(code) {
                counts.entry(target_id).or_default().add(kind, count);
            }
        }

        Ok(counts)
    }

    async fn user_reactions(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
        target_ids: &[Uuid],
    ) -> RepositoryResult<HashMap<Uuid, ReactionType>> {
        if target_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.pool.get().await?;

        let rows: Vec<(Uuid, i16)> = reactions::table
            .filter(reactions::user_id.eq(user_id))
            .filter(reactions::target_type.eq(target.as_str()))
            .filter(reactions::target_id.eq_any(target_ids.to_vec()))
            .select((reactions::target_id, reactions::reaction_type))
            .load(&mut *conn)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(target_id, code)| {
                ReactionType::from_code(code).map(|kind| (target_id, kind))
            })
            .collect())
    }
}
