//! In-memory repository implementation.
//!
//! Mimics the PostgreSQL repository without a database: used in mock mode and
//! by tests. Keyset windows are applied with [`KeyWindow::select`] over the
//! [`Chronological`] keyset, which orders rows the same way the SQL queries do.
//!
//! Timestamps come from a monotonic clock with microsecond steps so that rows
//! created one after the other never share a timestamp by accident. Tests that
//! need ties insert posts with explicit timestamps through
//! [`InMemoryRepository::insert_post`].

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    error::{RepositoryError, RepositoryResult},
    SocialRepository,
};
use crate::{
    constants::api::DIRECT_CHAT_TYPE,
    models::{
        direct_chat_key, Chat, ChatParticipant, Comment, Message, Post, PostFilter, Reaction,
        ReactionCounts, ReactionTarget, ReactionType, User,
    },
    pagination::{Chronological, KeyWindow, TimestampedKey},
};

/// In-memory repository using `RwLock`-protected tables
pub struct InMemoryRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    posts: Arc<RwLock<HashMap<Uuid, Post>>>,
    comments: Arc<RwLock<HashMap<Uuid, Comment>>>,
    chats: Arc<RwLock<HashMap<Uuid, Chat>>>,
    participants: Arc<RwLock<Vec<ChatParticipant>>>,
    messages: Arc<RwLock<HashMap<Uuid, Message>>>,
    reactions: Arc<RwLock<HashMap<Uuid, Reaction>>>,
    /// Microseconds since the epoch handed out to the next created row
    clock: Arc<AtomicI64>,
}

impl InMemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            posts: Arc::new(RwLock::new(HashMap::new())),
            comments: Arc::new(RwLock::new(HashMap::new())),
            chats: Arc::new(RwLock::new(HashMap::new())),
            participants: Arc::new(RwLock::new(Vec::new())),
            messages: Arc::new(RwLock::new(HashMap::new())),
            reactions: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(AtomicI64::new(Utc::now().timestamp_micros())),
        }
    }

    /// Next timestamp of the monotonic clock
    fn now(&self) -> DateTime<Utc> {
        let micros = self.clock.fetch_add(1, Ordering::SeqCst);
        DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)
    }

    /// Stores `post` as is, keeping its id and timestamp
    pub async fn insert_post(&self, post: Post) {
        self.posts.write().await.insert(post.id, post);
    }

    async fn chat_ids_of(&self, user_id: Uuid) -> Vec<Uuid> {
        self.participants
            .read()
            .await
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.chat_id)
            .collect()
    }

    fn new_chat(&self, chat_type: &str, name: Option<&str>, direct_key: Option<String>) -> Chat {
        Chat {
            id: Uuid::new_v4(),
            chat_type: chat_type.to_string(),
            name: name.map(str::to_string),
            direct_key,
            created_at: self.now(),
        }
    }
}

/// `true` for reactions left on `target_id`
fn reacts_to(reaction: &Reaction, target: ReactionTarget, target_id: Uuid) -> bool {
    reaction.target_type == target.as_str() && reaction.target_id == target_id
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "mocks")]
impl InMemoryRepository {
    /// Repository pre-populated with the demo fixtures served in mock mode
    ///
    /// Seeds three users with [`DEMO_POSTS_PER_USER`] posts each, a comment
    /// thread and two reactions on the newest post and a direct chat between
    /// Alice and Bob with [`DEMO_MESSAGES`] messages.
    ///
    /// [`DEMO_POSTS_PER_USER`]: crate::constants::mocks::DEMO_POSTS_PER_USER
    /// [`DEMO_MESSAGES`]: crate::constants::mocks::DEMO_MESSAGES
    pub fn seeded() -> Self {
        use crate::constants::mocks::{
            DEMO_ALICE_ID, DEMO_BOB_ID, DEMO_CAROL_ID, DEMO_MESSAGES, DEMO_POSTS_PER_USER,
        };

        let repository = Self::new();

        let users: HashMap<Uuid, User> = [
            (DEMO_ALICE_ID, "alice"),
            (DEMO_BOB_ID, "bob"),
            (DEMO_CAROL_ID, "carol"),
        ]
        .into_iter()
        .map(|(id, username)| {
            let user = User {
                id,
                username: username.to_string(),
                created_at: repository.now(),
            };
            (id, user)
        })
        .collect();

        let mut posts = HashMap::new();
        let mut newest = None;
        for round in 0..DEMO_POSTS_PER_USER {
            for (author, name) in [
                (DEMO_ALICE_ID, "alice"),
                (DEMO_BOB_ID, "bob"),
                (DEMO_CAROL_ID, "carol"),
            ] {
                let post = Post {
                    id: Uuid::new_v4(),
                    user_id: author,
                    content: format!("Post #{} by {}", round + 1, name),
                    created_at: repository.now(),
                    updated_at: None,
                };
                newest = Some(post.id);
                posts.insert(post.id, post);
            }
        }

        let mut comments = HashMap::new();
        let mut reactions = HashMap::new();
        if let Some(post_id) = newest {
            let root = Comment {
                id: Uuid::new_v4(),
                post_id,
                user_id: DEMO_ALICE_ID,
                parent_comment_id: None,
                content: "First!".to_string(),
                created_at: repository.now(),
                updated_at: None,
            };
            let reply = Comment {
                id: Uuid::new_v4(),
                post_id,
                user_id: DEMO_BOB_ID,
                parent_comment_id: Some(root.id),
                content: "Welcome".to_string(),
                created_at: repository.now(),
                updated_at: None,
            };
            comments.insert(root.id, root);
            comments.insert(reply.id, reply);

            for (user_id, kind) in [
                (DEMO_BOB_ID, ReactionType::Like),
                (DEMO_CAROL_ID, ReactionType::Love),
            ] {
                let mut reaction = Reaction::new(user_id, ReactionTarget::Post, post_id, kind);
                reaction.created_at = repository.now();
                reactions.insert(reaction.id, reaction);
            }
        }

        let chat = repository.new_chat(
            DIRECT_CHAT_TYPE,
            None,
            Some(direct_chat_key(DEMO_ALICE_ID, DEMO_BOB_ID)),
        );
        let participants = [DEMO_ALICE_ID, DEMO_BOB_ID]
            .into_iter()
            .map(|user_id| ChatParticipant {
                chat_id: chat.id,
                user_id,
                joined_at: chat.created_at,
            })
            .collect();

        let messages = (0..DEMO_MESSAGES)
            .map(|n| {
                let sender = if n % 2 == 0 { DEMO_ALICE_ID } else { DEMO_BOB_ID };
                let message = Message {
                    id: Uuid::new_v4(),
                    chat_id: chat.id,
                    user_id: sender,
                    content: format!("Message {}", n + 1),
                    sent_at: repository.now(),
                    is_deleted: false,
                };
                (message.id, message)
            })
            .collect();

        Self {
            users: Arc::new(RwLock::new(users)),
            posts: Arc::new(RwLock::new(posts)),
            comments: Arc::new(RwLock::new(comments)),
            chats: Arc::new(RwLock::new(HashMap::from([(chat.id, chat)]))),
            participants: Arc::new(RwLock::new(participants)),
            messages: Arc::new(RwLock::new(messages)),
            reactions: Arc::new(RwLock::new(reactions)),
            clock: repository.clock,
        }
    }
}

#[async_trait]
impl SocialRepository for InMemoryRepository {
    async fn test_connection(&self) -> RepositoryResult<()> {
        Ok(())
    }

    // ============ Users ============

    async fn create_user(&self, username: &str) -> RepositoryResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == username) {
            return Err(RepositoryError::invalid_input(format!(
                "username '{}' is taken",
                username
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: self.now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_users(&self, ids: &[Uuid]) -> RepositoryResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    // ============ Posts ============

    async fn create_post(&self, user_id: Uuid, content: &str) -> RepositoryResult<Post> {
        if !self.users.read().await.contains_key(&user_id) {
            return Err(RepositoryError::not_found("User"));
        }

        let post = Post {
            id: Uuid::new_v4(),
            user_id,
            content: content.to_string(),
            created_at: self.now(),
            updated_at: None,
        };
        self.posts.write().await.insert(post.id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> RepositoryResult<Option<Post>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn update_post(&self, id: Uuid, content: &str) -> RepositoryResult<Option<Post>> {
        let mut posts = self.posts.write().await;
        let Some(post) = posts.get_mut(&id) else {
            return Ok(None);
        };

        post.content = content.to_string();
        post.updated_at = Some(self.now());
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: Uuid) -> RepositoryResult<bool> {
        let mut posts = self.posts.write().await;
        let mut comments = self.comments.write().await;
        let mut reactions = self.reactions.write().await;

        if posts.remove(&id).is_none() {
            return Ok(false);
        }

        let removed: Vec<Uuid> = comments
            .values()
            .filter(|c| c.post_id == id)
            .map(|c| c.id)
            .collect();
        comments.retain(|_, c| c.post_id != id);
        reactions.retain(|_, r| {
            !reacts_to(r, ReactionTarget::Post, id)
                && !removed.iter().any(|&c| reacts_to(r, ReactionTarget::Comment, c))
        });

        Ok(true)
    }

    async fn count_comments(&self, post_ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, i64>> {
        let comments = self.comments.read().await;
        let mut counts = HashMap::new();
        for comment in comments.values() {
            if post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn fetch_posts(
        &self,
        filter: PostFilter,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Post>> {
        let posts = self.posts.read().await;
        Ok(window.select(
            posts.values().filter(|p| filter.matches(p)).cloned(),
            &Chronological,
        ))
    }

    // ============ Comments ============

    async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        parent_comment_id: Option<Uuid>,
        content: &str,
    ) -> RepositoryResult<Comment> {
        if !self.posts.read().await.contains_key(&post_id) {
            return Err(RepositoryError::not_found("Post"));
        }

        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            parent_comment_id,
            content: content.to_string(),
            created_at: self.now(),
            updated_at: None,
        };
        self.comments
            .write()
            .await
            .insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> RepositoryResult<Option<Comment>> {
        Ok(self.comments.read().await.get(&id).cloned())
    }

    async fn update_comment(&self, id: Uuid, content: &str) -> RepositoryResult<Option<Comment>> {
        let mut comments = self.comments.write().await;
        let Some(comment) = comments.get_mut(&id) else {
            return Ok(None);
        };

        comment.content = content.to_string();
        comment.updated_at = Some(self.now());
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: Uuid) -> RepositoryResult<bool> {
        let mut comments = self.comments.write().await;
        let mut reactions = self.reactions.write().await;

        if !comments.contains_key(&id) {
            return Ok(false);
        }

        // walk the reply tree breadth first
        let mut subtree = vec![id];
        let mut frontier = vec![id];
        while !frontier.is_empty() {
            frontier = comments
                .values()
                .filter(|c| c.parent_comment_id.is_some_and(|p| frontier.contains(&p)))
                .map(|c| c.id)
                .collect();
            subtree.extend(&frontier);
        }

        comments.retain(|comment_id, _| !subtree.contains(comment_id));
        reactions.retain(|_, r| !subtree.iter().any(|&c| reacts_to(r, ReactionTarget::Comment, c)));

        Ok(true)
    }

    async fn fetch_comments(
        &self,
        post_id: Uuid,
        parent_comment_id: Option<Uuid>,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Comment>> {
        let comments = self.comments.read().await;
        Ok(window.select(
            comments
                .values()
                .filter(|c| c.post_id == post_id && c.parent_comment_id == parent_comment_id)
                .cloned(),
            &Chronological,
        ))
    }

    async fn count_replies(&self, comment_ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, i64>> {
        let comments = self.comments.read().await;
        let mut counts = HashMap::new();
        for parent in comments.values().filter_map(|c| c.parent_comment_id) {
            if comment_ids.contains(&parent) {
                *counts.entry(parent).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    // ============ Chats ============

    async fn create_chat(
        &self,
        chat_type: &str,
        name: Option<&str>,
        participants: &[Uuid],
    ) -> RepositoryResult<Chat> {
        let direct_key = match participants {
            [a, b] if chat_type == DIRECT_CHAT_TYPE => Some(direct_chat_key(*a, *b)),
            _ => None,
        };

        // both locks held so the chat never appears without its participants
        let mut chats = self.chats.write().await;
        let mut members = self.participants.write().await;

        if direct_key.is_some() && chats.values().any(|c| c.direct_key == direct_key) {
            return Err(RepositoryError::invalid_input(
                "a direct chat already exists for these users",
            ));
        }

        let chat = self.new_chat(chat_type, name, direct_key);
        members.extend(participants.iter().map(|&user_id| ChatParticipant {
            chat_id: chat.id,
            user_id,
            joined_at: chat.created_at,
        }));
        chats.insert(chat.id, chat.clone());

        Ok(chat)
    }

    async fn find_direct_chat(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> RepositoryResult<Option<Chat>> {
        let key = direct_chat_key(user_a, user_b);

        let chats = self.chats.read().await;
        Ok(chats
            .values()
            .find(|chat| chat.direct_key.as_deref() == Some(key.as_str()))
            .cloned())
    }

    async fn find_or_create_direct_chat(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> RepositoryResult<(Chat, bool)> {
        let key = direct_chat_key(user_a, user_b);

        // lookup and insert happen under the same write locks
        let mut chats = self.chats.write().await;
        let mut members = self.participants.write().await;

        if let Some(chat) = chats
            .values()
            .find(|chat| chat.direct_key.as_deref() == Some(key.as_str()))
        {
            return Ok((chat.clone(), false));
        }

        let chat = self.new_chat(DIRECT_CHAT_TYPE, None, Some(key));
        members.extend([user_a, user_b].map(|user_id| ChatParticipant {
            chat_id: chat.id,
            user_id,
            joined_at: chat.created_at,
        }));
        chats.insert(chat.id, chat.clone());

        Ok((chat, true))
    }

    async fn list_participants(&self, chat_ids: &[Uuid]) -> RepositoryResult<Vec<ChatParticipant>> {
        let participants = self.participants.read().await;
        Ok(participants
            .iter()
            .filter(|p| chat_ids.contains(&p.chat_id))
            .cloned()
            .collect())
    }

    async fn fetch_chats(
        &self,
        user_id: Uuid,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Chat>> {
        let member_of = self.chat_ids_of(user_id).await;
        let chats = self.chats.read().await;
        Ok(window.select(
            member_of.iter().filter_map(|id| chats.get(id)).cloned(),
            &Chronological,
        ))
    }

    // ============ Messages ============

    async fn create_message(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> RepositoryResult<Message> {
        if !self.chats.read().await.contains_key(&chat_id) {
            return Err(RepositoryError::not_found("Chat"));
        }

        let message = Message {
            id: Uuid::new_v4(),
            chat_id,
            user_id,
            content: content.to_string(),
            sent_at: self.now(),
            is_deleted: false,
        };
        self.messages
            .write()
            .await
            .insert(message.id, message.clone());
        Ok(message)
    }

    async fn get_message(&self, id: Uuid) -> RepositoryResult<Option<Message>> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn delete_message(&self, id: Uuid) -> RepositoryResult<bool> {
        match self.messages.write().await.get_mut(&id) {
            Some(message) if !message.is_deleted => {
                message.is_deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fetch_messages(
        &self,
        chat_id: Uuid,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Message>> {
        let messages = self.messages.read().await;
        Ok(window.select(
            messages
                .values()
                .filter(|m| m.chat_id == chat_id && !m.is_deleted)
                .cloned(),
            &Chronological,
        ))
    }

    // ============ Reactions ============

    async fn upsert_reaction(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
        target_id: Uuid,
        kind: ReactionType,
    ) -> RepositoryResult<Reaction> {
        let mut reactions = self.reactions.write().await;

        if let Some(existing) = reactions
            .values_mut()
            .find(|r| r.user_id == user_id && reacts_to(r, target, target_id))
        {
            existing.reaction_type = kind.code();
            return Ok(existing.clone());
        }

        let mut reaction = Reaction::new(user_id, target, target_id, kind);
        reaction.created_at = self.now();
        reactions.insert(reaction.id, reaction.clone());
        Ok(reaction)
    }

    async fn delete_reaction(
        &self,
        user_id: Uuid,
        target: ReactionTarget,
        target_id: Uuid,
    ) -> RepositoryResult<bool> {
        let mut reactions = self.reactions.write().await;
        let before = reactions.len();
        reactions.retain(|_, r| !(r.user_id == user_id && reacts_to(r, target, target_id)));
        Ok(reactions.len() < before)
    }

    async fn fetch_reactions(
        &self,
        target: ReactionTarget,
        target_id: Uuid,
        window: KeyWindow<TimestampedKey>,
    ) -> RepositoryResult<Vec<Reaction>> {
        let reactions = self.reactions.read().await;
        Ok(window.select(
            reactions
                .values()
                .filter(|r| reacts_to(r, target, target_id))
                .cloned(),
            &Chronological,
        ))
    }

    async fn count_reactions(
        &self,
        target: ReactionTarget,
        target_ids: &[Uuid],
    ) -> RepositoryResult<HashMap<Uuid, ReactionCounts>> {
        let reactions = self.reactions.read().await;
        let mut counts: HashMap<Uuid, ReactionCounts> = HashMap::new();
        for reaction in reactions.values() {
            if reaction.target_type != target.as_str() || !target_ids.contains(&reaction.target_id) {
                continue;
            }
            if let Some(kind) = reaction.kind() {
                counts.entry(reaction.target_id).or_default().add(kind, 1);
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
        let reactions = self.reactions.read().await;
        Ok(reactions
            .values()
            .filter(|r| {
                r.user_id == user_id
                    && r.target_type == target.as_str()
                    && target_ids.contains(&r.target_id)
            })
            .filter_map(|r| r.kind().map(|kind| (r.target_id, kind)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{
            api::GROUP_CHAT_TYPE,
            test::{content, users},
        },
        pagination::{Direction, Timestamped},
    };

    #[tokio::test]
    async fn test_created_rows_get_increasing_timestamps() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();

        let first = repo.create_post(alice.id, "one").await.unwrap();
        let second = repo.create_post(alice.id, "two").await.unwrap();

        assert!(second.created_at > first.created_at);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = InMemoryRepository::new();
        repo.create_user(users::ALICE).await.unwrap();

        let err = repo.create_user(users::ALICE).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_fetch_posts_applies_window_and_filter() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let bob = repo.create_user(users::BOB).await.unwrap();

        let mut alice_posts = Vec::new();
        for n in 0..4 {
            alice_posts.push(repo.create_post(alice.id, &format!("a{n}")).await.unwrap());
            repo.create_post(bob.id, &format!("b{n}")).await.unwrap();
        }

        let window = KeyWindow::new(Direction::Descending, 2).after(alice_posts[3].timestamped_key());
        let page = repo
            .fetch_posts(PostFilter::by_author(alice.id), window)
            .await
            .unwrap();

        assert_eq!(page, vec![alice_posts[2].clone(), alice_posts[1].clone()]);
    }

    #[tokio::test]
    async fn test_timestamp_ties_ordered_by_id() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let at = Utc::now();

        for id in [3_u128, 1, 2] {
            repo.insert_post(Post {
                id: Uuid::from_u128(id),
                user_id: alice.id,
                content: content::POST_CONTENT.to_string(),
                created_at: at,
                updated_at: None,
            })
            .await;
        }

        let boundary = TimestampedKey::new(at, Uuid::from_u128(1));
        let ascending = repo
            .fetch_posts(
                PostFilter::all(),
                KeyWindow::new(Direction::Ascending, 10).after(boundary),
            )
            .await
            .unwrap();
        let ids: Vec<_> = ascending.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(2), Uuid::from_u128(3)]);

        let descending = repo
            .fetch_posts(PostFilter::all(), KeyWindow::new(Direction::Descending, 10))
            .await
            .unwrap();
        let ids: Vec<_> = descending.iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec![Uuid::from_u128(3), Uuid::from_u128(2), Uuid::from_u128(1)]
        );
    }

    #[tokio::test]
    async fn test_fetch_comments_separates_threads() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let post = repo.create_post(alice.id, content::POST_CONTENT).await.unwrap();

        let root = repo
            .create_comment(post.id, alice.id, None, content::COMMENT_CONTENT)
            .await
            .unwrap();
        let reply = repo
            .create_comment(post.id, alice.id, Some(root.id), content::COMMENT_CONTENT)
            .await
            .unwrap();

        let top = repo
            .fetch_comments(post.id, None, KeyWindow::new(Direction::Ascending, 10))
            .await
            .unwrap();
        let replies = repo
            .fetch_comments(post.id, Some(root.id), KeyWindow::new(Direction::Ascending, 10))
            .await
            .unwrap();
        let counts = repo.count_replies(&[root.id, reply.id]).await.unwrap();

        assert_eq!(top, vec![root.clone()]);
        assert_eq!(replies, vec![reply.clone()]);
        assert_eq!(counts.get(&root.id), Some(&1));
        assert_eq!(counts.get(&reply.id), None);
    }

    #[tokio::test]
    async fn test_delete_post_removes_comments() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let post = repo.create_post(alice.id, content::POST_CONTENT).await.unwrap();
        let comment = repo
            .create_comment(post.id, alice.id, None, content::COMMENT_CONTENT)
            .await
            .unwrap();
        repo.upsert_reaction(alice.id, ReactionTarget::Post, post.id, ReactionType::Like)
            .await
            .unwrap();
        repo.upsert_reaction(alice.id, ReactionTarget::Comment, comment.id, ReactionType::Wow)
            .await
            .unwrap();

        assert!(repo.delete_post(post.id).await.unwrap());
        assert!(!repo.delete_post(post.id).await.unwrap());

        let comments = repo
            .fetch_comments(post.id, None, KeyWindow::new(Direction::Ascending, 10))
            .await
            .unwrap();
        assert!(comments.is_empty());
        assert!(repo.reactions.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_find_direct_chat_ignores_group_chats() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let bob = repo.create_user(users::BOB).await.unwrap();
        let carol = repo.create_user(users::CAROL).await.unwrap();

        repo.create_chat(GROUP_CHAT_TYPE, Some("friends"), &[alice.id, bob.id, carol.id])
            .await
            .unwrap();
        assert_eq!(repo.find_direct_chat(alice.id, bob.id).await.unwrap(), None);

        let direct = repo
            .create_chat(DIRECT_CHAT_TYPE, None, &[alice.id, bob.id])
            .await
            .unwrap();
        assert_eq!(
            repo.find_direct_chat(bob.id, alice.id).await.unwrap(),
            Some(direct)
        );
        assert_eq!(repo.find_direct_chat(alice.id, carol.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_deleted_messages_are_hidden() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let bob = repo.create_user(users::BOB).await.unwrap();
        let chat = repo
            .create_chat(DIRECT_CHAT_TYPE, None, &[alice.id, bob.id])
            .await
            .unwrap();

        let kept = repo
            .create_message(chat.id, alice.id, content::MESSAGE_CONTENT)
            .await
            .unwrap();
        let hidden = repo
            .create_message(chat.id, bob.id, content::MESSAGE_CONTENT)
            .await
            .unwrap();
        assert!(repo.delete_message(hidden.id).await.unwrap());
        assert!(!repo.delete_message(hidden.id).await.unwrap());
        assert_eq!(repo.get_message(hidden.id).await.unwrap().map(|m| m.is_deleted), Some(true));

        let messages = repo
            .fetch_messages(chat.id, KeyWindow::new(Direction::Ascending, 10))
            .await
            .unwrap();
        assert_eq!(messages, vec![kept]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_messages_share_one_direct_chat() {
        let repo = Arc::new(InMemoryRepository::new());
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let bob = repo.create_user(users::BOB).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let repo = repo.clone();
                let (from, to) = if n % 2 == 0 {
                    (alice.id, bob.id)
                } else {
                    (bob.id, alice.id)
                };
                tokio::spawn(async move { repo.find_or_create_direct_chat(from, to).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        let chat_id = results[0].0.id;
        assert!(results.iter().all(|(chat, _)| chat.id == chat_id));
        assert_eq!(results.iter().filter(|(_, created)| *created).count(), 1);
        assert_eq!(repo.list_participants(&[chat_id]).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_direct_chat_for_a_pair_rejected() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let bob = repo.create_user(users::BOB).await.unwrap();

        let (chat, created) = repo.find_or_create_direct_chat(alice.id, bob.id).await.unwrap();
        assert!(created);

        let err = repo
            .create_chat(DIRECT_CHAT_TYPE, None, &[bob.id, alice.id])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidInput(_)));
        assert_eq!(repo.find_direct_chat(bob.id, alice.id).await.unwrap(), Some(chat));
    }

    #[tokio::test]
    async fn test_update_post_stamps_updated_at() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let post = repo.create_post(alice.id, "draft").await.unwrap();
        assert_eq!(post.updated_at, None);

        let updated = repo.update_post(post.id, "final").await.unwrap().unwrap();
        assert_eq!(updated.content, "final");
        assert!(updated.updated_at.unwrap() > post.created_at);
        assert_eq!(updated.created_at, post.created_at);

        assert_eq!(repo.update_post(Uuid::new_v4(), "x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_comment_removes_reply_tree_and_reactions() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let post = repo.create_post(alice.id, content::POST_CONTENT).await.unwrap();

        let root = repo
            .create_comment(post.id, alice.id, None, content::COMMENT_CONTENT)
            .await
            .unwrap();
        let reply = repo
            .create_comment(post.id, alice.id, Some(root.id), content::COMMENT_CONTENT)
            .await
            .unwrap();
        let nested = repo
            .create_comment(post.id, alice.id, Some(reply.id), content::COMMENT_CONTENT)
            .await
            .unwrap();
        let sibling = repo
            .create_comment(post.id, alice.id, None, content::COMMENT_CONTENT)
            .await
            .unwrap();
        repo.upsert_reaction(alice.id, ReactionTarget::Comment, nested.id, ReactionType::Sad)
            .await
            .unwrap();

        assert!(repo.delete_comment(root.id).await.unwrap());
        assert!(!repo.delete_comment(root.id).await.unwrap());

        for gone in [root.id, reply.id, nested.id] {
            assert_eq!(repo.get_comment(gone).await.unwrap(), None);
        }
        assert_eq!(repo.get_comment(sibling.id).await.unwrap(), Some(sibling));
        assert!(repo
            .fetch_reactions(
                ReactionTarget::Comment,
                nested.id,
                KeyWindow::new(Direction::Ascending, 10)
            )
            .await
            .unwrap()
            .is_empty());
        assert_eq!(repo.count_comments(&[post.id]).await.unwrap().get(&post.id), Some(&1));
    }

    #[tokio::test]
    async fn test_reaction_upsert_replaces_kind() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let post = repo.create_post(alice.id, content::POST_CONTENT).await.unwrap();

        let first = repo
            .upsert_reaction(alice.id, ReactionTarget::Post, post.id, ReactionType::Like)
            .await
            .unwrap();
        let second = repo
            .upsert_reaction(alice.id, ReactionTarget::Post, post.id, ReactionType::Angry)
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.kind(), Some(ReactionType::Angry));

        let counts = repo
            .count_reactions(ReactionTarget::Post, &[post.id])
            .await
            .unwrap();
        assert_eq!(counts[&post.id].total(), 1);
        assert_eq!(counts[&post.id].angry, 1);

        // same id as a comment target is a different reaction
        assert!(repo
            .count_reactions(ReactionTarget::Comment, &[post.id])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_reaction_only_removes_own() {
        let repo = InMemoryRepository::new();
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let bob = repo.create_user(users::BOB).await.unwrap();
        let post = repo.create_post(alice.id, content::POST_CONTENT).await.unwrap();

        for user in [alice.id, bob.id] {
            repo.upsert_reaction(user, ReactionTarget::Post, post.id, ReactionType::Like)
                .await
                .unwrap();
        }

        assert!(repo
            .delete_reaction(alice.id, ReactionTarget::Post, post.id)
            .await
            .unwrap());
        assert!(!repo
            .delete_reaction(alice.id, ReactionTarget::Post, post.id)
            .await
            .unwrap());

        let left = repo
            .user_reactions(bob.id, ReactionTarget::Post, &[post.id])
            .await
            .unwrap();
        assert_eq!(left.get(&post.id), Some(&ReactionType::Like));
        assert!(repo
            .user_reactions(alice.id, ReactionTarget::Post, &[post.id])
            .await
            .unwrap()
            .is_empty());
    }

    #[cfg(feature = "mocks")]
    #[tokio::test]
    async fn test_seeded_repository_has_demo_data() {
        use crate::constants::mocks::{DEMO_ALICE_ID, DEMO_BOB_ID, DEMO_MESSAGES, DEMO_POSTS_PER_USER};

        let repo = InMemoryRepository::seeded();

        let posts = repo
            .fetch_posts(PostFilter::by_author(DEMO_ALICE_ID), KeyWindow::new(Direction::Ascending, 100))
            .await
            .unwrap();
        assert_eq!(posts.len(), DEMO_POSTS_PER_USER);

        let chat = repo
            .find_direct_chat(DEMO_ALICE_ID, DEMO_BOB_ID)
            .await
            .unwrap()
            .expect("demo chat exists");
        let messages = repo
            .fetch_messages(chat.id, KeyWindow::new(Direction::Ascending, 100))
            .await
            .unwrap();
        assert_eq!(messages.len(), DEMO_MESSAGES);
    }
}
