//! Services module for the social backend
//!
//! Every list operation goes through the shared [`Paginator`](crate::pagination::Paginator), so all list
//! endpoints treat cursors, page sizes and cancellation identically.

pub mod chats;
pub mod comments;
pub mod feed;
pub mod health;
pub mod reactions;
pub mod users;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::extract::FromRef;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    config::PaginationConfig,
    data::SocialRepository,
    error::{Error, Result},
    models::{ReactionSummary, ReactionTarget, User, UserSummary},
};

#[derive(Clone)]
pub struct Services {
    pub repository: Arc<dyn SocialRepository>,
    pub pagination: PaginationConfig,
    pub feed: Arc<feed::FeedService>,
    pub comments: Arc<comments::CommentService>,
    pub chats: Arc<chats::ChatService>,
    pub reactions: Arc<reactions::ReactionService>,
    pub users: Arc<users::UserService>,
    pub health: Arc<health::HealthService>,
}

impl Services {
    /// Builds every service on top of `repository`
    ///
    /// `shutdown` is handed to the paginator calls: once cancelled, in-flight
    /// list requests fail with 503 instead of returning partial pages.
    pub fn new(
        repository: Arc<dyn SocialRepository>,
        pagination: PaginationConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let paginator = pagination.paginator();

        let feed = Arc::new(feed::FeedService::new(
            repository.clone(),
            paginator.clone(),
            shutdown.clone(),
        ));
        let comments = Arc::new(comments::CommentService::new(
            repository.clone(),
            paginator.clone(),
            shutdown.clone(),
        ));
        let chats = Arc::new(chats::ChatService::new(
            repository.clone(),
            paginator.clone(),
            shutdown.clone(),
        ));
        let reactions = Arc::new(reactions::ReactionService::new(
            repository.clone(),
            paginator,
            shutdown,
        ));
        let users = Arc::new(users::UserService::new(repository.clone()));
        let health = Arc::new(health::HealthService::new(repository.clone()));

        Self {
            repository,
            pagination,
            feed,
            comments,
            chats,
            reactions,
            users,
            health,
        }
    }
}

#[cfg(feature = "mocks")]
impl Services {
    /// Services backed by the seeded in-memory repository
    pub fn mocks() -> Self {
        use crate::data::InMemoryRepository;

        Self::new(
            Arc::new(InMemoryRepository::seeded()),
            PaginationConfig::default(),
            CancellationToken::new(),
        )
    }
}

impl FromRef<Services> for PaginationConfig {
    fn from_ref(services: &Services) -> Self {
        services.pagination.clone()
    }
}

/// Resolves the caller, rejecting ids with no matching account
pub(crate) async fn require_user(repository: &dyn SocialRepository, id: Uuid) -> Result<User> {
    repository
        .get_user(id)
        .await?
        .ok_or_else(|| Error::Unauthorized(format!("Unknown user {id}")))
}

/// Only the author of a post, comment or message may change it
pub(crate) fn require_author(author_id: Uuid, user_id: Uuid, what: &str) -> Result<()> {
    if author_id != user_id {
        return Err(Error::Forbidden(format!("Only the author can modify this {what}")));
    }
    Ok(())
}

/// Trimmed, non-empty text content
pub(crate) fn require_content<'a>(content: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}

/// Summaries for the given user ids, in one repository round trip
pub(crate) async fn user_summaries(
    repository: &dyn SocialRepository,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, UserSummary>> {
    let unique: Vec<Uuid> = ids.into_iter().collect::<HashSet<_>>().into_iter().collect();

    let users = repository.get_users(&unique).await?;
    Ok(users
        .iter()
        .map(|user| (user.id, UserSummary::from(user)))
        .collect())
}

/// Reaction totals of each target plus the reaction `viewer` left on it
///
/// Every id in `target_ids` gets an entry, zeroed when nobody reacted.
pub(crate) async fn reaction_summaries(
    repository: &dyn SocialRepository,
    target: ReactionTarget,
    target_ids: &[Uuid],
    viewer: Uuid,
) -> Result<HashMap<Uuid, ReactionSummary>> {
    let (counts, own) = futures::try_join!(
        repository.count_reactions(target, target_ids),
        repository.user_reactions(viewer, target, target_ids),
    )?;

    Ok(target_ids
        .iter()
        .map(|id| {
            let summary = ReactionSummary::new(
                counts.get(id).copied().unwrap_or_default(),
                own.get(id).copied(),
            );
            (*id, summary)
        })
        .collect())
}

/// Summary for `id`, falling back to a placeholder for removed accounts
pub(crate) fn summary_of(summaries: &HashMap<Uuid, UserSummary>, id: Uuid) -> UserSummary {
    summaries
        .get(&id)
        .cloned()
        .unwrap_or_else(|| UserSummary::deleted(id))
}
