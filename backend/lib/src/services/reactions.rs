//! Reactions on posts and comments
//!
//! A user holds at most one reaction per post or comment; reacting again
//! replaces its kind. Reaction lists are paged newest first.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::{reaction_summaries, require_user, summary_of, user_summaries};
use crate::{
    data::{sources::ReactionList, SocialRepository},
    error::{Error, Result},
    models::{ReactRequest, ReactionDto, ReactionSummary, ReactionTarget, ReactionType},
    pagination::{Chronological, Page, PageRequest, PaginationMode, Paginator},
};

/// The post or comment a reaction request addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionSubject {
    Post(Uuid),
    Comment { post_id: Uuid, comment_id: Uuid },
}

impl ReactionSubject {
    fn target(self) -> (ReactionTarget, Uuid) {
        match self {
            Self::Post(post_id) => (ReactionTarget::Post, post_id),
            Self::Comment { comment_id, .. } => (ReactionTarget::Comment, comment_id),
        }
    }
}

pub struct ReactionService {
    repository: Arc<dyn SocialRepository>,
    paginator: Paginator,
    shutdown: CancellationToken,
}

impl ReactionService {
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

    /// Adds or replaces the caller's reaction, returning the updated totals
    pub async fn react(
        &self,
        user_id: Uuid,
        subject: ReactionSubject,
        body: ReactRequest,
    ) -> Result<ReactionSummary> {
        let kind: ReactionType = body.reaction_type.parse().map_err(Error::BadRequest)?;
        let user = require_user(self.repository.as_ref(), user_id).await?;
        self.require_subject(subject).await?;

        let (target, target_id) = subject.target();
        self.repository
            .upsert_reaction(user.id, target, target_id, kind)
            .await?;
        debug!(%target_id, target = target.as_str(), %kind, "Reaction stored");

        self.summary(target, target_id, user.id).await
    }

    /// Removes the caller's reaction; other users' reactions stay
    pub async fn remove_reaction(&self, user_id: Uuid, subject: ReactionSubject) -> Result<()> {
        self.require_subject(subject).await?;

        let (target, target_id) = subject.target();
        if !self
            .repository
            .delete_reaction(user_id, target, target_id)
            .await?
        {
            return Err(Error::NotFound(format!(
                "Reaction of user {user_id} on {} {target_id}",
                target.as_str()
            )));
        }

        debug!(%target_id, target = target.as_str(), "Reaction removed");
        Ok(())
    }

    /// Reactions left on the subject, newest first
    pub async fn list_reactions(
        &self,
        subject: ReactionSubject,
        request: PageRequest,
    ) -> Result<Page<ReactionDto>> {
        self.require_subject(subject).await?;

        let (target, target_id) = subject.target();
        let source = ReactionList {
            repository: self.repository.as_ref(),
            target,
            target_id,
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

        let users = user_summaries(
            self.repository.as_ref(),
            page.items.iter().map(|reaction| reaction.user_id),
        )
        .await?;

        page.try_map(|reaction| {
            let reaction_type = reaction.kind().ok_or_else(|| {
                Error::Database(format!(
                    "reaction {} has unknown type {}",
                    reaction.id, reaction.reaction_type
                ))
            })?;

            Ok(ReactionDto {
                reaction_id: reaction.id,
                reaction_type,
                created_at: reaction.created_at,
                user: summary_of(&users, reaction.user_id),
            })
        })
    }

    /// The post must exist; a comment must also belong to it
    async fn require_subject(&self, subject: ReactionSubject) -> Result<()> {
        let post_id = match subject {
            ReactionSubject::Post(post_id) => post_id,
            ReactionSubject::Comment { post_id, .. } => post_id,
        };

        if self.repository.get_post(post_id).await?.is_none() {
            return Err(Error::NotFound(format!("Post {post_id}")));
        }

        if let ReactionSubject::Comment {
            post_id,
            comment_id,
        } = subject
        {
            match self.repository.get_comment(comment_id).await? {
                Some(comment) if comment.post_id == post_id => {}
                _ => return Err(Error::NotFound(format!("Comment {comment_id}"))),
            }
        }

        Ok(())
    }

    async fn summary(
        &self,
        target: ReactionTarget,
        target_id: Uuid,
        viewer: Uuid,
    ) -> Result<ReactionSummary> {
        let mut summaries =
            reaction_summaries(self.repository.as_ref(), target, &[target_id], viewer).await?;

        Ok(summaries.remove(&target_id).unwrap_or_default())
    }
}
