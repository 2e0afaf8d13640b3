//! Comment threads
//!
//! Comments form a tree: top-level comments have no parent, replies point to a
//! comment of the same post. Each level is paged separately, newest first.
//! Deleting a comment deletes its whole reply subtree.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    reaction_summaries, require_author, require_content, require_user, summary_of,
    user_summaries,
};
use crate::{
    data::{sources::CommentThread, SocialRepository},
    error::{Error, Result},
    models::{
        Comment, CommentDto, CreateCommentRequest, ReactionSummary, ReactionTarget,
        UpdateCommentRequest, UserSummary,
    },
    pagination::{Chronological, Page, PageRequest, PaginationMode, Paginator},
};

pub struct CommentService {
    repository: Arc<dyn SocialRepository>,
    paginator: Paginator,
    shutdown: CancellationToken,
}

impl CommentService {
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

    /// Comments of `post_id` directly under `parent_comment_id`, newest first
    pub async fn list_comments(
        &self,
        viewer: Uuid,
        post_id: Uuid,
        parent_comment_id: Option<Uuid>,
        request: PageRequest,
    ) -> Result<Page<CommentDto>> {
        self.require_post(post_id).await?;
        if let Some(parent) = parent_comment_id {
            self.require_parent(post_id, parent).await?;
        }

        let source = CommentThread {
            repository: self.repository.as_ref(),
            post_id,
            parent_comment_id,
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

        self.with_details(viewer, page).await
    }

    /// A single comment of `post_id`
    pub async fn get_comment(
        &self,
        viewer: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<CommentDto> {
        let comment = self.require_comment(post_id, comment_id).await?;
        self.single(viewer, comment).await
    }

    pub async fn create_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        body: CreateCommentRequest,
    ) -> Result<CommentDto> {
        let content = require_content(&body.content, "content")?;
        let author = require_user(self.repository.as_ref(), user_id).await?;

        self.require_post(post_id).await?;
        if let Some(parent) = body.parent_comment_id {
            self.require_parent(post_id, parent).await?;
        }

        let comment = self
            .repository
            .create_comment(post_id, author.id, body.parent_comment_id, content)
            .await?;
        debug!(comment_id = %comment.id, %post_id, "Comment created");

        Ok(CommentDto::from_comment(
            comment,
            UserSummary::from(&author),
            0,
            ReactionSummary::default(),
        ))
    }

    pub async fn update_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
        body: UpdateCommentRequest,
    ) -> Result<CommentDto> {
        let content = require_content(&body.content, "content")?;
        let comment = self.require_comment(post_id, comment_id).await?;
        require_author(comment.user_id, user_id, "comment")?;

        let comment = self
            .repository
            .update_comment(comment_id, content)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Comment {comment_id}")))?;
        debug!(%comment_id, %post_id, "Comment updated");

        self.single(user_id, comment).await
    }

    /// Deletes the comment, its replies and their reactions
    pub async fn delete_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<()> {
        let comment = self.require_comment(post_id, comment_id).await?;
        require_author(comment.user_id, user_id, "comment")?;

        if !self.repository.delete_comment(comment_id).await? {
            return Err(Error::NotFound(format!("Comment {comment_id}")));
        }

        info!(%comment_id, %post_id, "Comment deleted");
        Ok(())
    }

    async fn require_post(&self, post_id: Uuid) -> Result<()> {
        match self.repository.get_post(post_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("Post {post_id}"))),
        }
    }

    /// The comment must exist and belong to `post_id`
    async fn require_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Comment> {
        self.require_post(post_id).await?;

        match self.repository.get_comment(comment_id).await? {
            Some(comment) if comment.post_id == post_id => Ok(comment),
            _ => Err(Error::NotFound(format!(
                "Comment {comment_id} on post {post_id}"
            ))),
        }
    }

    /// The parent must exist and hang off the same post
    async fn require_parent(&self, post_id: Uuid, parent: Uuid) -> Result<Comment> {
        let comment = self
            .repository
            .get_comment(parent)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Comment {parent}")))?;

        if comment.post_id != post_id {
            return Err(Error::BadRequest(format!(
                "Comment {parent} does not belong to post {post_id}"
            )));
        }

        Ok(comment)
    }

    async fn single(&self, viewer: Uuid, comment: Comment) -> Result<CommentDto> {
        let page = self
            .with_details(viewer, Page::new(vec![comment], None, false))
            .await?;

        page.items.into_iter().next().ok_or(Error::Internal)
    }

    async fn with_details(&self, viewer: Uuid, page: Page<Comment>) -> Result<Page<CommentDto>> {
        let ids: Vec<Uuid> = page.items.iter().map(|comment| comment.id).collect();
        let repository = self.repository.as_ref();

        let (authors, replies, reactions) = futures::try_join!(
            user_summaries(repository, page.items.iter().map(|comment| comment.user_id)),
            async { repository.count_replies(&ids).await.map_err(Error::from) },
            reaction_summaries(repository, ReactionTarget::Comment, &ids, viewer),
        )?;

        Ok(page.map(|comment| {
            let author = summary_of(&authors, comment.user_id);
            let total_replies = replies.get(&comment.id).copied().unwrap_or(0);
            let reactions = reactions.get(&comment.id).copied().unwrap_or_default();
            CommentDto::from_comment(comment, author, total_replies, reactions)
        }))
    }
}
