//! Post feeds
//!
//! - the main feed and user feeds, newest first
//! - the explore feed, oldest first in wrap-around mode: a short last page is
//!   topped up with the oldest posts so explore never runs dry
//! - single posts, edited and deleted by their author only
//!
//! Every post comes back with its comment count and the reaction totals as
//! seen by the viewer.

use std::{collections::HashMap, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    reaction_summaries, require_author, require_content, require_user, summary_of,
    user_summaries,
};
use crate::{
    data::{sources::PostFeed, SocialRepository},
    error::{Error, Result},
    models::{
        CreatePostRequest, Post, PostDto, PostFilter, ReactionSummary, ReactionTarget,
        UpdatePostRequest, UserSummary,
    },
    pagination::{Chronological, Page, PageRequest, PaginationMode, Paginator},
};

pub struct FeedService {
    repository: Arc<dyn SocialRepository>,
    paginator: Paginator,
    shutdown: CancellationToken,
}

/// Lookups needed to turn posts into [`PostDto`]s
struct PostDetails {
    authors: HashMap<Uuid, UserSummary>,
    comments: HashMap<Uuid, i64>,
    reactions: HashMap<Uuid, ReactionSummary>,
}

impl PostDetails {
    fn apply(&self, post: Post) -> PostDto {
        let author = summary_of(&self.authors, post.user_id);
        let comment_count = self.comments.get(&post.id).copied().unwrap_or(0);
        let reactions = self.reactions.get(&post.id).copied().unwrap_or_default();
        PostDto::from_post(post, author, comment_count, reactions)
    }
}

impl FeedService {
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

    /// All posts, newest first
    pub async fn list_posts(&self, viewer: Uuid, request: PageRequest) -> Result<Page<PostDto>> {
        self.page(
            viewer,
            PostFilter::all(),
            request.descending(),
            PaginationMode::Standard,
        )
        .await
    }

    /// Posts written by `user_id`, newest first
    pub async fn list_user_posts(
        &self,
        viewer: Uuid,
        user_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<PostDto>> {
        if self.repository.get_user(user_id).await?.is_none() {
            return Err(Error::NotFound(format!("User {user_id}")));
        }

        self.page(
            viewer,
            PostFilter::by_author(user_id),
            request.descending(),
            PaginationMode::Standard,
        )
        .await
    }

    /// All posts, oldest first, wrapping around at the end of the collection
    pub async fn explore_posts(&self, viewer: Uuid, request: PageRequest) -> Result<Page<PostDto>> {
        self.page(viewer, PostFilter::all(), request, PaginationMode::WrapAround)
            .await
    }

    pub async fn get_post(&self, viewer: Uuid, post_id: Uuid) -> Result<PostDto> {
        let post = self.require_post(post_id).await?;

        let details = self.details(viewer, std::slice::from_ref(&post)).await?;
        Ok(details.apply(post))
    }

    pub async fn create_post(&self, user_id: Uuid, body: CreatePostRequest) -> Result<PostDto> {
        let content = require_content(&body.content, "content")?;
        let author = require_user(self.repository.as_ref(), user_id).await?;

        let post = self.repository.create_post(author.id, content).await?;
        debug!(post_id = %post.id, user_id = %author.id, "Post created");

        Ok(PostDto::from_post(
            post,
            UserSummary::from(&author),
            0,
            ReactionSummary::default(),
        ))
    }

    pub async fn update_post(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        body: UpdatePostRequest,
    ) -> Result<PostDto> {
        let content = require_content(&body.content, "content")?;
        let post = self.require_post(post_id).await?;
        require_author(post.user_id, user_id, "post")?;

        let post = self
            .repository
            .update_post(post_id, content)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Post {post_id}")))?;
        debug!(%post_id, "Post updated");

        let details = self.details(user_id, std::slice::from_ref(&post)).await?;
        Ok(details.apply(post))
    }

    /// Deletes the post together with its comments and reactions
    pub async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let post = self.require_post(post_id).await?;
        require_author(post.user_id, user_id, "post")?;

        if !self.repository.delete_post(post_id).await? {
            return Err(Error::NotFound(format!("Post {post_id}")));
        }

        info!(%post_id, "Post deleted");
        Ok(())
    }

    async fn require_post(&self, post_id: Uuid) -> Result<Post> {
        self.repository
            .get_post(post_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Post {post_id}")))
    }

    async fn page(
        &self,
        viewer: Uuid,
        filter: PostFilter,
        request: PageRequest,
        mode: PaginationMode,
    ) -> Result<Page<PostDto>> {
        let source = PostFeed {
            repository: self.repository.as_ref(),
            filter,
        };

        let page = self
            .paginator
            .paginate_cancellable(&source, &Chronological, &request, mode, &self.shutdown)
            .await?;

        let details = self.details(viewer, &page.items).await?;
        Ok(page.map(|post| details.apply(post)))
    }

    async fn details(&self, viewer: Uuid, posts: &[Post]) -> Result<PostDetails> {
        let ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
        let repository = self.repository.as_ref();

        let (authors, comments, reactions) = futures::try_join!(
            user_summaries(repository, posts.iter().map(|post| post.user_id)),
            async { repository.count_comments(&ids).await.map_err(Error::from) },
            reaction_summaries(repository, ReactionTarget::Post, &ids, viewer),
        )?;

        Ok(PostDetails {
            authors,
            comments,
            reactions,
        })
    }
}
