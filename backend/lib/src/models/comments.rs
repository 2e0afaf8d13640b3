use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{reactions::ReactionSummary, users::UserSummary};
use crate::{
    data::postgres::schema::comments,
    pagination::{Timestamped, TimestampedKey},
};

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    /// `None` for top-level comments
    pub parent_comment_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Timestamped for Comment {
    fn timestamped_key(&self) -> TimestampedKey {
        TimestampedKey::new(self.created_at, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub comment_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub parent_comment_id: Option<Uuid>,
    pub user: UserSummary,
    pub total_replies: i64,
    pub reactions: ReactionSummary,
}

impl CommentDto {
    pub fn from_comment(
        comment: Comment,
        user: UserSummary,
        total_replies: i64,
        reactions: ReactionSummary,
    ) -> Self {
        Self {
            comment_id: comment.id,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            parent_comment_id: comment.parent_comment_id,
            user,
            total_replies,
            reactions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    pub content: String,
}
