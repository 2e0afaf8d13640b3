//! This module contains the handlers for the comment endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::extract::CurrentUser,
    error::Error,
    models::{CreateCommentRequest, UpdateCommentRequest},
    pagination::PageRequest,
    services::Services,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    /// List replies to this comment instead of top-level comments
    pub parent_comment_id: Option<Uuid>,
}

pub async fn list_comments(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(post_id): Path<Uuid>,
    Query(query): Query<CommentsQuery>,
    page: PageRequest,
) -> Result<impl IntoResponse, Error> {
    let response = services
        .comments
        .list_comments(user_id, post_id, query.parent_comment_id, page)
        .await?;
    Ok(Json(response))
}

pub async fn get_comment(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, Error> {
    let response = services
        .comments
        .get_comment(user_id, post_id, comment_id)
        .await?;
    Ok(Json(response))
}

pub async fn create_comment(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, Error> {
    let response = services
        .comments
        .create_comment(user_id, post_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_comment(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, Error> {
    let response = services
        .comments
        .update_comment(user_id, post_id, comment_id, payload)
        .await?;
    Ok(Json(response))
}

pub async fn delete_comment(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, Error> {
    services
        .comments
        .delete_comment(user_id, post_id, comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
