//! This module contains the handlers for the post feed endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    api::extract::CurrentUser,
    error::Error,
    models::{CreatePostRequest, UpdatePostRequest},
    pagination::PageRequest,
    services::Services,
};

pub async fn list_posts(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    page: PageRequest,
) -> Result<impl IntoResponse, Error> {
    let response = services.feed.list_posts(user_id, page).await?;
    Ok(Json(response))
}

pub async fn explore_posts(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    page: PageRequest,
) -> Result<impl IntoResponse, Error> {
    let response = services.feed.explore_posts(user_id, page).await?;
    Ok(Json(response))
}

pub async fn list_user_posts(
    State(services): State<Services>,
    CurrentUser { user_id: viewer }: CurrentUser,
    Path(user_id): Path<Uuid>,
    page: PageRequest,
) -> Result<impl IntoResponse, Error> {
    let response = services.feed.list_user_posts(viewer, user_id, page).await?;
    Ok(Json(response))
}

pub async fn get_post(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let response = services.feed.get_post(user_id, post_id).await?;
    Ok(Json(response))
}

pub async fn create_post(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, Error> {
    let response = services.feed.create_post(user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_post(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, Error> {
    let response = services.feed.update_post(user_id, post_id, payload).await?;
    Ok(Json(response))
}

pub async fn delete_post(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    services.feed.delete_post(user_id, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
