//! This module contains the handlers for reactions on posts and comments
//!
//! Posts and comments share the same three operations; the path decides the
//! [`ReactionSubject`].

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
    models::ReactRequest,
    pagination::PageRequest,
    services::{reactions::ReactionSubject, Services},
};

async fn react(
    services: Services,
    user_id: Uuid,
    subject: ReactionSubject,
    payload: ReactRequest,
) -> Result<impl IntoResponse, Error> {
    let response = services.reactions.react(user_id, subject, payload).await?;
    Ok(Json(response))
}

async fn remove(
    services: Services,
    user_id: Uuid,
    subject: ReactionSubject,
) -> Result<impl IntoResponse, Error> {
    services.reactions.remove_reaction(user_id, subject).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list(
    services: Services,
    subject: ReactionSubject,
    page: PageRequest,
) -> Result<impl IntoResponse, Error> {
    let response = services.reactions.list_reactions(subject, page).await?;
    Ok(Json(response))
}

// ==================== Post reactions ====================

pub async fn react_to_post(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<ReactRequest>,
) -> Result<impl IntoResponse, Error> {
    react(services, user_id, ReactionSubject::Post(post_id), payload).await
}

pub async fn remove_post_reaction(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    remove(services, user_id, ReactionSubject::Post(post_id)).await
}

pub async fn list_post_reactions(
    State(services): State<Services>,
    _caller: CurrentUser,
    Path(post_id): Path<Uuid>,
    page: PageRequest,
) -> Result<impl IntoResponse, Error> {
    list(services, ReactionSubject::Post(post_id), page).await
}

// ==================== Comment reactions ====================

pub async fn react_to_comment(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReactRequest>,
) -> Result<impl IntoResponse, Error> {
    let subject = ReactionSubject::Comment {
        post_id,
        comment_id,
    };
    react(services, user_id, subject, payload).await
}

pub async fn remove_comment_reaction(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, Error> {
    let subject = ReactionSubject::Comment {
        post_id,
        comment_id,
    };
    remove(services, user_id, subject).await
}

pub async fn list_comment_reactions(
    State(services): State<Services>,
    _caller: CurrentUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    page: PageRequest,
) -> Result<impl IntoResponse, Error> {
    let subject = ReactionSubject::Comment {
        post_id,
        comment_id,
    };
    list(services, subject, page).await
}
