//! This module contains the handlers for the chat endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::extract::CurrentUser, error::Error, models::SendMessageRequest,
    pagination::PageRequest, services::Services,
};

/// Extra bounds accepted by the message history
///
/// * `before`: only messages older than this cursor, same as `cursor`
/// * `after`: only messages newer than this cursor
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    pub before: Option<String>,
    pub after: Option<String>,
}

impl MessagesQuery {
    fn apply(self, mut page: PageRequest) -> Result<PageRequest, Error> {
        if let Some(before) = self.before.filter(|cursor| !cursor.is_empty()) {
            if page.cursor.as_ref().is_some_and(|cursor| *cursor != before) {
                return Err(Error::BadRequest(
                    "cursor and before must not disagree".to_string(),
                ));
            }
            page = page.after(before);
        }

        if let Some(after) = self.after {
            page = page.until(after);
        }

        Ok(page)
    }
}

pub async fn list_chats(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    page: PageRequest,
) -> Result<impl IntoResponse, Error> {
    let response = services.chats.list_chats(user_id, page).await?;
    Ok(Json(response))
}

pub async fn list_direct_messages(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(other_user_id): Path<Uuid>,
    Query(bounds): Query<MessagesQuery>,
    page: PageRequest,
) -> Result<impl IntoResponse, Error> {
    let response = services
        .chats
        .list_direct_messages(user_id, other_user_id, bounds.apply(page)?)
        .await?;
    Ok(Json(response))
}

pub async fn send_direct_message(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(other_user_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, Error> {
    let response = services
        .chats
        .send_direct_message(user_id, other_user_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn delete_message(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    services.chats.delete_message(user_id, message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
