//! This module contains the handlers for the user profile endpoints

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{api::extract::CurrentUser, error::Error, services::Services};

pub async fn current_user(
    State(services): State<Services>,
    CurrentUser { user_id }: CurrentUser,
) -> Result<impl IntoResponse, Error> {
    let response = services.users.current_user(user_id).await?;
    Ok(Json(response))
}

pub async fn get_user(
    State(services): State<Services>,
    _caller: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let response = services.users.get_user(user_id).await?;
    Ok(Json(response))
}
