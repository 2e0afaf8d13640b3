use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::debug;
use uuid::Uuid;

use crate::{constants::api::USER_ID_HEADER, error::Error};

/// Axum extractor to identify the caller.
///
/// The identity gateway in front of the backend authenticates the request and
/// forwards the user id in the [`USER_ID_HEADER`] header. Requests without it,
/// or with a value that is not a UUID, are rejected with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| Error::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;

        let user_id = header
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| {
                debug!(target: "api::extract", "Rejecting malformed user id header");
                Error::Unauthorized(format!("Invalid {USER_ID_HEADER} header"))
            })?;

        Ok(Self { user_id })
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, routing::get, Json, Router};
    use axum_test::TestServer;

    use super::*;

    async fn whoami(CurrentUser { user_id }: CurrentUser) -> Json<Uuid> {
        Json(user_id)
    }

    fn server() -> TestServer {
        TestServer::new(Router::new().route("/whoami", get(whoami))).unwrap()
    }

    #[tokio::test]
    async fn test_valid_header_accepted() {
        let id = Uuid::new_v4();

        let response = server()
            .get("/whoami")
            .add_header(USER_ID_HEADER, id.to_string())
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Uuid>(), id);
    }

    #[tokio::test]
    async fn test_missing_header_unauthorized() {
        let response = server().get("/whoami").await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_unauthorized() {
        let response = server()
            .get("/whoami")
            .add_header(USER_ID_HEADER, "not-a-uuid")
            .await;

        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }
}
