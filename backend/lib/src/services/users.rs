//! User profiles

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    data::SocialRepository,
    error::{Error, Result},
    models::UserDto,
};

pub struct UserService {
    repository: Arc<dyn SocialRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn SocialRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserDto> {
        self.repository
            .get_user(user_id)
            .await?
            .map(UserDto::from)
            .ok_or_else(|| Error::NotFound(format!("User {user_id}")))
    }

    /// Profile of the caller
    ///
    /// The gateway vouches for the id but the account may not be provisioned
    /// yet, which is a 404 rather than a 401 here.
    pub async fn current_user(&self, user_id: Uuid) -> Result<UserDto> {
        self.get_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::test::users, data::InMemoryRepository};

    #[tokio::test]
    async fn test_get_user_returns_profile() {
        let repo = Arc::new(InMemoryRepository::new());
        let alice = repo.create_user(users::ALICE).await.unwrap();
        let service = UserService::new(repo);

        let profile = service.get_user(alice.id).await.unwrap();
        assert_eq!(profile.user_id, alice.id);
        assert_eq!(profile.username, users::ALICE);
        assert_eq!(profile.created_at, alice.created_at);
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let service = UserService::new(Arc::new(InMemoryRepository::new()));

        assert!(matches!(
            service.get_user(Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            service.current_user(Uuid::new_v4()).await,
            Err(Error::NotFound(_))
        ));
    }
}
