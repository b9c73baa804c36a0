use tracing::error;

use crate::{
    error::AppError,
    auth::repo_types::User,
    store::{self, Collection, RecordStore},
};

impl User {
    pub async fn load_all(store: &dyn RecordStore) -> Vec<User> {
        store::load(store, Collection::Users).await
    }

    /// Loads every record ahead of a rewrite. Refuses when any stored record
    /// could not be read, so the save cannot drop it.
    pub async fn load_for_update(store: &dyn RecordStore) -> Result<Vec<User>, AppError> {
        store::load_intact(store, Collection::Users).await.map_err(|e| {
            error!(error = %e, "refusing to rewrite users");
            AppError::Persistence("users")
        })
    }

    pub async fn save_all(store: &dyn RecordStore, users: &[User]) -> bool {
        store::save(store, Collection::Users, users).await
    }

    /// Find a user by username.
    pub async fn find_by_username(store: &dyn RecordStore, username: &str) -> Option<User> {
        Self::load_all(store)
            .await
            .into_iter()
            .find(|u| u.username == username)
    }

    /// Find a user by id.
    pub async fn find_by_id(store: &dyn RecordStore, id: i64) -> Option<User> {
        Self::load_all(store).await.into_iter().find(|u| u.id == id)
    }
}
