use tracing::error;

use crate::{
    error::AppError,
    store::{self, Collection, RecordStore},
    students::repo_types::Student,
};

impl Student {
    pub async fn load_all(store: &dyn RecordStore) -> Vec<Student> {
        store::load(store, Collection::Students).await
    }

    /// Loads every record ahead of a rewrite. Refuses when any stored record
    /// could not be read, so the save cannot drop it.
    pub async fn load_for_update(store: &dyn RecordStore) -> Result<Vec<Student>, AppError> {
        store::load_intact(store, Collection::Students).await.map_err(|e| {
            error!(error = %e, "refusing to rewrite students");
            AppError::Persistence("students")
        })
    }

    pub async fn save_all(store: &dyn RecordStore, students: &[Student]) -> bool {
        store::save(store, Collection::Students, students).await
    }

    pub async fn find_by_id(store: &dyn RecordStore, id: i64) -> Option<Student> {
        Self::load_all(store).await.into_iter().find(|s| s.id == id)
    }

    /// The card owned by `user_id`, if any.
    pub async fn find_by_owner(store: &dyn RecordStore, user_id: i64) -> Option<Student> {
        Self::load_all(store)
            .await
            .into_iter()
            .find(|s| s.user_id == Some(user_id))
    }
}
