use async_trait::async_trait;
use serde_json::Value;

use crate::{
    ac::UserId,
    error::BackendError,
    favorite::favorites_path,
    store::{
        KeyedStore,
        normalize,
    },
};

/// Persistence of favorite teacher ids per user.
///
/// This is implemented for every `KeyedStore`.
#[async_trait]
pub trait FavoriteBackend {
    async fn add_favorite(
        &self,
        user: &UserId,
        teacher_id: &str,
    ) -> Result<(), BackendError>;
    async fn remove_favorite(
        &self,
        user: &UserId,
        teacher_id: &str,
    ) -> Result<(), BackendError>;
    async fn favorites(
        &self,
        user: &UserId,
    ) -> Result<Vec<String>, BackendError>;
}

#[async_trait]
impl<S: KeyedStore + ?Sized> FavoriteBackend for S {
    async fn add_favorite(
        &self,
        user: &UserId,
        teacher_id: &str,
    ) -> Result<(), BackendError> {
        self.write(&favorites_path(user, Some(teacher_id)), Value::Bool(true)).await
    }

    async fn remove_favorite(
        &self,
        user: &UserId,
        teacher_id: &str,
    ) -> Result<(), BackendError> {
        self.delete(&favorites_path(user, Some(teacher_id))).await
    }

    async fn favorites(
        &self,
        user: &UserId,
    ) -> Result<Vec<String>, BackendError> {
        let value = self.get(&favorites_path(user, None)).await?;
        Ok(normalize(value).into_iter()
            .map(|(id, _)| id)
            .collect())
    }
}
