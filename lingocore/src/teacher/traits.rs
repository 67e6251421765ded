use async_trait::async_trait;

use crate::{
    error::BackendError,
    store::{
        KeyedStore,
        RangeQuery,
        normalize,
    },
    teacher::{
        Teacher,
        TeacherPage,
    },
};

/// Read access to a teachers collection.
///
/// This is implemented for every `KeyedStore`.
#[async_trait]
pub trait CatalogBackend {
    async fn teacher_page(
        &self,
        query: &RangeQuery,
    ) -> Result<TeacherPage, BackendError>;
    async fn all_teachers(
        &self,
        collection: &str,
    ) -> Result<Vec<Teacher>, BackendError>;
}

#[async_trait]
impl<S: KeyedStore + ?Sized> CatalogBackend for S {
    async fn teacher_page(
        &self,
        query: &RangeQuery,
    ) -> Result<TeacherPage, BackendError> {
        let entries = self.range_query(query).await?;
        if entries.len() > query.limit {
            return Err(BackendError::AppInvariantViolation(format!(
                "range query on {} returned {} entries for a limit of {}",
                query.collection,
                entries.len(),
                query.limit,
            )));
        }
        Ok(TeacherPage::from_entries(entries))
    }

    async fn all_teachers(
        &self,
        collection: &str,
    ) -> Result<Vec<Teacher>, BackendError> {
        let entries = normalize(self.get(collection).await?);
        Ok(TeacherPage::from_entries(entries).teachers)
    }
}
