use lingocore::{
    store::RangeQuery,
    teacher::{
        Teacher,
        TeacherPage,
        traits::CatalogBackend,
    },
};

use crate::error::Error;

/// Pagination state over an ordered collection.
///
/// The cursor only moves when a page was fetched successfully; it
/// becomes exhausted once a page comes back short, after which no
/// further requests are produced.
#[derive(Clone, Debug)]
pub struct PageCursor {
    collection: String,
    page_size: usize,
    last_seen_key: Option<String>,
    exhausted: bool,
}

impl PageCursor {
    pub fn new(collection: impl Into<String>, page_size: usize) -> Result<Self, Error> {
        if page_size == 0 {
            return Err(Error::InvalidPageSize(page_size));
        }
        Ok(Self {
            collection: collection.into(),
            page_size,
            last_seen_key: None,
            exhausted: false,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn last_seen_key(&self) -> Option<&str> {
        self.last_seen_key.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The query for the next page, or `None` once exhausted.
    pub fn request(&self) -> Option<RangeQuery> {
        (!self.exhausted).then(|| {
            RangeQuery::new(self.collection.as_str(), self.page_size)
                .start_after(self.last_seen_key.clone())
        })
    }

    /// Move past `page`, which must be the result of `query`.  A result
    /// for a query issued from a different position is ignored and
    /// `false` is returned.
    pub fn advance(&mut self, query: &RangeQuery, page: &TeacherPage) -> bool {
        if self.exhausted || query.start_after != self.last_seen_key {
            log::debug!(
                "ignoring stale page for {} after {:?}",
                self.collection,
                query.start_after,
            );
            return false;
        }
        if let Some(key) = &page.last_key {
            self.last_seen_key = Some(key.clone());
        }
        if page.fetched < self.page_size {
            log::debug!("collection {} exhausted", self.collection);
            self.exhausted = true;
        }
        true
    }

    /// Fetch the next page from `store`.  Once exhausted this returns
    /// an empty list without touching the store.
    pub async fn next<S>(&mut self, store: &S) -> Result<Vec<Teacher>, Error>
    where
        S: CatalogBackend + Sync + ?Sized,
    {
        let Some(query) = self.request() else {
            return Ok(Vec::new());
        };
        let page = store.teacher_page(&query).await
            .map_err(Error::FetchFailed)?;
        self.advance(&query, &page);
        Ok(page.teachers)
    }
}
