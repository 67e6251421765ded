use lingocore::{
    filter::{
        self,
        Filter,
    },
    store::{
        KeyedStore,
        RangeQuery,
    },
    teacher::{
        Teacher,
        traits::CatalogBackend,
    },
};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::{
    accumulated::AccumulatedSet,
    cursor::PageCursor,
    error::Error,
};

/// How a call to `ensure_visible` settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// This many teachers pass the current filter.
    Visible(usize),
    /// The collection is exhausted and nothing passes the filter.
    NoMatches,
    /// Another fetch was already running; nothing was done.
    InFlight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and this many new teachers were merged.
    Loaded(usize),
    Exhausted,
    InFlight,
    /// The page came back after the cursor had already moved on from
    /// the position it was requested for, and was dropped.
    Stale,
}

/// What the rendering layer needs to draw the listing.
#[derive(Clone, Debug, PartialEq)]
pub struct BrowseView {
    pub teachers: Vec<Teacher>,
    pub has_more: bool,
    pub fetching: bool,
    pub total: usize,
}

struct BrowseState {
    cursor: PageCursor,
    teachers: AccumulatedSet,
    filter: Filter,
    fetching: bool,
}

impl BrowseState {
    fn visible_count(&self) -> usize {
        filter::apply(self.teachers.iter(), &self.filter).count()
    }

    fn settle(&self) -> Visibility {
        match self.visible_count() {
            0 if self.cursor.is_exhausted() => Visibility::NoMatches,
            0 if self.fetching => Visibility::InFlight,
            n => Visibility::Visible(n),
        }
    }

    /// Mark a fetch as running and produce its query, unless one is
    /// already running or the cursor is exhausted.
    fn begin_fetch(&mut self) -> Option<RangeQuery> {
        if self.fetching {
            return None;
        }
        let query = self.cursor.request()?;
        self.fetching = true;
        Some(query)
    }
}

/// Drives the page cursor and keeps the accumulated teachers, refilling
/// until the current filter has something to show or the collection
/// runs out.
///
/// Only one page fetch runs at a time; calls made while one is running
/// return immediately.
pub struct FetchCoordinator {
    store: Arc<dyn KeyedStore>,
    state: Mutex<BrowseState>,
}

impl FetchCoordinator {
    pub fn new(store: Arc<dyn KeyedStore>, cursor: PageCursor) -> Self {
        Self {
            store,
            state: Mutex::new(BrowseState {
                cursor,
                teachers: AccumulatedSet::new(),
                filter: Filter::default(),
                fetching: false,
            }),
        }
    }

    pub fn filter(&self) -> Filter {
        self.state.lock().filter.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().teachers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().teachers.is_empty()
    }

    pub fn has_more(&self) -> bool {
        !self.state.lock().cursor.is_exhausted()
    }

    pub fn is_fetching(&self) -> bool {
        self.state.lock().fetching
    }

    pub fn last_seen_key(&self) -> Option<String> {
        self.state.lock().cursor.last_seen_key().map(str::to_string)
    }

    /// The teachers passing the current filter, in fetch order.
    pub fn visible(&self) -> Vec<Teacher> {
        let state = self.state.lock();
        filter::apply(state.teachers.iter(), &state.filter)
            .cloned()
            .collect()
    }

    pub fn view(&self) -> BrowseView {
        let state = self.state.lock();
        BrowseView {
            teachers: filter::apply(state.teachers.iter(), &state.filter)
                .cloned()
                .collect(),
            has_more: !state.cursor.is_exhausted(),
            fetching: state.fetching,
            total: state.teachers.len(),
        }
    }

    /// Initial load.  Fetches only if nothing is visible yet, so
    /// calling this again once teachers are showing is a no-op.
    pub async fn start(&self) -> Result<Visibility, Error> {
        self.refill().await
    }

    /// Replace the current filter, refilling only if it leaves nothing
    /// visible while more pages remain.
    pub async fn set_filter(&self, filter: Filter) -> Result<Visibility, Error> {
        let needs_refill = {
            let mut state = self.state.lock();
            state.filter = filter;
            state.visible_count() == 0 && !state.cursor.is_exhausted()
        };
        if needs_refill {
            self.refill().await
        } else {
            Ok(self.state.lock().settle())
        }
    }

    /// Make the current filter `filter` and keep fetching pages until
    /// at least one teacher passes it or the collection is exhausted.
    ///
    /// Pages merged before a failing fetch are kept.
    pub async fn ensure_visible(&self, filter: Filter) -> Result<Visibility, Error> {
        self.state.lock().filter = filter;
        self.refill().await
    }

    async fn refill(&self) -> Result<Visibility, Error> {
        loop {
            let query = {
                let mut state = self.state.lock();
                let visible = state.visible_count();
                if visible > 0 {
                    return Ok(Visibility::Visible(visible));
                }
                if state.cursor.is_exhausted() {
                    return Ok(Visibility::NoMatches);
                }
                match state.begin_fetch() {
                    Some(query) => query,
                    None => return Ok(state.settle()),
                }
            };
            if self.fetch(query).await?.is_none() {
                return Ok(self.state.lock().settle());
            }
        }
    }

    /// Fetch one more page regardless of the filter.
    pub async fn load_more(&self) -> Result<LoadOutcome, Error> {
        let query = {
            let mut state = self.state.lock();
            if state.fetching {
                return Ok(LoadOutcome::InFlight);
            }
            match state.begin_fetch() {
                Some(query) => query,
                None => return Ok(LoadOutcome::Exhausted),
            }
        };
        Ok(match self.fetch(query).await? {
            Some(added) => LoadOutcome::Loaded(added),
            None => LoadOutcome::Stale,
        })
    }

    /// Run a query obtained from `begin_fetch` and merge its result.
    /// Returns the number of teachers added, or `None` if the result
    /// no longer matched the cursor position.
    async fn fetch(&self, query: RangeQuery) -> Result<Option<usize>, Error> {
        log::debug!(
            "fetching {} teachers from {} after {:?}",
            query.limit,
            query.collection,
            query.start_after,
        );
        let result = self.store.teacher_page(&query).await;
        let mut state = self.state.lock();
        state.fetching = false;
        let page = result.map_err(|e| {
            log::warn!("error loading teachers: {e}");
            Error::FetchFailed(e)
        })?;
        if !state.cursor.advance(&query, &page) {
            return Ok(None);
        }
        let added = state.teachers.merge(page.teachers);
        log::debug!("merged {added} new teachers, {} in total", state.teachers.len());
        Ok(Some(added))
    }
}
