use async_std::task;
use lingocore::{
    ac::{
        IdentityWatch,
        UserId,
    },
    filter::Filter,
    store::KeyedStore,
    teacher::Teacher,
};
use std::sync::{
    Arc,
    Weak,
};

use crate::{
    coordinator::{
        BrowseView,
        FetchCoordinator,
        LoadOutcome,
        Visibility,
    },
    cursor::PageCursor,
    error::Error,
    favorite::FavoriteCache,
};

use super::*;

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, val: impl KeyedStore + 'static) -> Self {
        self.store = Some(Arc::new(val));
        self
    }

    pub fn shared_store(mut self, val: Arc<dyn KeyedStore>) -> Self {
        self.store = Some(val);
        self
    }

    pub fn collection(mut self, val: impl Into<String>) -> Self {
        self.collection = Some(val.into());
        self
    }

    pub fn page_size(mut self, val: usize) -> Self {
        self.page_size = Some(val);
        self
    }

    /// Follow an existing identity source instead of a private one.
    pub fn identity(mut self, val: IdentityWatch) -> Self {
        self.identity = Some(val);
        self
    }

    pub fn build(self) -> Result<Platform, Error> {
        let store = self.store
            .ok_or(Error::Misconfiguration("store"))?;
        let cursor = PageCursor::new(
            self.collection.unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )?;
        let identity = self.identity.unwrap_or_default();
        let favorites = Arc::new(FavoriteCache::new(store.clone()));

        let weak: Weak<FavoriteCache> = Arc::downgrade(&favorites);
        let subscription = identity.subscribe(move |user| {
            let Some(favorites) = weak.upgrade() else {
                return;
            };
            favorites.set_identity(user);
            if let Some(user) = user {
                spawn_reload(Arc::downgrade(&favorites), user.clone());
            }
        });

        Ok(Platform(Arc::new(PlatformInner {
            store: store.clone(),
            coordinator: FetchCoordinator::new(store, cursor),
            favorites,
            identity,
            _subscription: subscription,
        })))
    }
}

/// Load the favorites of a newly signed in `user` in the background.
/// Loads overtaken by a later identity change are discarded by the cache.
fn spawn_reload(favorites: Weak<FavoriteCache>, user: UserId) {
    task::spawn(async move {
        let Some(favorites) = favorites.upgrade() else {
            return;
        };
        if let Err(e) = favorites.reload(&user).await {
            log::error!("error loading favorites of {user}: {e}");
        }
    });
}

// Browsing.
impl Platform {
    pub fn store(&self) -> &dyn KeyedStore {
        self.0.store.as_ref()
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.0.coordinator
    }

    /// Fetch the first page(s) and load favorites for the current
    /// identity.  A failure to load favorites is logged but does not
    /// prevent browsing.
    pub async fn start(&self) -> Result<Visibility, Error> {
        if let Err(e) = self.refresh_favorites().await {
            log::error!("error loading favorites: {e}");
        }
        self.0.coordinator.start().await
    }

    pub async fn set_filter(&self, filter: Filter) -> Result<Visibility, Error> {
        self.0.coordinator.set_filter(filter).await
    }

    pub async fn ensure_visible(&self, filter: Filter) -> Result<Visibility, Error> {
        self.0.coordinator.ensure_visible(filter).await
    }

    pub async fn load_more(&self) -> Result<LoadOutcome, Error> {
        self.0.coordinator.load_more().await
    }

    pub fn view(&self) -> BrowseView {
        self.0.coordinator.view()
    }

    /// The visible teachers each paired with whether the current user
    /// has marked them as a favorite.
    pub fn listing(&self) -> Vec<(Teacher, bool)> {
        let user = self.current_user();
        self.0.coordinator.visible()
            .into_iter()
            .map(|teacher| {
                let favorite = user.as_ref()
                    .map(|user| self.0.favorites.is_favorite(user, &teacher.id))
                    .unwrap_or(false);
                (teacher, favorite)
            })
            .collect()
    }
}

// Identity and favorites.
impl Platform {
    pub fn identity(&self) -> &IdentityWatch {
        &self.0.identity
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.0.identity.current()
    }

    pub fn favorites(&self) -> &FavoriteCache {
        &self.0.favorites
    }

    /// Change the signed in identity and load its favorites.
    pub async fn switch_identity(&self, user: Option<UserId>) -> Result<(), Error> {
        self.0.identity.set(user);
        self.refresh_favorites().await
    }

    pub async fn refresh_favorites(&self) -> Result<(), Error> {
        let user = self.current_user();
        self.0.favorites.load(user.as_ref()).await
    }

    pub fn is_favorite(&self, teacher_id: &str) -> bool {
        self.current_user()
            .map(|user| self.0.favorites.is_favorite(&user, teacher_id))
            .unwrap_or(false)
    }

    pub async fn toggle_favorite(&self, teacher_id: &str) -> Result<bool, Error> {
        let user = self.current_user();
        self.0.favorites.toggle(user.as_ref(), teacher_id).await
    }
}

#[cfg(test)]
mod tests {
    use test_lingo::{
        is_send_sync,
        store::MemoryStore,
    };
    use super::*;

    #[test]
    fn builder_requires_store() {
        assert!(matches!(
            Builder::new().build(),
            Err(Error::Misconfiguration("store"))
        ));
        assert!(matches!(
            Builder::new()
                .store(MemoryStore::new())
                .page_size(0)
                .build(),
            Err(Error::InvalidPageSize(0))
        ));
    }

    #[test]
    fn platform_is_send_sync() -> anyhow::Result<()> {
        let platform = Builder::new()
            .store(MemoryStore::new())
            .build()?;
        assert!(is_send_sync(&platform));
        assert_eq!(platform.coordinator().view().total, 0);
        Ok(())
    }
}
