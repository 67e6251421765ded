use lingocore::{
    ac::UserId,
    favorite::traits::FavoriteBackend,
    store::KeyedStore,
};
use parking_lot::Mutex;
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::Arc,
};

use crate::error::Error;

#[derive(Debug, Default)]
struct FavoriteState {
    active: Option<UserId>,
    sets: HashMap<UserId, HashSet<String>>,
    /// Bumped whenever a toggle starts or finishes.
    revision: u64,
    /// Toggles whose write has not completed yet.
    pending: usize,
}

impl FavoriteState {
    fn switch_to(&mut self, user: Option<&UserId>) {
        if self.active.as_ref() != user {
            log::debug!("favorites switching from {:?} to {user:?}", self.active);
            self.sets.clear();
            self.active = user.cloned();
        }
    }

    fn is_active(&self, user: &UserId) -> bool {
        self.active.as_ref() == Some(user)
    }
}

/// Marks a toggle as in progress until dropped.
struct PendingToggle<'a>(&'a Mutex<FavoriteState>);

impl<'a> PendingToggle<'a> {
    fn new(state: &mut FavoriteState, lock: &'a Mutex<FavoriteState>) -> Self {
        state.pending += 1;
        state.revision += 1;
        Self(lock)
    }
}

impl Drop for PendingToggle<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        state.pending = state.pending.saturating_sub(1);
        state.revision += 1;
    }
}

/// Favorite teacher ids of the active user.
///
/// Toggles are applied locally before the store is written to; if the
/// write fails the authoritative set is read back and replaces the
/// local one.  A load overlapping a toggle is discarded, as the set it
/// read may predate the write.
pub struct FavoriteCache {
    store: Arc<dyn KeyedStore>,
    state: Mutex<FavoriteState>,
}

impl FavoriteCache {
    pub fn new(store: Arc<dyn KeyedStore>) -> Self {
        Self {
            store,
            state: Mutex::new(FavoriteState::default()),
        }
    }

    pub fn is_favorite(&self, user: &UserId, teacher_id: &str) -> bool {
        self.state.lock()
            .sets
            .get(user)
            .map(|set| set.contains(teacher_id))
            .unwrap_or(false)
    }

    pub fn is_loaded(&self, user: &UserId) -> bool {
        self.state.lock().sets.contains_key(user)
    }

    pub fn active(&self) -> Option<UserId> {
        self.state.lock().active.clone()
    }

    /// Sorted favorite ids for `user`; empty when nothing is loaded.
    pub fn favorites(&self, user: &UserId) -> Vec<String> {
        let mut result = self.state.lock()
            .sets
            .get(user)
            .map(|set| set.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        result.sort();
        result
    }

    /// Adopt `user` as the active identity, dropping every loaded set
    /// if it differs from the current one.
    pub fn set_identity(&self, user: Option<&UserId>) {
        self.state.lock().switch_to(user);
    }

    /// Adopt `user` and replace its set with the one held by the store.
    /// With no user everything is cleared.
    pub async fn load(&self, user: Option<&UserId>) -> Result<(), Error> {
        self.set_identity(user);
        match user {
            Some(user) => self.reload(user).await,
            None => Ok(()),
        }
    }

    /// Read the set of `user` from the store if it is still the active
    /// identity.  A result arriving after the identity changed again, or
    /// while a toggle was in progress, is discarded.
    pub async fn reload(&self, user: &UserId) -> Result<(), Error> {
        let revision = {
            let state = self.state.lock();
            if !state.is_active(user) {
                log::debug!("skipping favorites load for inactive {user}");
                return Ok(());
            }
            state.revision
        };
        let ids = self.store.favorites(user).await?;
        let mut state = self.state.lock();
        if !state.is_active(user) {
            log::debug!("discarding favorites of {user} as it is no longer active");
        } else if state.revision != revision || state.pending > 0 {
            log::debug!("discarding favorites of {user} loaded during a toggle");
        } else {
            state.sets.insert(user.clone(), ids.into_iter().collect());
        }
        Ok(())
    }

    /// Flip the favorite state of `teacher_id` for `user`, returning the
    /// new state once the store confirmed it.
    pub async fn toggle(
        &self,
        user: Option<&UserId>,
        teacher_id: &str,
    ) -> Result<bool, Error> {
        let Some(user) = user else {
            log::info!("favorite toggle for {teacher_id} without an identity");
            return Err(Error::NotAuthenticated);
        };

        if !self.is_loaded(user) {
            // the flip must start from what the store holds
            self.load(Some(user)).await?;
        }

        let (was_favorite, _pending) = {
            let mut state = self.state.lock();
            state.switch_to(Some(user));
            let pending = PendingToggle::new(&mut state, &self.state);
            let set = state.sets.entry(user.clone()).or_default();
            let was_favorite = set.contains(teacher_id);
            if was_favorite {
                set.remove(teacher_id);
            } else {
                set.insert(teacher_id.to_string());
            }
            (was_favorite, pending)
        };

        let result = if was_favorite {
            self.store.remove_favorite(user, teacher_id).await
        } else {
            self.store.add_favorite(user, teacher_id).await
        };

        match result {
            Ok(()) => Ok(!was_favorite),
            Err(e) => {
                log::warn!("favorite write for {user}/{teacher_id} failed: {e}; reconciling");
                self.reconcile(user, teacher_id, was_favorite).await;
                Err(Error::ToggleWriteFailed(e))
            }
        }
    }

    async fn reconcile(&self, user: &UserId, teacher_id: &str, snapshot: bool) {
        match self.store.favorites(user).await {
            Ok(ids) => self.replace(user, ids),
            Err(e) => {
                log::error!(
                    "reconciling favorites for {user} failed: {e}; \
                    restoring {teacher_id} to its previous state"
                );
                let mut state = self.state.lock();
                if !state.is_active(user) {
                    return;
                }
                let set = state.sets.entry(user.clone()).or_default();
                if snapshot {
                    set.insert(teacher_id.to_string());
                } else {
                    set.remove(teacher_id);
                }
            }
        }
    }

    fn replace(&self, user: &UserId, ids: Vec<String>) {
        let mut state = self.state.lock();
        if state.is_active(user) {
            state.sets.insert(user.clone(), ids.into_iter().collect());
        } else {
            log::debug!("discarding favorites of {user} as it is no longer active");
        }
    }
}
