use lingocore::{
    ac::{
        IdentityWatch,
        Subscription,
    },
    store::KeyedStore,
};
use std::sync::Arc;

use crate::{
    coordinator::FetchCoordinator,
    favorite::FavoriteCache,
};

pub const DEFAULT_COLLECTION: &str = "teachers";
pub const DEFAULT_PAGE_SIZE: usize = 4;

#[derive(Default)]
pub struct Builder {
    store: Option<Arc<dyn KeyedStore>>,
    collection: Option<String>,
    page_size: Option<usize>,
    identity: Option<IdentityWatch>,
}

/// A browsing session over the teacher catalog together with the
/// favorites of whoever is signed in.  Cheap to clone.
#[derive(Clone)]
pub struct Platform(Arc<PlatformInner>);

struct PlatformInner {
    store: Arc<dyn KeyedStore>,
    coordinator: FetchCoordinator,
    favorites: Arc<FavoriteCache>,
    identity: IdentityWatch,
    _subscription: Subscription,
}

mod impls;
