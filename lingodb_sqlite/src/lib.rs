use sqlx::SqlitePool;
use std::sync::Arc;

/// A `KeyedStore` persisting every leaf value as a row keyed by its
/// full path.
pub struct SqliteBackend {
    pub(crate) pool: Arc<SqlitePool>,
    pub(crate) url: String,
}

mod impls;
