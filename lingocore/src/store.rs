use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;

/// An ordered range request over the children of a collection path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeQuery {
    pub collection: String,
    /// Only keys strictly greater than this are returned.
    pub start_after: Option<String>,
    pub limit: usize,
}

/// KeyedStore - the remote keyed store.
///
/// Paths are `/` separated; the children of a path form an ordered
/// collection keyed by their last path segment.  Implementations must
/// return range results in ascending key order.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    async fn range_query(
        &self,
        query: &RangeQuery,
    ) -> Result<Vec<(String, Value)>, BackendError>;
    /// Returns the value at `path`; a path that only has children
    /// yields an object mapping each child key to its value.
    async fn get(
        &self,
        path: &str,
    ) -> Result<Option<Value>, BackendError>;
    /// Replaces everything at and below `path` with `value`.  A value
    /// held whole by an ancestor is split up so the rest of it remains.
    async fn write(
        &self,
        path: &str,
        value: Value,
    ) -> Result<(), BackendError>;
    /// Removes the value at `path` along with everything below it.
    async fn delete(
        &self,
        path: &str,
    ) -> Result<(), BackendError>;
}

mod connector;
mod impls;
mod normalize;

pub use connector::ConnectorOption;

pub use impls::{
    ancestors,
    nest,
    split_leaf,
};
pub use normalize::normalize;
