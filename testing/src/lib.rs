pub mod core;
pub mod fixtures;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod store;

pub fn is_send_sync<T: Send + Sync>(_: &T) -> bool {
    true
}
