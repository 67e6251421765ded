pub mod accumulated;
pub mod coordinator;
pub mod cursor;
pub mod error;
pub mod favorite;
pub mod platform;

pub use platform::Platform;
