pub mod ac;
pub mod error;
pub mod favorite;
pub mod filter;
pub mod store;
pub mod teacher;
