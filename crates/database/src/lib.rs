pub mod basic_db;

pub use basic_db::{DbError, InnerDatabase, ProfileStore};
