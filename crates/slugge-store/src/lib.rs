pub mod database;
pub mod documents;
pub mod error;
pub mod projects;
pub mod row_helpers;
pub mod schema;
pub mod share_tokens;
pub mod snapshots;

pub use database::Database;
pub use error::StoreError;
