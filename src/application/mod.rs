pub mod comments;
pub mod error;
pub mod feed;
pub mod follows;
pub mod pagination;
pub mod posts;
pub mod repos;
