//! Application services composing repositories and storage.

pub mod attachments;
pub mod credentials;
pub mod error;
pub mod posts;
pub mod repos;
pub mod sessions;
