//! Domain layer types and pure helpers.

pub mod entities;
pub mod error;
pub mod names;
pub mod post_id;
pub mod posts;
pub mod types;
