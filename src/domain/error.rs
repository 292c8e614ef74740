use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("post type `{value}` is invalid")]
    UnknownPostType { value: String },
    #[error("post id `{id}` contains characters outside [A-Za-z0-9_-]")]
    InvalidPostId { id: String },
    #[error("file name `{name}` is not a valid attachment name")]
    InvalidFileName { name: String },
}
