use serde::Serialize;
use time::OffsetDateTime;

use super::types::PostType;

/// A full post row, including the markdown body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub unlisted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
    pub title: String,
    pub description: String,
    pub content: String,
}

impl PostRecord {
    pub fn info(&self) -> PostInfo {
        PostInfo {
            id: self.id.clone(),
            post_type: self.post_type,
            unlisted: self.unlisted,
            created: self.created,
            updated: self.updated,
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

/// Listing projection of a post without its content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub unlisted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: String,
    pub created: OffsetDateTime,
}

/// A stored attachment, named relative to its post namespace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentInfo {
    pub name: String,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub modified: OffsetDateTime,
}
