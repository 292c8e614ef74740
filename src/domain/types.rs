//! Closed enumerations mirrored by Postgres enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Content category of a post (mirrors Postgres enum `post_type`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "post_type", rename_all = "kebab-case")]
pub enum PostType {
    #[default]
    Blog,
    Milestone,
    ComputerGraphics,
    ComputerScience,
    DigitalArt,
    Mathematics,
}

impl PostType {
    pub const ALL: [PostType; 6] = [
        PostType::Blog,
        PostType::Milestone,
        PostType::ComputerGraphics,
        PostType::ComputerScience,
        PostType::DigitalArt,
        PostType::Mathematics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PostType::Blog => "blog",
            PostType::Milestone => "milestone",
            PostType::ComputerGraphics => "computer-graphics",
            PostType::ComputerScience => "computer-science",
            PostType::DigitalArt => "digital-art",
            PostType::Mathematics => "mathematics",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PostType::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value)
            .ok_or_else(|| DomainError::UnknownPostType {
                value: value.to_string(),
            })
    }
}
