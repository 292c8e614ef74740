//! Templates and content helpers for posts.

use super::post_id::title_from_id;
use super::types::PostType;

pub const DEFAULT_DESCRIPTION: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.";

/// Object name of the designated cover image inside a post namespace.
pub const COVER_FILE_NAME: &str = "cover";

/// Relative-link scheme authors use to reference attachments of the same post.
pub const LINK_SCHEME: &str = "post://";

/// Initial field values for a freshly created post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTemplate {
    pub id: String,
    pub post_type: PostType,
    pub title: String,
    pub description: String,
    pub content: String,
}

impl PostTemplate {
    pub fn from_id(id: String) -> Self {
        let title = title_from_id(&id);
        let content = format!("# {title}\n\n{DEFAULT_DESCRIPTION}");
        Self {
            id,
            post_type: PostType::default(),
            title,
            description: DEFAULT_DESCRIPTION.to_string(),
            content,
        }
    }
}

/// Rewrite `post://name` tokens into attachment routes of `post_id`.
pub fn resolve_attachment_links(content: &str, post_id: &str) -> String {
    content.replace(LINK_SCHEME, &format!("/posts/{post_id}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_derives_title_and_content() {
        let template = PostTemplate::from_id("quantum-cookie".to_string());
        assert_eq!(template.title, "Quantum Cookie");
        assert_eq!(template.post_type, PostType::Blog);
        assert_eq!(template.description, DEFAULT_DESCRIPTION);
        assert_eq!(
            template.content,
            format!("# Quantum Cookie\n\n{DEFAULT_DESCRIPTION}")
        );
    }

    #[test]
    fn links_resolve_to_attachment_routes() {
        let content = "![render](post://render.png) and [notes](post://notes.pdf)";
        assert_eq!(
            resolve_attachment_links(content, "cosmic-tea"),
            "![render](/posts/cosmic-tea/render.png) and [notes](/posts/cosmic-tea/notes.pdf)"
        );
    }
}
