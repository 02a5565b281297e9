//! Defines the [`Tag`] type, which represents a [`crate::page::Page`] tag.

use std::hash::{Hash, Hasher};
use url::Url;

/// Represents a [`crate::page::Page`] tag. Pages only carry tag names; a
/// [`Tag`] pairs a name with the URL of its listing page.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag's name, as written in the page metadata.
    pub name: String,

    /// The URL of the tag's listing page, `{root}tags/{slug(name)}`.
    pub url: Url,
}

impl Tag {
    /// Creates a [`Tag`] for `name` beneath the site `root` (see
    /// [`crate::url::site_root`]).
    pub fn new(root: &Url, name: &str) -> Tag {
        let mut url = root.clone();
        url.set_path(&format!("{}tags/{}", root.path(), slug::slugify(name)));
        Tag {
            name: name.to_owned(),
            url,
        }
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tag_url_and_identity() -> Result<(), url::ParseError> {
        let root = Url::parse("https://example.org/blog/")?;
        let tag = Tag::new(&root, "Rust Lang");
        assert_eq!("https://example.org/blog/tags/rust-lang", tag.url.as_str());

        let other = Tag {
            name: "Rust Lang".to_owned(),
            url: Url::parse("https://elsewhere.org/")?,
        };
        assert_eq!(tag, other);
        let set: HashSet<Tag> = vec![tag, other].into_iter().collect();
        assert_eq!(1, set.len());
        Ok(())
    }
}
