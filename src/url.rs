//! Canonical URLs for pages and the rewriting of link targets found in page
//! bodies.
//!
//! Every page lives at `{site_root}/{slugified relative path}`. Links in a page
//! body are written the way they'd be written on disk (`../notes/intro.md`,
//! `/guides/setup.md`, `2021-01-01-launch.md`), and [`LinkResolver`] maps them
//! onto those same canonical URLs.

use crate::naming::{has_asset_extension, segment_slug};
use percent_encoding::percent_decode_str;
use url::{ParseError, Url};

/// Returns `base` with a trailing slash so that [`Url::join`] treats it as a
/// directory. Without it, the last path component is considered a file name
/// and dropped on join.
pub fn site_root(base: &Url) -> Url {
    let mut root = base.clone();
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root.set_query(None);
    root.set_fragment(None);
    root
}

/// Builds the URL of the page at the given (already slugified) segments.
pub fn page_url<S: AsRef<str>>(root: &Url, segments: &[S]) -> Result<Url> {
    let path: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
    root.join(&path.join("/"))
}

/// The identity of a page: its URL path without a trailing slash (`/` for the
/// root).
pub fn url_path(url: &Url) -> &str {
    match url.path().trim_end_matches('/') {
        "" => "/",
        path => path,
    }
}

/// The parent of a path as returned by [`url_path`], or `None` for `/`.
pub fn parent_path(path: &str) -> Option<&str> {
    match path.rfind('/') {
        _ if path == "/" => None,
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

/// The path of `url` relative to `root`, without leading slash.
pub fn relative_path<'u>(root: &Url, url: &'u Url) -> &'u str {
    url.path()
        .strip_prefix(root.path())
        .unwrap_or_else(|| url.path().trim_start_matches('/'))
        .trim_end_matches('/')
}

/// The outcome of resolving a link target.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    /// A link off-site (has a scheme, is `mailto`, or is protocol relative).
    /// The target is kept verbatim.
    External(String),

    /// A link within the site. `href` is what gets rendered (site-absolute
    /// path plus any query and fragment); `url` is the fully-qualified target
    /// without query or fragment.
    Internal { href: String, url: Url },

    /// A reference within the current page (`#section`, `?q`, or empty).
    Local(String),

    /// A static file (its extension is one of the configured static
    /// extensions). The path is kept as written, resolved to site-absolute.
    Asset(String),
}

/// Resolves link and image targets relative to one page.
pub struct LinkResolver<'a> {
    root: &'a Url,

    /// Extensions (without dot) that mark a target as a static file.
    asset_extensions: &'a [String],

    /// The URL against which relative targets are joined. For a directory
    /// index at `/notes`, this is `/notes/index` so that `intro.md` lands on
    /// `/notes/intro` rather than `/intro`.
    anchor: Url,
}

impl<'a> LinkResolver<'a> {
    /// Constructs a new `LinkResolver`
    ///
    /// # Arguments
    ///
    /// * `root` - the site root, as returned by [`site_root`].
    /// * `page_path` - the current page's path relative to `root`.
    /// * `dir_index` - whether the current page represents a directory.
    /// * `asset_extensions` - extensions of targets that are static files
    ///   rather than pages.
    pub fn new(
        root: &'a Url,
        page_path: &str,
        dir_index: bool,
        asset_extensions: &'a [String],
    ) -> Result<LinkResolver<'a>> {
        let page_path = page_path.trim_matches('/');
        let anchor = match (dir_index, page_path.is_empty()) {
            (true, true) => root.join("index")?,
            (true, false) => root.join(&format!("{}/index", page_path))?,
            (false, _) => root.join(page_path)?,
        };
        Ok(LinkResolver {
            root,
            asset_extensions,
            anchor,
        })
    }

    /// Resolves the target of a link.
    pub fn resolve_link(&self, target: &str) -> Result<Resolved> {
        if is_external(target) {
            return Ok(Resolved::External(target.to_owned()));
        }
        let (path, suffix) = split_suffix(target);
        if path.is_empty() {
            return Ok(Resolved::Local(target.to_owned()));
        }
        let joined = self.join(path)?;
        if has_asset_extension(joined.path(), self.asset_extensions) {
            return Ok(Resolved::Asset(format!("{}{}", joined.path(), suffix)));
        }
        let url = self.canonical_url(&joined)?;
        Ok(Resolved::Internal {
            href: format!("{}{}", url.path(), suffix),
            url,
        })
    }

    /// Resolves the source of an image. Images follow the same path rules as
    /// links, but the caller only ever needs the rewritten `src`.
    pub fn resolve_image(&self, target: &str) -> Result<String> {
        Ok(match self.resolve_link(target)? {
            Resolved::External(src) | Resolved::Local(src) | Resolved::Asset(src) => src,
            Resolved::Internal { href, .. } => href,
        })
    }

    fn join(&self, path: &str) -> Result<Url> {
        let trimmed = path.trim_end_matches('/');
        match path.starts_with('/') {
            true => self.root.join(trimmed.trim_start_matches('/')),
            false => self.anchor.join(trimmed),
        }
    }

    // Maps a joined target onto the canonical URL of the page it names.
    fn canonical_url(&self, joined: &Url) -> Result<Url> {
        let relative = relative_path(self.root, joined);
        let mut segments: Vec<String> = relative
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect();

        if segments.is_empty() {
            return Ok(self.root.clone());
        }

        // segment_slug drops `.md` along with any date prefix
        let mut slugs: Vec<String> = segments.iter().map(|s| segment_slug(s)).collect();
        if slugs.last().map(String::as_str) == Some("index") {
            slugs.pop();
        }
        page_url(self.root, &slugs)
    }
}

fn is_external(target: &str) -> bool {
    target.starts_with("//") || target.starts_with("mailto") || Url::parse(target).is_ok()
}

// Splits `target` into its path and its `?query#fragment` suffix.
fn split_suffix(target: &str) -> (&str, &str) {
    match target.find(|c| c == '?' || c == '#') {
        Some(i) => (&target[..i], &target[i..]),
        None => (target, ""),
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod test {
    use super::*;

    fn root() -> Url {
        site_root(&Url::parse("https://example.org").unwrap())
    }

    fn statics() -> Vec<String> {
        vec!["pdf".to_owned(), "png".to_owned()]
    }

    fn fixture(page_path: &str, dir_index: bool, wanted: &str, target: &str) -> Result<()> {
        let root = root();
        let statics = statics();
        let resolver = LinkResolver::new(&root, page_path, dir_index, &statics)?;
        let found = match resolver.resolve_link(target)? {
            Resolved::Internal { href, .. } => href,
            Resolved::External(href) | Resolved::Local(href) | Resolved::Asset(href) => href,
        };
        assert_eq!(wanted, found, "resolving `{}` from `{}`", target, page_path);
        Ok(())
    }

    #[test]
    fn test_relative_sibling() -> Result<()> {
        fixture("some-page", false, "/some-file", "some-file.md")
    }

    #[test]
    fn test_relative_parent() -> Result<()> {
        fixture("pages/notes/another-page", false, "/pages/some-page", "../some-page.md")
    }

    #[test]
    fn test_relative_from_dir_index() -> Result<()> {
        fixture("pages/notes", true, "/pages/notes/some-page", "some-page")?;
        fixture("pages/notes", true, "/pages/notes/sibling", "./sibling.md")
    }

    #[test]
    fn test_relative_from_root_index() -> Result<()> {
        fixture("", true, "/pages/intro", "pages/intro.md")
    }

    #[test]
    fn test_absolute_path() -> Result<()> {
        fixture("pages/notes/another-page", false, "/guides/setup", "/guides/setup.md")
    }

    #[test]
    fn test_trailing_slash_and_index_collapse() -> Result<()> {
        fixture("pages/a", false, "/pages/notes", "notes/")?;
        fixture("pages/a", false, "/pages/notes", "notes/index.md")?;
        fixture("pages/a", false, "/", "../index.md")
    }

    #[test]
    fn test_date_prefix_stripped() -> Result<()> {
        fixture("posts/a", false, "/posts/launch", "2021-01-01-launch.md")
    }

    #[test]
    fn test_segments_slugified() -> Result<()> {
        fixture("a", false, "/my-notes/first-steps", "My%20Notes/First%20Steps.md")
    }

    #[test]
    fn test_asset_keeps_extension() -> Result<()> {
        fixture("pages/a", false, "/pages/some-file.pdf", "some-file.pdf")?;
        fixture("pages/a", false, "/pages/Some%20File.pdf", "Some File.pdf")?;
        fixture("pages/a", false, "/img/Cat.PNG#x", "../img/Cat.PNG#x")
    }

    #[test]
    fn test_dotted_names_are_pages() -> Result<()> {
        fixture("pages/a", false, "/pages/notes-d", "notes.d/")?;
        fixture("pages/a", false, "/pages/notes-d/x", "notes.d/x.md")?;
        fixture("pages/a", false, "/pages/v1-2", "v1.2")?;
        fixture("pages/a", false, "/pages/v1-2", "v1.2.md")?;
        fixture("pages/a", false, "/pages/archive-zip", "archive.zip")
    }

    #[test]
    fn test_markdown_extension_any_case() -> Result<()> {
        fixture("pages/a", false, "/pages/notes", "Notes.MD")?;
        fixture("pages/a", false, "/pages/sub", "sub/INDEX.MD")
    }

    #[test]
    fn test_asset_is_not_a_page() -> Result<()> {
        let root = root();
        let statics = statics();
        let resolver = LinkResolver::new(&root, "a", false, &statics)?;
        assert_eq!(Resolved::Asset("/doc.pdf".to_owned()), resolver.resolve_link("doc.pdf")?);
        Ok(())
    }

    #[test]
    fn test_fragment_and_query_preserved() -> Result<()> {
        fixture("pages/a", false, "/pages/b#intro", "b.md#intro")?;
        fixture("pages/a", false, "/pages/b?x=1#y", "b.md?x=1#y")
    }

    #[test]
    fn test_local_and_external() -> Result<()> {
        fixture("pages/a", false, "#intro", "#intro")?;
        fixture("pages/a", false, "https://remote.org/a.md", "https://remote.org/a.md")?;
        fixture("pages/a", false, "mailto:me@example.org", "mailto:me@example.org")?;
        fixture("pages/a", false, "//cdn.example.org/x.js", "//cdn.example.org/x.js")
    }

    #[test]
    fn test_internal_url_has_no_fragment() -> Result<()> {
        let root = root();
        let resolver = LinkResolver::new(&root, "a", false, &[])?;
        match resolver.resolve_link("b.md#top")? {
            Resolved::Internal { url, .. } => {
                assert_eq!("https://example.org/b", url.as_str())
            }
            other => panic!("expected internal link, found {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_base_with_path_prefix() -> Result<()> {
        let root = site_root(&Url::parse("https://example.org/blog")?);
        assert_eq!("https://example.org/blog/", root.as_str());
        let resolver = LinkResolver::new(&root, "notes/a", false, &[])?;
        assert_eq!("/blog/notes/b", resolver.resolve_image("b")?);
        assert_eq!("/blog/top", resolver.resolve_image("/top.md")?);
        Ok(())
    }

    #[test]
    fn test_url_path_and_parent() -> Result<()> {
        let url = Url::parse("https://example.org/a/b/")?;
        assert_eq!("/a/b", url_path(&url));
        assert_eq!(Some("/a"), parent_path("/a/b"));
        assert_eq!(Some("/"), parent_path("/a"));
        assert_eq!(None, parent_path("/"));
        Ok(())
    }
}
