//! Defines the [`Page`] type and the [`PageBuilder`], which turns scanned
//! [`SourceEntry`]s into pages.
//!
//! There are three ways to get a page:
//!
//! * A content file `notes/2021-01-01-intro.md` becomes `/notes/intro`.
//! * An `index.md` stands for its directory: `notes/index.md` becomes
//!   `/notes`, and its relative links resolve inside `notes/`.
//! * A directory without `index.md` but with content beneath it becomes a
//!   placeholder page carrying only a title and a URL.

use crate::config::Config;
use crate::frontmatter::{self, Layout};
use crate::htmlrenderer::Highlighter;
use crate::markdown::{self, Heading, RenderContext, RenderOptions};
use crate::naming::{date_prefix, display_name, segment_slug};
use crate::scan::{EntryKind, SourceEntry};
use crate::url::{page_url, site_root, url_path};
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use url::Url;

/// Whether a page represents a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexKind {
    None,
    Dir,
}

/// One resolvable unit of site content.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    /// The page's identity. Two pages are the same page iff their URL paths
    /// are equal.
    pub url: Url,

    pub title: Option<String>,
    pub description: Option<String>,
    pub date_published: Option<NaiveDate>,
    pub date_updated: Option<NaiveDate>,

    /// Display order is the order in the metadata block.
    pub tags: Vec<String>,

    /// The Markdown body, without the metadata block.
    pub body: String,
    pub html: String,
    pub headings: Vec<Heading>,

    /// Targets of the page's internal links (see
    /// [`crate::markdown::Rendered::links`]).
    pub links: Vec<Url>,

    pub index: IndexKind,
    pub pinned: bool,
    pub ignored: bool,
    pub unlisted: bool,
    pub show_header: bool,
    pub show_toc: bool,
    pub layout: Option<Layout>,
    pub thumbnail_url: Option<serde_yaml::Value>,

    /// The file or directory the page was built from.
    pub source: PathBuf,
}

impl Page {
    /// Creates an empty page at `url`.
    pub fn new(url: Url, index: IndexKind, source: impl Into<PathBuf>) -> Page {
        Page {
            url,
            title: None,
            description: None,
            date_published: None,
            date_updated: None,
            tags: Vec::new(),
            body: String::new(),
            html: String::new(),
            headings: Vec::new(),
            links: Vec::new(),
            index,
            pinned: false,
            ignored: false,
            unlisted: false,
            show_header: true,
            show_toc: false,
            layout: None,
            thumbnail_url: None,
            source: source.into(),
        }
    }

    /// The URL path identifying this page (see [`url_path`]).
    pub fn path(&self) -> &str {
        url_path(&self.url)
    }

    pub fn is_dir_index(&self) -> bool {
        self.index == IndexKind::Dir
    }

    /// Returns true if the page carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns true if this page links to `url` (compared by path).
    pub fn links_to(&self, url: &Url) -> bool {
        let path = url_path(url);
        self.links.iter().any(|link| url_path(link) == path)
    }
}

/// Builds [`Page`] objects from scanned entries.
pub struct PageBuilder<'a> {
    config: &'a Config,

    /// `config.base_url` with a trailing slash.
    root: Url,

    highlighter: Option<&'a dyn Highlighter>,
}

impl<'a> PageBuilder<'a> {
    /// Constructs a new builder. `highlighter` is used for code blocks when
    /// set.
    pub fn new(
        config: &'a Config,
        highlighter: Option<&'a dyn Highlighter>,
    ) -> PageBuilder<'a> {
        PageBuilder {
            config,
            root: site_root(&config.base_url),
            highlighter,
        }
    }

    /// The site root URL pages are built beneath.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Builds pages for all `entries` in parallel, in the order given. An
    /// entry that fails to build is logged and left out; ignored pages are
    /// dropped. Two pages claiming the same URL is an error.
    pub fn build_pages(&self, entries: &[SourceEntry]) -> Result<Vec<Page>> {
        let pages: Vec<Page> = entries
            .par_iter()
            .filter_map(|entry| match self.build_page(entry) {
                Ok(page) if page.ignored => {
                    debug!(path = %entry.path.display(), "ignoring page");
                    None
                }
                Ok(page) => Some(page),
                Err(err) => {
                    warn!(path = %entry.path.display(), error = %err, "skipping page");
                    None
                }
            })
            .collect();
        check_unique(&pages)?;
        Ok(pages)
    }

    /// Builds the page for a single entry.
    pub fn build_page(&self, entry: &SourceEntry) -> Result<Page> {
        match entry.kind {
            EntryKind::Directory => self.build_directory(entry),
            EntryKind::File if entry.is_index_file() => {
                let dir = entry.relative.parent().unwrap_or_else(|| Path::new(""));
                let dir_name = dir.file_name().map(|n| n.to_string_lossy().into_owned());
                let fallback = match &dir_name {
                    Some(name) => display_name(name).to_owned(),
                    None => self.config.root_crumb.clone(),
                };
                let date = dir_name.as_deref().and_then(date_prefix);
                self.build_file(entry, IndexKind::Dir, slugs(dir), fallback, date)
            }
            EntryKind::File => self.build_file(
                entry,
                IndexKind::None,
                slugs(&entry.relative),
                display_name(&entry.name).to_owned(),
                date_prefix(&entry.name),
            ),
        }
    }

    fn build_directory(&self, entry: &SourceEntry) -> Result<Page> {
        let mut page = Page::new(
            page_url(&self.root, &slugs(&entry.relative))?,
            IndexKind::Dir,
            &entry.path,
        );
        page.title = Some(match entry.relative.as_os_str().is_empty() {
            true => self.config.root_crumb.clone(),
            false => display_name(&entry.name).to_owned(),
        });
        Ok(page)
    }

    fn build_file(
        &self,
        entry: &SourceEntry,
        index: IndexKind,
        segments: Vec<String>,
        fallback_title: String,
        filename_date: Option<NaiveDate>,
    ) -> Result<Page> {
        let input = std::fs::read_to_string(&entry.path).map_err(|err| Error::Read {
            path: entry.path.clone(),
            err,
        })?;
        let document = frontmatter::parse(&input).map_err(|err| Error::Metadata {
            path: entry.path.clone(),
            err,
        })?;

        let path = segments.join("/");
        let rendered = markdown::render(
            document.body,
            &RenderContext {
                root: &self.root,
                path: &path,
                dir_index: index == IndexKind::Dir,
                static_extensions: &self.config.static_extensions,
            },
            &RenderOptions {
                highlighter: self.highlighter,
            },
        )
        .map_err(|err| Error::Render {
            path: entry.path.clone(),
            err,
        })?;

        let metadata = document.metadata;
        let ignored = metadata.is_ignored(&self.config.ignore_keys);
        let first_h1 = rendered
            .headings
            .iter()
            .find(|h| h.level == 1)
            .map(|h| h.text.clone());
        let date_published = metadata
            .date
            .or(filename_date)
            .or_else(|| match self.config.use_file_mtime {
                true => modified_date(&entry.path),
                false => None,
            });

        Ok(Page {
            url: page_url(&self.root, &segments)?,
            title: metadata.title.or(first_h1).or(Some(fallback_title)),
            description: metadata.description,
            date_published,
            date_updated: metadata.date_updated,
            tags: metadata.tags,
            body: document.body.to_owned(),
            html: rendered.html,
            headings: rendered.headings,
            links: rendered.links,
            index,
            pinned: metadata.pinned,
            ignored,
            unlisted: metadata.unlisted,
            show_header: metadata.show_header,
            show_toc: metadata.show_toc,
            layout: metadata.layout,
            thumbnail_url: metadata.thumbnail_url,
            source: entry.path.clone(),
        })
    }
}

// The URL segments for a path relative to the content root.
fn slugs(relative: &Path) -> Vec<String> {
    relative
        .components()
        .map(|c| segment_slug(&c.as_os_str().to_string_lossy()))
        .collect()
}

fn modified_date(path: &Path) -> Option<NaiveDate> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified).naive_utc().date())
}

fn check_unique(pages: &[Page]) -> Result<()> {
    let mut seen: HashMap<&str, &Path> = HashMap::with_capacity(pages.len());
    for page in pages {
        if let Some(first) = seen.insert(page.path(), &page.source) {
            return Err(Error::DuplicateUrl {
                url: page.url.clone(),
                first: first.to_owned(),
                second: page.source.clone(),
            });
        }
    }
    Ok(())
}

/// Represents the result of a page-building operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error building a [`Page`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a source file can't be read.
    #[error("Reading '{}': {err}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when a source file's metadata block is malformed.
    #[error("Parsing metadata in '{}': {err}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        err: frontmatter::Error,
    },

    /// Returned when a source file's body can't be rendered.
    #[error("Rendering '{}': {err}", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        err: markdown::Error,
    },

    /// Returned when there is a problem building a page URL.
    #[error("Building page URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Returned when two source entries map onto the same URL.
    #[error("'{}' and '{}' both map to {url}", .first.display(), .second.display())]
    DuplicateUrl {
        url: Url,
        first: PathBuf,
        second: PathBuf,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::corpus::dead_links;
    use crate::scan::{scan, ScanOptions};
    use pretty_assertions::assert_eq;
    use std::fs;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn write(root: &Path, relative: &str, contents: &str) -> std::io::Result<()> {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    }

    fn build(root: &Path) -> Result<Vec<Page>> {
        let config = Config::new(Url::parse("https://example.org").unwrap(), root);
        let scan = scan(
            root,
            &ScanOptions {
                exclude: &config.exclude,
                static_extensions: &config.static_extensions,
            },
        )
        .unwrap();
        PageBuilder::new(&config, None).build_pages(&scan.pages)
    }

    fn find<'p>(pages: &'p [Page], path: &str) -> &'p Page {
        pages
            .iter()
            .find(|p| p.path() == path)
            .unwrap_or_else(|| panic!("no page at {}", path))
    }

    #[test]
    fn test_directory_index_title_from_metadata() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "notes/index.md", "---\ntitle: \"Notes\"\n---\nSome text.\n")?;
        let pages = build(dir.path())?;
        let notes = find(&pages, "/notes");
        assert_eq!(Some("Notes".to_owned()), notes.title);
        assert_eq!(IndexKind::Dir, notes.index);
        Ok(())
    }

    #[test]
    fn test_content_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(
            dir.path(),
            "posts/2021-01-01-First Post.md",
            "---\ntags: [a, b]\npinned: true\n---\n# Welcome\n\nSee [the other](other.md).\n",
        )?;
        write(dir.path(), "posts/other.md", "No title here.\n")?;
        let pages = build(dir.path())?;

        let first = find(&pages, "/posts/first-post");
        assert_eq!("https://example.org/posts/first-post", first.url.as_str());
        assert_eq!(Some("Welcome".to_owned()), first.title);
        assert_eq!(NaiveDate::from_ymd_opt(2021, 1, 1), first.date_published);
        assert_eq!(vec!["a", "b"], first.tags);
        assert!(first.pinned);
        assert_eq!(IndexKind::None, first.index);
        assert_eq!(vec![Url::parse("https://example.org/posts/other")?], first.links);
        assert!(!first.html.contains("<h1"));

        let other = find(&pages, "/posts/other");
        assert_eq!(Some("other".to_owned()), other.title);
        assert_eq!(None, other.date_published);
        Ok(())
    }

    #[test]
    fn test_bare_directories() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "Guides/setup.md", "Setup\n")?;
        let pages = build(dir.path())?;

        let root = find(&pages, "/");
        assert_eq!(Some("home".to_owned()), root.title);
        assert!(root.is_dir_index());

        let guides = find(&pages, "/guides");
        assert_eq!(Some("Guides".to_owned()), guides.title);
        assert!(guides.is_dir_index());
        assert!(guides.body.is_empty() && guides.links.is_empty() && guides.tags.is_empty());
        Ok(())
    }

    #[test]
    fn test_dir_index_links_resolve_inside_directory() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "pages/notes/index.md", "[link](some-page)\n")?;
        write(dir.path(), "pages/notes/some-page.md", "x\n")?;
        let pages = build(dir.path())?;
        let notes = find(&pages, "/pages/notes");
        assert_eq!(
            vec![Url::parse("https://example.org/pages/notes/some-page")?],
            notes.links
        );
        assert_eq!(Some("notes".to_owned()), notes.title);
        Ok(())
    }

    #[test]
    fn test_broken_file_is_skipped() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "good.md", "fine\n")?;
        write(dir.path(), "bad.md", "---\ntitle: [unclosed\n---\n")?;
        let pages = build(dir.path())?;
        let paths: Vec<&str> = pages.iter().map(Page::path).collect();
        assert_eq!(vec!["/", "/good"], paths);
        Ok(())
    }

    #[test]
    fn test_ignored_pages_are_dropped() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "index.md", "home\n")?;
        write(dir.path(), "draft.md", "---\ndraft: true\n---\nwip\n")?;
        write(dir.path(), "hidden.md", "---\nunlisted: true\n---\nstill built\n")?;
        let pages = build(dir.path())?;
        let paths: Vec<&str> = pages.iter().map(Page::path).collect();
        assert_eq!(vec!["/hidden", "/"], paths);
        assert!(find(&pages, "/hidden").unlisted);
        Ok(())
    }

    #[test]
    fn test_duplicate_urls_are_an_error() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "notes.md", "a\n")?;
        write(dir.path(), "notes/index.md", "b\n")?;
        assert!(matches!(build(dir.path()), Err(Error::DuplicateUrl { .. })));
        Ok(())
    }

    #[test]
    fn test_invalid_date_prefix() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "2021-20-00-test.md", "x\n")?;
        let pages = build(dir.path())?;
        let page = find(&pages, "/test");
        assert_eq!(None, page.date_published);
        Ok(())
    }

    #[test]
    fn test_links_to_dotted_names() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(
            dir.path(),
            "index.md",
            "[a](notes.d/) [b](v1.2) [c](notes.d/x.md) [d](v2.0) [e](img/cat.png)\n",
        )?;
        write(dir.path(), "notes.d/x.md", "x\n")?;
        write(dir.path(), "v1.2.md", "y\n")?;
        let pages = build(dir.path())?;
        let paths: Vec<&str> = pages.iter().map(Page::path).collect();
        assert_eq!(vec!["/", "/notes-d", "/notes-d/x", "/v1-2"], paths);

        let home = find(&pages, "/");
        assert!(home.html.contains("href=\"/notes-d\""));
        assert!(home.html.contains("href=\"/img/cat.png\""));
        assert_eq!(
            vec![
                Url::parse("https://example.org/notes-d")?,
                Url::parse("https://example.org/v1-2")?,
                Url::parse("https://example.org/notes-d/x")?,
                Url::parse("https://example.org/v2-0")?,
            ],
            home.links
        );
        let dead: Vec<String> = dead_links(&pages).iter().map(|d| d.to.to_string()).collect();
        assert_eq!(vec!["https://example.org/v2-0"], dead);
        Ok(())
    }

    #[test]
    fn test_upper_case_markdown_names() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "index.md", "[n](Notes.MD) [s](sub/INDEX.MD)\n")?;
        write(dir.path(), "Notes.MD", "---\ntitle: Notes\n---\nx\n")?;
        write(dir.path(), "sub/INDEX.MD", "---\ntitle: Sub\n---\ny\n")?;
        let pages = build(dir.path())?;
        let paths: Vec<&str> = pages.iter().map(Page::path).collect();
        assert_eq!(vec!["/notes", "/", "/sub"], paths);

        let sub = find(&pages, "/sub");
        assert_eq!(IndexKind::Dir, sub.index);
        assert_eq!(Some("Sub".to_owned()), sub.title);
        assert!(dead_links(&pages).is_empty());
        Ok(())
    }

    #[test]
    fn test_unsluggable_name_is_not_the_root() -> TestResult {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "index.md", "[odd](!!!.md)\n")?;
        write(dir.path(), "!!!.md", "odd\n")?;
        let pages = build(dir.path())?;
        let paths: Vec<&str> = pages.iter().map(Page::path).collect();
        assert_eq!(vec!["/untitled", "/"], paths);
        assert_eq!(Some("!!!".to_owned()), find(&pages, "/untitled").title);
        assert!(dead_links(&pages).is_empty());
        Ok(())
    }
}
