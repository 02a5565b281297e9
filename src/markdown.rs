//! Converts a page body from Markdown to HTML.
//!
//! [`render`] is a pure function of its inputs: it returns the HTML together
//! with the page's headings and the internal links it found, and keeps no
//! state between calls.

use crate::htmlrenderer::{self, Highlighter};
use crate::url::LinkResolver;
use pulldown_cmark::{Event, Options, Parser, Tag};
use std::collections::HashSet;
use std::io;
use url::{ParseError as UrlParseError, Url};

/// A heading found in a page body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Heading {
    pub text: String,
    pub level: u32,

    /// The heading's anchor. Unique within the page.
    pub slug: String,
}

/// Where the body being rendered lives.
pub struct RenderContext<'a> {
    /// The site root (see [`crate::url::site_root`]).
    pub root: &'a Url,

    /// The page's path relative to `root`, e.g. `pages/notes/another-page`.
    pub path: &'a str,

    /// Whether the page stands for a whole directory. Relative links from a
    /// directory index resolve inside that directory.
    pub dir_index: bool,

    /// Extensions (without dot) of link targets that are static files rather
    /// than pages.
    pub static_extensions: &'a [String],
}

/// Per-call rendering switches.
#[derive(Clone, Copy, Default)]
pub struct RenderOptions<'a> {
    /// Renders code blocks when set. See [`Highlighter`].
    pub highlighter: Option<&'a dyn Highlighter>,
}

/// The output of [`render`].
#[derive(Clone, Debug, PartialEq)]
pub struct Rendered {
    pub html: String,

    /// Fully-qualified targets of internal links, each once.
    pub links: Vec<Url>,

    /// Every heading in document order, including a leading level-1 heading
    /// that was left out of `html`.
    pub headings: Vec<Heading>,
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Renders `markdown` to HTML.
///
/// A level-1 heading at the very start of the body duplicates the page title
/// and is dropped from the HTML; it is still reported in
/// [`Rendered::headings`].
pub fn render(
    markdown: &str,
    context: &RenderContext<'_>,
    options: &RenderOptions<'_>,
) -> Result<Rendered> {
    let resolver = LinkResolver::new(
        context.root,
        context.path,
        context.dir_index,
        context.static_extensions,
    )?;
    let mut events: Vec<Event> = Parser::new_ext(markdown, parser_options()).collect();

    let headings = collect_headings(&events);
    let mut slugs: Vec<String> = headings.iter().map(|h| h.slug.clone()).collect();

    if let Some(Event::Start(Tag::Heading(1))) = events.first() {
        let end = events
            .iter()
            .position(|ev| matches!(ev, Event::End(Tag::Heading(1))))
            .map_or(events.len(), |i| i + 1);
        events.drain(..end);
        slugs.remove(0);
    }

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    let links = htmlrenderer::push_html(
        &mut html,
        events.into_iter(),
        &resolver,
        slugs,
        options.highlighter,
    )?;
    Ok(Rendered {
        html,
        links,
        headings,
    })
}

fn collect_headings(events: &[Event<'_>]) -> Vec<Heading> {
    let mut slugger = Slugger::default();
    let mut headings = Vec::new();
    let mut current: Option<(u32, String)> = None;
    for ev in events {
        match ev {
            Event::Start(Tag::Heading(level)) => current = Some((*level, String::new())),
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = &mut current {
                    buf.push_str(text);
                }
            }
            Event::End(Tag::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    let slug = slugger.slug(&text);
                    headings.push(Heading { text, level, slug });
                }
            }
            _ => {}
        }
    }
    headings
}

/// Hands out slugs that are unique within one page. A repeated slug gets the
/// first free numeric suffix: `intro`, `intro-1`, `intro-2`, ...
#[derive(Default)]
struct Slugger {
    used: HashSet<String>,
}

impl Slugger {
    fn slug(&mut self, text: &str) -> String {
        let base = match slug::slugify(text) {
            s if s.is_empty() => String::from("section"),
            s => s,
        };
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Represents the result of rendering.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error converting markdown to HTML.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned for I/O errors while writing HTML.
    #[error("Writing HTML: {0}")]
    Io(#[from] io::Error),

    /// Returned when the page's own URL can't be formed.
    #[error("Resolving page URL: {0}")]
    UrlParse(#[from] UrlParseError),
}
