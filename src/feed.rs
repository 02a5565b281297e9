//! Support for creating Atom feeds from a list of pages.

use crate::config::Author;
use crate::page::Page;
use atom_syndication::{
    Content, Entry, Error as AtomError, Feed, FixedDateTime, Link, Person, Text,
};
use chrono::{NaiveDate, TimeZone, Utc};
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub title: &'a str,
    pub author: Option<&'a Author>,

    /// The site's home page. Doubles as the feed id.
    pub home_page: &'a Url,

    /// The maximum number of entries.
    pub size: usize,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// [`Page`]s and writes the result to a [`std::io::Write`].
pub fn write_feed<W: Write>(config: &FeedConfig<'_>, pages: &[Page], w: W) -> Result<()> {
    feed(config, pages).write_to(w)?;
    Ok(())
}

/// The pages that make it into the feed: dated, listed pages that aren't
/// directory indexes, newest first, at most `size` of them.
pub fn feed_pages(pages: &[Page], size: usize) -> Vec<&Page> {
    let mut selected: Vec<&Page> = pages
        .iter()
        .filter(|page| page.date_published.is_some() && !page.unlisted && !page.is_dir_index())
        .collect();
    selected.sort_by(|a, b| b.date_published.cmp(&a.date_published));
    selected.truncate(size);
    selected
}

/// Builds the feed. Its `updated` stamp is the date of the newest entry, so
/// the same pages always produce the same feed.
pub fn feed(config: &FeedConfig<'_>, pages: &[Page]) -> Feed {
    let selected = feed_pages(pages, config.size);
    let authors = author_to_people(config.author);

    let mut feed = Feed::default();
    feed.set_title(config.title);
    feed.set_id(config.home_page.as_str());
    feed.set_authors(authors.clone());
    feed.set_links(vec![alternate(config.home_page)]);
    if let Some(newest) = selected
        .first()
        .and_then(|page| page.date_published)
        .and_then(to_datetime)
    {
        feed.set_updated(newest);
    }
    feed.set_entries(
        selected
            .into_iter()
            .filter_map(|page| entry(page, &authors))
            .collect::<Vec<Entry>>(),
    );
    feed
}

fn entry(page: &Page, authors: &[Person]) -> Option<Entry> {
    let date = page.date_published.and_then(to_datetime)?;

    let mut content = Content::default();
    content.set_content_type(Some("html".to_owned()));
    content.set_value(Some(page.html.clone()));

    let mut entry = Entry::default();
    entry.set_id(page.url.as_str());
    entry.set_title(page.title.clone().unwrap_or_default());
    entry.set_updated(date);
    entry.set_published(Some(date));
    entry.set_authors(authors.to_vec());
    entry.set_links(vec![alternate(&page.url)]);
    entry.set_summary(page.description.clone().map(Text::from));
    entry.set_content(Some(content));
    Some(entry)
}

fn alternate(url: &Url) -> Link {
    let mut link = Link::default();
    link.set_href(url.as_str());
    link.set_rel("alternate");
    link
}

// Dates are taken to be midnight UTC.
fn to_datetime(date: NaiveDate) -> Option<FixedDateTime> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight).into())
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name.as_str());
            person.set_email(author.email.clone());
            vec![person]
        }
        None => Vec::new(),
    }
}

/// The result of a fallible feed operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O and Atom
/// issues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    #[error("Writing feed: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when there is an Atom-related error.
    #[error("Encoding feed: {0}")]
    Atom(#[from] AtomError),
}
