//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building a site: scanning the content directory
//! ([`crate::scan`]), building the pages ([`crate::page`]), and checking the
//! links between them ([`crate::corpus`]). [`write_feed_file`] writes the
//! Atom feed for a built site.

use crate::config::Config;
use crate::corpus::{dead_links, DeadLink};
use crate::feed::{write_feed, Error as FeedError, FeedConfig};
use crate::htmlrenderer::{Highlighter, LineHighlighter};
use crate::page::{Error as PageError, Page, PageBuilder};
use crate::scan::{scan, Error as ScanError, ScanOptions, SourceEntry};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

/// The name of the feed file written by [`write_feed_file`].
pub const FEED_FILE: &str = "feed.atom";

/// The result of a build.
#[derive(Debug)]
pub struct Site {
    /// The root URL every page lives beneath.
    pub root: Url,

    /// All pages, in scan order.
    pub pages: Vec<Page>,

    /// Static assets found alongside the content.
    pub static_files: Vec<SourceEntry>,

    /// Internal links to pages that don't exist.
    pub dead_links: Vec<DeadLink>,
}

/// Builds the site from a [`Config`] object. This calls into [`scan`],
/// [`PageBuilder::build_pages`] and [`dead_links`] which do the
/// heavy-lifting. Dead links are logged but don't fail the build.
pub fn build_site(config: &Config) -> Result<Site> {
    let scan = scan(
        &config.content_directory,
        &ScanOptions {
            exclude: &config.exclude,
            static_extensions: &config.static_extensions,
        },
    )?;
    info!(
        entries = scan.pages.len(),
        static_files = scan.static_files.len(),
        "scanned {}",
        config.content_directory.display()
    );

    let highlighter = LineHighlighter;
    let builder = PageBuilder::new(
        config,
        match config.highlight {
            true => Some(&highlighter as &dyn Highlighter),
            false => None,
        },
    );
    let pages = builder.build_pages(&scan.pages)?;
    info!(pages = pages.len(), "built pages");

    let dead_links = dead_links(&pages);
    for link in &dead_links {
        warn!(from = %link.from, to = %link.to, "dead link");
    }

    Ok(Site {
        root: builder.root().clone(),
        pages,
        static_files: scan.static_files,
        dead_links,
    })
}

/// Writes the Atom feed for `site` to [`FEED_FILE`] in `output_directory`,
/// creating the directory if needed. Returns the path written.
pub fn write_feed_file(
    config: &Config,
    site: &Site,
    output_directory: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_directory).map_err(|err| Error::Output {
        path: output_directory.to_owned(),
        err,
    })?;
    let path = output_directory.join(FEED_FILE);
    let file = File::create(&path).map_err(|err| Error::Output {
        path: path.clone(),
        err,
    })?;
    write_feed(
        &FeedConfig {
            title: &config.title,
            author: config.author.as_ref(),
            home_page: &site.root,
            size: config.feed_size,
        },
        &site.pages,
        BufWriter::new(file),
    )?;
    info!(path = %path.display(), "wrote feed");
    Ok(path)
}

/// The result of a fallible build operation.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during scanning, page
/// building, feed writing, and other output I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the content directory can't be scanned.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Returned for errors that fail the whole page set.
    #[error(transparent)]
    Page(#[from] PageError),

    /// Returned for errors writing the feed.
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Returned for I/O problems creating output files.
    #[error("Writing '{}': {err}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
