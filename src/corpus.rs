//! Relationships across the whole set of built pages: tags, children,
//! backlinks, dead links, display order and breadcrumbs.
//!
//! Everything here is a pure function over a slice of [`Page`]s. Pages are
//! compared by URL path (see [`crate::url::url_path`]), and an empty corpus
//! yields empty results.

use crate::page::Page;
use crate::tag::Tag;
use crate::url::{parent_path, relative_path, url_path};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use url::Url;

/// A tag together with the pages carrying it, in corpus order.
pub type TaggedPages<'p> = Vec<(Tag, Vec<&'p Page>)>;

/// An internal link whose target matches no page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeadLink {
    pub from: Url,
    pub to: Url,
}

/// One step on the path from the site root to a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Crumb {
    /// The path segment, or the root label for the first crumb.
    pub slug: String,
    pub url: Url,

    /// Set on the last crumb, which is the page itself.
    pub current: bool,
}

/// All tag names in first-seen order.
pub fn tags(pages: &[Page]) -> Vec<&str> {
    let mut seen: HashSet<&str> = HashSet::new();
    pages
        .iter()
        .flat_map(|page| page.tags.iter().map(String::as_str))
        .filter(|tag| seen.insert(*tag))
        .collect()
}

/// The pages carrying `tag`.
pub fn pages_by_tag<'p>(pages: &'p [Page], tag: &str) -> Vec<&'p Page> {
    pages.iter().filter(|page| page.has_tag(tag)).collect()
}

/// Groups the pages by tag, tags in first-seen order. `root` is the site
/// root the tag URLs are built beneath.
pub fn tag_index<'p>(root: &Url, pages: &'p [Page]) -> TaggedPages<'p> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut index: TaggedPages<'p> = Vec::new();
    for page in pages {
        for tag in &page.tags {
            let position = *positions.entry(tag.as_str()).or_insert_with(|| {
                index.push((Tag::new(root, tag), Vec::new()));
                index.len() - 1
            });
            index[position].1.push(page);
        }
    }
    index
}

/// Orders tags by descending page count. Ties keep their order.
pub fn sort_tagged_pages(index: &mut TaggedPages<'_>) {
    index.sort_by(|(_, a), (_, b)| b.len().cmp(&a.len()));
}

/// The pages exactly one level below `current`.
pub fn child_pages<'p>(current: &Page, pages: &'p [Page]) -> Vec<&'p Page> {
    let path = current.path();
    pages
        .iter()
        .filter(|page| parent_path(page.path()) == Some(path))
        .collect()
}

/// The pages anywhere below `current`.
pub fn all_child_pages<'p>(current: &Page, pages: &'p [Page]) -> Vec<&'p Page> {
    let path = current.path();
    pages
        .iter()
        .filter(|page| is_descendant(page.path(), path))
        .collect()
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    if path == ancestor {
        return false;
    }
    match ancestor {
        "/" => true,
        _ => path
            .strip_prefix(ancestor)
            .map_or(false, |rest| rest.starts_with('/')),
    }
}

/// The other pages linking to `current`.
pub fn backlinks<'p>(current: &Page, pages: &'p [Page]) -> Vec<&'p Page> {
    let path = current.path();
    pages
        .iter()
        .filter(|page| page.path() != path && page.links_to(&current.url))
        .collect()
}

/// The other pages sharing at least one tag with `current`.
pub fn related_pages<'p>(current: &Page, pages: &'p [Page]) -> Vec<&'p Page> {
    let path = current.path();
    pages
        .iter()
        .filter(|page| page.path() != path)
        .filter(|page| page.tags.iter().any(|tag| current.has_tag(tag)))
        .collect()
}

/// Every internal link whose target matches no page. Links to static files
/// never get this far; they are not recorded on the page.
pub fn dead_links(pages: &[Page]) -> Vec<DeadLink> {
    let known: HashSet<&str> = pages.iter().map(Page::path).collect();
    pages
        .iter()
        .flat_map(|page| page.links.iter().map(move |link| (page, link)))
        .filter(|(_, link)| !known.contains(url_path(link)))
        .map(|(page, link)| DeadLink {
            from: page.url.clone(),
            to: link.clone(),
        })
        .collect()
}

/// Sorts pages for display: directory indexes, then pinned pages, then
/// newest first. Undated pages come after dated ones. The sort is stable.
pub fn sort_pages(pages: &mut [&Page]) {
    pages.sort_by(|a, b| {
        b.is_dir_index()
            .cmp(&a.is_dir_index())
            .then_with(|| b.pinned.cmp(&a.pinned))
            .then_with(|| match (a.date_published, b.date_published) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
}

/// The breadcrumbs from the site root down to `page`. The first crumb is
/// labeled `root_label`; the last is marked current.
pub fn crumbs(page: &Page, root: &Url, root_label: &str) -> Vec<Crumb> {
    let relative = relative_path(root, &page.url);
    let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();

    let mut crumbs = Vec::with_capacity(segments.len() + 1);
    let mut url = root.clone();
    crumbs.push(Crumb {
        slug: root_label.to_owned(),
        url: url.clone(),
        current: segments.is_empty(),
    });
    let mut path = root.path().trim_end_matches('/').to_owned();
    for (i, segment) in segments.iter().enumerate() {
        path.push('/');
        path.push_str(segment);
        url.set_path(&path);
        crumbs.push(Crumb {
            slug: (*segment).to_owned(),
            url: url.clone(),
            current: i + 1 == segments.len(),
        });
    }
    crumbs
}

/// Looks a page up by URL path.
pub fn find_page<'p>(pages: &'p [Page], url: &Url) -> Option<&'p Page> {
    let path = url_path(url);
    pages.iter().find(|page| page.path() == path)
}
