//! The library code for the `folio` static site generator. Building a site
//! breaks down into a few distinct steps:
//!
//! 1. Scanning the content directory for Markdown files, the directories
//!    that need pages of their own, and static assets ([`crate::scan`])
//! 2. Building one [`crate::page::Page`] per scanned entry, in parallel
//!    ([`crate::page`])
//! 3. Relating the pages to each other: tags, children, backlinks and dead
//!    links ([`crate::corpus`])
//!
//! The second step is the most involved. Each file is split into its
//! metadata block and body ([`crate::frontmatter`]), and the body is rendered
//! to HTML ([`crate::markdown`]) with every link rewritten from the on-disk
//! path it was written as to the canonical URL of its target
//! ([`crate::url`]). A page's title and date fall back on its file name
//! ([`crate::naming`]) when the metadata doesn't set them.
//!
//! [`crate::build`] strings the steps together and [`crate::feed`] turns the
//! result into an Atom feed.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod corpus;
pub mod feed;
pub mod frontmatter;
pub mod htmlrenderer;
pub mod markdown;
pub mod naming;
pub mod page;
pub mod scan;
pub mod tag;
pub mod url;
