//! Name handling shared by page URL derivation and link rewriting. Both sides
//! must agree exactly, otherwise a link written as `2021-01-01-intro.md` would
//! not land on the page built from that file.
//!
//! Source names may carry a leading `YYYY-MM-DD-` (or `YYYY-MM-DD_`) date
//! prefix. The prefix is stripped before slugifying, and when it is a real
//! calendar date it doubles as the page's publication date.

use chrono::NaiveDate;

/// The extension of content files, without the dot.
pub const MARKDOWN_EXTENSION: &str = "md";

/// The name of the file that stands in for its directory.
pub const INDEX_FILE: &str = "index.md";

const DATE_PREFIX_LEN: usize = 10;

/// Splits a `YYYY-MM-DD-` or `YYYY-MM-DD_` prefix off of `name`. Only the
/// shape is checked here; see [`date_prefix`] for calendar validation.
///
/// - `"2021-01-01-test"` → `(Some("2021-01-01"), "test")`
/// - `"test"` → `(None, "test")`
pub fn split_date_prefix(name: &str) -> (Option<&str>, &str) {
    let bytes = name.as_bytes();
    if bytes.len() <= DATE_PREFIX_LEN {
        return (None, name);
    }
    let shaped = bytes[..DATE_PREFIX_LEN]
        .iter()
        .enumerate()
        .all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    match shaped && matches!(bytes[DATE_PREFIX_LEN], b'-' | b'_') {
        true => (
            Some(&name[..DATE_PREFIX_LEN]),
            &name[DATE_PREFIX_LEN + 1..],
        ),
        false => (None, name),
    }
}

/// Parses the date prefix of `name`, if there is one and it names a real
/// calendar day.
pub fn date_prefix(name: &str) -> Option<NaiveDate> {
    let (prefix, _) = split_date_prefix(name);
    prefix.and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok())
}

/// Removes a trailing `.md` (in any case) from `name`.
pub fn strip_markdown_extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.split_at(name.rfind('.')?);
    match ext[1..].eq_ignore_ascii_case(MARKDOWN_EXTENSION) {
        true => Some(stem),
        false => None,
    }
}

/// Returns true if `name` is the file that stands in for its directory.
pub fn is_index_file_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(INDEX_FILE)
}

/// Returns the name without date prefix and without `.md` extension. This is
/// what titles fall back to when nothing better is known.
pub fn display_name(name: &str) -> &str {
    let stem = strip_markdown_extension(name).unwrap_or(name);
    split_date_prefix(stem).1
}

/// The slug of a segment with nothing sluggable in it, like `!!!.md`.
pub const EMPTY_SEGMENT_SLUG: &str = "untitled";

/// Turns one path segment into its URL form.
pub fn segment_slug(name: &str) -> String {
    match slug::slugify(display_name(name)) {
        s if s.is_empty() => String::from(EMPTY_SEGMENT_SLUG),
        s => s,
    }
}

/// Returns true if the last segment of `path` carries one of `extensions`
/// (without dot, compared case-insensitively).
pub fn has_asset_extension<S: AsRef<str>>(path: &str, extensions: &[S]) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rfind('.') {
        Some(0) | None => false,
        Some(i) => extensions
            .iter()
            .any(|ext| ext.as_ref().eq_ignore_ascii_case(&last[i + 1..])),
    }
}
