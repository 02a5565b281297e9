//! Walks the content directory and classifies what it finds.
//!
//! Three kinds of entries come out of a scan:
//!
//! 1. Content files (`*.md`), each of which becomes a page.
//! 2. Directories, which become bare directory-index pages. A directory only
//!    qualifies if it has no `index.md` of its own (that file already stands
//!    for it) and at least one content file somewhere beneath it.
//! 3. Static assets, matched by extension, handed on untouched.
//!
//! Any path segment starting with `.` or `_` (or with one of the configured
//! exclusion prefixes) removes its whole subtree from the scan.

use crate::naming::{is_index_file_name, MARKDOWN_EXTENSION};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Whether a [`SourceEntry`] is a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One filesystem node under the content root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceEntry {
    /// The path on disk.
    pub path: PathBuf,

    /// The path relative to the content root. Empty for the root itself.
    pub relative: PathBuf,

    pub kind: EntryKind,

    /// The file or directory name.
    pub name: String,
}

impl SourceEntry {
    /// Returns true for a content file named `index.md`, in any case.
    pub fn is_index_file(&self) -> bool {
        self.kind == EntryKind::File && is_index_file_name(&self.name)
    }
}

/// The result of a scan, in walk order (sorted by name at each level).
#[derive(Debug, Default)]
pub struct Scan {
    /// Content files and qualifying directories.
    pub pages: Vec<SourceEntry>,

    /// Files whose extension is in the static allow-list.
    pub static_files: Vec<SourceEntry>,
}

/// Knobs for [`scan`].
pub struct ScanOptions<'a> {
    /// Extra path-segment prefixes to exclude.
    pub exclude: &'a [String],

    /// Extensions (without dot, case-insensitive) of static assets.
    pub static_extensions: &'a [String],
}

/// Walks `root`. Fails only if the root itself can't be read; unreadable
/// entries below it are logged and skipped.
pub fn scan(root: &Path, options: &ScanOptions<'_>) -> Result<Scan> {
    let metadata = std::fs::metadata(root).map_err(|err| Error::Root {
        path: root.to_owned(),
        err,
    })?;
    if !metadata.is_dir() {
        return Err(Error::NotADirectory(root.to_owned()));
    }
    std::fs::read_dir(root).map_err(|err| Error::Root {
        path: root.to_owned(),
        err,
    })?;

    let mut files: Vec<SourceEntry> = Vec::new();
    let mut directories: Vec<SourceEntry> = Vec::new();
    let mut static_files: Vec<SourceEntry> = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !is_excluded(entry.file_name(), options.exclude)
        });

    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let source = source_entry(root, &entry);
        if entry.file_type().is_dir() {
            directories.push(source);
        } else if has_extension(entry.path(), &[MARKDOWN_EXTENSION]) {
            files.push(source);
        } else if has_extension(entry.path(), options.static_extensions) {
            static_files.push(source);
        } else {
            debug!(path = %entry.path().display(), "ignoring file");
        }
    }

    // A directory needs a page of its own if something beneath it is content
    // and nothing inside it already represents it.
    let mut populated: HashSet<&Path> = HashSet::new();
    let mut indexed: HashSet<&Path> = HashSet::new();
    for file in &files {
        let parent = file.relative.parent().unwrap_or_else(|| Path::new(""));
        if file.is_index_file() {
            indexed.insert(parent);
        }
        populated.extend(file.relative.ancestors().skip(1));
    }
    let qualifying: HashSet<PathBuf> = directories
        .iter()
        .map(|dir| dir.relative.as_path())
        .filter(|dir| populated.contains(dir) && !indexed.contains(dir))
        .map(Path::to_path_buf)
        .collect();

    // Interleave the qualifying directories with the files again, keeping
    // walk order: a directory sorts before everything beneath it.
    let mut pages: Vec<SourceEntry> = directories
        .into_iter()
        .filter(|dir| qualifying.contains(&dir.relative))
        .chain(files)
        .collect();
    pages.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(Scan {
        pages,
        static_files,
    })
}

fn source_entry(root: &Path, entry: &DirEntry) -> SourceEntry {
    SourceEntry {
        path: entry.path().to_owned(),
        // strip_prefix shouldn't fail since `root` is always an ancestor of
        // the walked entries
        relative: entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        kind: match entry.file_type().is_dir() {
            true => EntryKind::Directory,
            false => EntryKind::File,
        },
        name: entry.file_name().to_string_lossy().into_owned(),
    }
}

fn is_excluded(name: &OsStr, exclude: &[String]) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.')
        || name.starts_with('_')
        || exclude.iter().any(|prefix| name.starts_with(prefix.as_str()))
}

fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    match path.extension().and_then(OsStr::to_str) {
        None => false,
        Some(ext) => extensions.iter().any(|e| e.as_ref().eq_ignore_ascii_case(ext)),
    }
}

/// Represents the result of a scan.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a fatal scan error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the content root is missing or unreadable.
    #[error("Reading content directory '{}': {err}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when the content root is a file.
    #[error("Content path '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
}
