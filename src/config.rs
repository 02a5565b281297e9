//! Site configuration. A project is a directory holding a `folio.yaml` file
//! and (by default) a `content` directory next to it:
//!
//! ```yaml
//! base_url: https://example.org
//! title: My notes
//! author:
//!   name: Jane Doe
//! root_crumb: home
//! ignore_keys: [draft, private]
//! highlight: true
//! ```

use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "folio.yaml";

/// The author credited in the feed.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct Project {
    base_url: Url,

    #[serde(default)]
    title: String,

    #[serde(default)]
    author: Option<Author>,

    #[serde(default = "default_root_crumb")]
    root_crumb: String,

    #[serde(default = "default_content_directory")]
    content_directory: PathBuf,

    #[serde(default = "default_ignore_keys")]
    ignore_keys: Vec<String>,

    #[serde(default = "default_static_extensions")]
    static_extensions: Vec<String>,

    #[serde(default)]
    exclude: Vec<String>,

    #[serde(default)]
    highlight: bool,

    #[serde(default = "default_feed_size")]
    feed_size: usize,

    #[serde(default)]
    use_file_mtime: bool,

    #[serde(default)]
    threads: Option<usize>,
}

fn default_root_crumb() -> String {
    String::from("home")
}

fn default_content_directory() -> PathBuf {
    PathBuf::from("content")
}

fn default_ignore_keys() -> Vec<String> {
    vec![String::from("draft"), String::from("private")]
}

fn default_static_extensions() -> Vec<String> {
    [
        "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "pdf", "css", "js", "woff",
        "woff2", "txt",
    ]
    .iter()
    .map(|ext| (*ext).to_owned())
    .collect()
}

fn default_feed_size() -> usize {
    20
}

/// The read-only configuration every stage of a build consumes.
#[derive(Clone, Debug)]
pub struct Config {
    /// The site's base URL. Page URLs are built beneath it.
    pub base_url: Url,

    /// The feed title.
    pub title: String,

    /// The feed author, if any.
    pub author: Option<Author>,

    /// The label of the first breadcrumb, and the title of the root page when
    /// the root has no `index.md`.
    pub root_crumb: String,

    /// The directory scanned for content.
    pub content_directory: PathBuf,

    /// Metadata keys which, when `true`, leave a page out of the build.
    pub ignore_keys: Vec<String>,

    /// Extensions (without dot) of files reported as static assets.
    pub static_extensions: Vec<String>,

    /// Path-segment prefixes excluded from the scan, in addition to hidden
    /// (`.`) and underscored (`_`) names.
    pub exclude: Vec<String>,

    /// Whether code blocks go through the highlighter.
    pub highlight: bool,

    /// The maximum number of entries in the feed.
    pub feed_size: usize,

    /// Fall back to the file's modification time for undated pages.
    /// Deprecated: dates should come from metadata or the file name.
    pub use_file_mtime: bool,

    /// The number of worker threads for page building. `None` lets rayon
    /// decide.
    pub threads: Option<usize>,
}

impl Config {
    /// Creates a configuration with every optional setting at its default.
    pub fn new(base_url: Url, content_directory: impl Into<PathBuf>) -> Config {
        Config {
            base_url,
            title: String::new(),
            author: None,
            root_crumb: default_root_crumb(),
            content_directory: content_directory.into(),
            ignore_keys: default_ignore_keys(),
            static_extensions: default_static_extensions(),
            exclude: Vec::new(),
            highlight: false,
            feed_size: default_feed_size(),
            use_file_mtime: false,
            threads: None,
        }
    }

    /// Searches `dir` and then each of its ancestors for a [`PROJECT_FILE`]
    /// and loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            let path = dir.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            current = dir.parent();
        }
        Err(Error::ProjectFileNotFound(dir.to_owned()))
    }

    /// Loads the configuration from a project file. Relative directories are
    /// resolved against the file's directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_reader(file).map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })?;
        let project_root = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Config {
            base_url: project.base_url,
            title: project.title,
            author: project.author,
            root_crumb: project.root_crumb,
            content_directory: project_root.join(project.content_directory),
            ignore_keys: project.ignore_keys,
            static_extensions: project.static_extensions,
            exclude: project.exclude,
            highlight: project.highlight,
            feed_size: project.feed_size,
            use_file_mtime: project.use_file_mtime,
            threads: project.threads,
        })
    }
}

/// Represents the result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when no project file exists in the directory or its
    /// ancestors.
    #[error("Could not find `{}` in '{}' or any parent directory", PROJECT_FILE, .0.display())]
    ProjectFileNotFound(PathBuf),

    /// Returned when the project file can't be opened.
    #[error("Opening project file '{}': {err}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when the project file isn't valid.
    #[error("Parsing project file '{}': {err}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        err: serde_yaml::Error,
    },
}
