//! Splits source files into their YAML metadata block and Markdown body, and
//! decodes the block into a typed [`Metadata`].
//!
//! A source file may begin with a metadata block:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2021-04-16
//! tags: [greet]
//! ---
//! # Hello
//!
//! World
//! ```
//!
//! The block is optional. Fields are decoded leniently: a field holding a
//! value of the wrong type is treated as if it were absent.

use chrono::{DateTime, NaiveDate};
use serde_yaml::{Mapping, Value};

const FENCE: &str = "---";
const END_FENCES: [&str; 2] = ["---", "..."];

/// The closed set of layout hints a page may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    Default,
    Wide,
    Full,
}

impl Layout {
    fn parse(s: &str) -> Option<Layout> {
        match s {
            "default" => Some(Layout::Default),
            "wide" => Some(Layout::Wide),
            "full" => Some(Layout::Full),
            _ => None,
        }
    }
}

/// The typed contents of a metadata block.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub date_updated: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub pinned: bool,
    pub unlisted: bool,
    pub show_header: bool,
    pub show_toc: bool,
    pub layout: Option<Layout>,

    /// Passed through untouched for the templating layer.
    pub thumbnail_url: Option<Value>,

    /// The raw block, kept for key-based checks like [`Metadata::is_ignored`].
    raw: Mapping,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            title: None,
            description: None,
            date: None,
            date_updated: None,
            tags: Vec::new(),
            pinned: false,
            unlisted: false,
            show_header: true,
            show_toc: false,
            layout: None,
            thumbnail_url: None,
            raw: Mapping::new(),
        }
    }
}

impl Metadata {
    /// Decodes a YAML mapping in a single pass. Anything that isn't a mapping
    /// decodes to the defaults.
    pub fn from_value(value: Value) -> Metadata {
        let raw = match value {
            Value::Mapping(m) => m,
            _ => return Metadata::default(),
        };
        let get = |key: &str| raw.get(&Value::String(key.to_owned()));
        let string = |key: &str| get(key).and_then(Value::as_str).map(str::to_owned);
        let flag = |key: &str, default: bool| {
            get(key).and_then(Value::as_bool).unwrap_or(default)
        };

        let mut metadata = Metadata {
            title: string("title"),
            description: string("description"),
            date: get("date").and_then(decode_date),
            date_updated: get("dateUpdated").and_then(decode_date),
            tags: get("tags").map(decode_tags).unwrap_or_default(),
            pinned: flag("pinned", false),
            unlisted: flag("unlisted", false),
            show_header: flag("showHeader", true),
            show_toc: flag("showToc", false),
            layout: get("layout").and_then(Value::as_str).and_then(Layout::parse),
            thumbnail_url: get("thumbnailUrl").cloned(),
            raw: Mapping::new(),
        };
        metadata.raw = raw;
        metadata
    }

    /// Returns true if any of `keys` is present in the block and set to
    /// `true`.
    pub fn is_ignored<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        keys.iter().any(|key| {
            self.raw.get(&Value::String(key.as_ref().to_owned())) == Some(&Value::Bool(true))
        })
    }
}

fn decode_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local().date()))
}

fn decode_tags(value: &Value) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for item in value.as_sequence().into_iter().flatten() {
        let tag = match item {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// A source file split into its decoded metadata and its Markdown body.
#[derive(Debug)]
pub struct Document<'a> {
    pub metadata: Metadata,
    pub body: &'a str,
}

/// Splits `input` into its metadata block and body, and decodes the block.
pub fn parse(input: &str) -> Result<Document<'_>> {
    let (yaml, body) = split(input)?;
    let metadata = match yaml {
        None => Metadata::default(),
        Some(yaml) if yaml.trim().is_empty() => Metadata::default(),
        Some(yaml) => Metadata::from_value(serde_yaml::from_str(yaml)?),
    };
    Ok(Document { metadata, body })
}

/// Locates the metadata block. Returns the YAML text (if any) and the body.
pub fn split(input: &str) -> Result<(Option<&str>, &str)> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let first_line_end = input.find('\n').unwrap_or(input.len());
    if input[..first_line_end].trim_end() != FENCE {
        return Ok((None, input));
    }

    let yaml_start = (first_line_end + 1).min(input.len());
    let mut offset = yaml_start;
    for line in input[yaml_start..].split_inclusive('\n') {
        if END_FENCES.contains(&line.trim_end()) {
            return Ok((Some(&input[yaml_start..offset]), &input[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(Error::MissingEndFence)
}

/// Represents the result of a metadata operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a malformed metadata block.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the opening fence (`---`) was found but no closing one.
    #[error("Missing closing `---`")]
    MissingEndFence,

    /// Returned when the block isn't valid YAML.
    #[error("Deserializing metadata: {0}")]
    DeserializeYaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_metadata_block() -> Result<()> {
        let doc = parse("# Hello\n\nWorld")?;
        assert_eq!(Metadata::default(), doc.metadata);
        assert_eq!("# Hello\n\nWorld", doc.body);
        Ok(())
    }

    #[test]
    fn test_typed_fields() -> Result<()> {
        let doc = parse(
            "---\ntitle: Notes\ndescription: Some notes\ndate: 2021-04-16\n\
             dateUpdated: 2021-05-01T10:00:00Z\ntags: [rust, 2021, true]\n\
             pinned: true\nshowToc: true\nlayout: wide\nthumbnailUrl: /img/a.png\n---\nBody\n",
        )?;
        let m = doc.metadata;
        assert_eq!(Some("Notes".to_owned()), m.title);
        assert_eq!(Some("Some notes".to_owned()), m.description);
        assert_eq!(NaiveDate::from_ymd_opt(2021, 4, 16), m.date);
        assert_eq!(NaiveDate::from_ymd_opt(2021, 5, 1), m.date_updated);
        assert_eq!(vec!["rust", "2021", "true"], m.tags);
        assert!(m.pinned);
        assert!(!m.unlisted);
        assert!(m.show_header);
        assert!(m.show_toc);
        assert_eq!(Some(Layout::Wide), m.layout);
        assert_eq!(Some(Value::String("/img/a.png".to_owned())), m.thumbnail_url);
        assert_eq!("Body\n", doc.body);
        Ok(())
    }

    #[test]
    fn test_wrong_types_are_absent() -> Result<()> {
        let doc = parse(
            "---\ntitle: [not, a, string]\ndate: yesterday\ntags: solo\n\
             pinned: \"yes\"\nshowHeader: 0\nlayout: sideways\n---\n",
        )?;
        let m = doc.metadata;
        assert_eq!(None, m.title);
        assert_eq!(None, m.date);
        assert!(m.tags.is_empty());
        assert!(!m.pinned);
        assert!(m.show_header);
        assert_eq!(None, m.layout);
        Ok(())
    }

    #[test]
    fn test_duplicate_tags_keep_first_order() -> Result<()> {
        let doc = parse("---\ntags: [b, a, b, {x: 1}]\n---\n")?;
        assert_eq!(vec!["b", "a"], doc.metadata.tags);
        Ok(())
    }

    #[test]
    fn test_is_ignored() -> Result<()> {
        let keys = ["draft", "private"];
        assert!(parse("---\ndraft: true\n---\n")?.metadata.is_ignored(&keys));
        assert!(!parse("---\ndraft: false\n---\n")?.metadata.is_ignored(&keys));
        assert!(!parse("---\ndraft: \"true\"\n---\n")?.metadata.is_ignored(&keys));
        assert!(!parse("no block")?.metadata.is_ignored(&keys));
        Ok(())
    }

    #[test]
    fn test_empty_and_scalar_blocks() -> Result<()> {
        assert_eq!(Metadata::default(), parse("---\n---\nBody")?.metadata);
        assert_eq!(Metadata::default(), parse("---\njust text\n---\nBody")?.metadata);
        Ok(())
    }

    #[test]
    fn test_malformed_blocks() {
        assert!(matches!(parse("---\ntitle: x\n"), Err(Error::MissingEndFence)));
        assert!(matches!(
            parse("---\ntitle: [unclosed\n---\n"),
            Err(Error::DeserializeYaml(_))
        ));
    }

    #[test]
    fn test_dotted_end_fence() -> Result<()> {
        let doc = parse("---\ntitle: x\n...\nBody")?;
        assert_eq!(Some("x".to_owned()), doc.metadata.title);
        assert_eq!("Body", doc.body);
        Ok(())
    }
}
