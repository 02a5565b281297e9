//! Implements the HTML renderer for page bodies. It is modeled after
//! [`pulldown_cmark::html::push_html`], except that it:
//!
//! * gives each heading an `id` (and a self-anchor) from a precomputed slug,
//! * rewrites link and image targets through a [`LinkResolver`] and records
//!   every internal link target,
//! * marks external links with `rel="external noopener noreferrer"`,
//! * hands code blocks to an optional [`Highlighter`].
//!
//! A renderer is created per call and owns all of its state, so pages can be
//! rendered on any number of threads at once.

use crate::url::{LinkResolver, Resolved};
use pulldown_cmark::escape::{escape_href, escape_html, StrWrite};
use pulldown_cmark::{Alignment, CodeBlockKind, CowStr, Event, LinkType, Tag};
use std::collections::HashSet;
use std::fmt::{self, Display};
use std::io;
use tracing::warn;
use url::Url;

/// Renders the contents of fenced and indented code blocks.
pub trait Highlighter: Sync {
    /// Returns the inner HTML for `code` written in `language`, or `None` to
    /// fall back to the escaped source. `language` is `plaintext` when the
    /// block didn't name one.
    fn highlight(&self, language: &str, code: &str) -> Option<String>;
}

/// A [`Highlighter`] that escapes the source and wraps every line in a
/// `<span class="line">`, leaving token coloring to the stylesheet or to a
/// client-side highlighter keyed on the `hljs language-*` classes.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineHighlighter;

impl Highlighter for LineHighlighter {
    fn highlight(&self, _language: &str, code: &str) -> Option<String> {
        let mut out = String::with_capacity(code.len() + 32);
        for line in code.lines() {
            out.push_str(r#"<span class="line">"#);
            escape_html(&mut out, line).ok()?;
            out.push_str("</span>\n");
        }
        Some(out)
    }
}

const FALLBACK_LANGUAGE: &str = "plaintext";
const EXTERNAL_REL: &str = "external noopener noreferrer";

struct Adaptor<'a, T> {
    formatter: &'a mut T,
    result: fmt::Result,
}

impl<T> Adaptor<'_, T> {
    fn handle_result(&mut self, result: fmt::Result) -> io::Result<()> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.result = result;
                Err(io::Error::new(io::ErrorKind::Other, e))
            }
        }
    }
}

impl<T: fmt::Write> StrWrite for Adaptor<'_, T> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let result = self.formatter.write_str(s);
        self.handle_result(result)
    }

    fn write_fmt(&mut self, args: fmt::Arguments) -> io::Result<()> {
        let result = self.formatter.write_fmt(args);
        self.handle_result(result)
    }
}

struct EscapeHref<'a>(&'a str);

impl Display for EscapeHref<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_href(&mut adaptor, self.0);
        adaptor.result
    }
}

struct EscapeHtml<'a>(&'a str);

impl Display for EscapeHtml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adaptor = Adaptor {
            formatter: f,
            result: Ok(()),
        };
        let _ = escape_html(&mut adaptor, self.0);
        adaptor.result
    }
}

// Renders ` title="..."` only when there is a title.
struct TitleAttr<'a>(&'a str);

impl Display for TitleAttr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.is_empty() {
            true => Ok(()),
            false => write!(f, r#" title="{}""#, EscapeHtml(self.0)),
        }
    }
}

enum TableState {
    Head,
    Body,
}

/// An image whose alt text is still being collected.
struct PendingImage {
    src: String,
    title: String,
    alt: String,
    depth: usize,
}

/// A code block whose contents are still being collected.
struct PendingCode {
    language: Option<String>,
    text: String,
}

struct HtmlRenderer<'r> {
    resolver: &'r LinkResolver<'r>,
    highlighter: Option<&'r dyn Highlighter>,

    /// Heading slugs in render order.
    slugs: std::vec::IntoIter<String>,

    links: Vec<Url>,
    seen_links: HashSet<Url>,

    table_alignments: Vec<Alignment>,
    table_state: TableState,
    table_cell_index: usize,

    image: Option<PendingImage>,
    code: Option<PendingCode>,
}

impl<'r> HtmlRenderer<'r> {
    fn new(
        resolver: &'r LinkResolver<'r>,
        slugs: Vec<String>,
        highlighter: Option<&'r dyn Highlighter>,
    ) -> Self {
        HtmlRenderer {
            resolver,
            highlighter,
            slugs: slugs.into_iter(),
            links: Vec::new(),
            seen_links: HashSet::new(),
            table_alignments: Vec::new(),
            table_state: TableState::Head,
            table_cell_index: 0,
            image: None,
            code: None,
        }
    }

    fn on_event<W: StrWrite>(&mut self, w: &mut W, event: Event<'_>) -> io::Result<()> {
        if let Some(code) = &mut self.code {
            return match event {
                Event::Text(text) => {
                    code.text.push_str(&text);
                    Ok(())
                }
                Event::End(Tag::CodeBlock(_)) => self.on_code_block_end(w),
                _ => Ok(()),
            };
        }
        if let Some(image) = &mut self.image {
            match event {
                Event::Text(text) | Event::Code(text) => image.alt.push_str(&text),
                Event::Start(Tag::Image(..)) => image.depth += 1,
                Event::End(Tag::Image(..)) if image.depth > 0 => image.depth -= 1,
                Event::End(Tag::Image(..)) => return self.on_image_end(w),
                _ => {}
            }
            return Ok(());
        }

        match event {
            Event::Start(tag) => self.on_start(w, tag),
            Event::End(tag) => self.on_end(w, tag),
            Event::Code(code) => write!(w, "<code>{}</code>", EscapeHtml(&code)),
            Event::FootnoteReference(name) => write!(
                w,
                r##"<sup class="footnote-reference"><a href="#{}">{}</a></sup>"##,
                EscapeHtml(&name),
                EscapeHtml(&name),
            ),
            Event::HardBreak => w.write_str("<br />"),
            Event::Html(html) => w.write_str(&html),
            Event::Rule => w.write_str("<hr />"),
            Event::SoftBreak => w.write_str("\n"),
            Event::TaskListMarker(checked) => write!(
                w,
                r#"<input disabled="" type="checkbox" {}/>"#,
                match checked {
                    true => r#"checked="" "#,
                    false => "",
                }
            ),
            Event::Text(text) => escape_html(w, &text),
        }
    }

    fn on_start<W: StrWrite>(&mut self, w: &mut W, tag: Tag<'_>) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("<blockquote>"),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split(' ')
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(PendingCode {
                    language,
                    text: String::new(),
                });
                Ok(())
            }
            Tag::Emphasis => w.write_str("<em>"),
            Tag::FootnoteDefinition(name) => write!(
                w,
                concat!(
                    r#"<div class="footnote-definition" id="{}">"#,
                    r#"<sup class="footnote-definition-label">{}</sup>"#,
                ),
                EscapeHtml(&name),
                EscapeHtml(&name),
            ),
            Tag::Heading(level) => {
                let slug = self.slugs.next().unwrap_or_default();
                write!(
                    w,
                    r##"<h{} id="{}"><a class="anchor" href="#{}" aria-hidden="true">#</a>"##,
                    level,
                    EscapeHtml(&slug),
                    EscapeHref(&slug),
                )
            }
            Tag::Image(_link_type, dest, title) => {
                self.image = Some(PendingImage {
                    src: self.image_src(&dest),
                    title: title.to_string(),
                    alt: String::new(),
                    depth: 0,
                });
                Ok(())
            }
            Tag::Item => w.write_str("<li>"),
            Tag::Link(LinkType::Email, dest, title) => write!(
                w,
                r#"<a href="mailto:{}" rel="{}"{}>"#,
                EscapeHref(&dest),
                EXTERNAL_REL,
                TitleAttr(&title),
            ),
            Tag::Link(_link_type, dest, title) => self.on_link(w, dest, title),
            Tag::List(None) => w.write_str("<ul>"),
            Tag::List(Some(1)) => w.write_str("<ol>"),
            Tag::List(Some(start)) => write!(w, r#"<ol start="{}">"#, start),
            Tag::Paragraph => w.write_str("<p>"),
            Tag::Strikethrough => w.write_str("<del>"),
            Tag::Strong => w.write_str("<strong>"),
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                w.write_str("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                w.write_str("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                w.write_str("<tr>")
            }
            Tag::TableCell => write!(
                w,
                "<{}{}>",
                match self.table_state {
                    TableState::Head => "th",
                    TableState::Body => "td",
                },
                match self.table_alignments.get(self.table_cell_index) {
                    Some(Alignment::Left) => r#" align="left""#,
                    Some(Alignment::Right) => r#" align="right""#,
                    Some(Alignment::Center) => r#" align="center""#,
                    _ => "",
                }
            ),
        }
    }

    fn on_end<W: StrWrite>(&mut self, w: &mut W, tag: Tag<'_>) -> io::Result<()> {
        match tag {
            Tag::BlockQuote => w.write_str("</blockquote>"),
            Tag::CodeBlock(_) => Ok(()), // handled by on_code_block_end
            Tag::Emphasis => w.write_str("</em>"),
            Tag::FootnoteDefinition(_) => w.write_str("</div>"),
            Tag::Heading(level) => write!(w, "</h{}>", level),
            Tag::Image(..) => Ok(()), // handled by on_image_end
            Tag::Item => w.write_str("</li>"),
            Tag::Link(..) => w.write_str("</a>"),
            Tag::List(Some(_)) => w.write_str("</ol>"),
            Tag::List(None) => w.write_str("</ul>"),
            Tag::Paragraph => w.write_str("</p>"),
            Tag::Strikethrough => w.write_str("</del>"),
            Tag::Strong => w.write_str("</strong>"),
            Tag::Table(_) => w.write_str("</tbody></table>"),
            Tag::TableHead => {
                self.table_state = TableState::Body;
                w.write_str("</tr></thead><tbody>")
            }
            Tag::TableRow => w.write_str("</tr>"),
            Tag::TableCell => {
                self.table_cell_index += 1;
                w.write_str(match self.table_state {
                    TableState::Head => "</th>",
                    TableState::Body => "</td>",
                })
            }
        }
    }

    fn on_link<W: StrWrite>(
        &mut self,
        w: &mut W,
        dest: CowStr<'_>,
        title: CowStr<'_>,
    ) -> io::Result<()> {
        match self.resolver.resolve_link(&dest) {
            Ok(Resolved::External(href)) => write!(
                w,
                r#"<a href="{}" rel="{}"{}>"#,
                EscapeHref(&href),
                EXTERNAL_REL,
                TitleAttr(&title),
            ),
            Ok(Resolved::Internal { href, url }) => {
                if self.seen_links.insert(url.clone()) {
                    self.links.push(url);
                }
                write!(w, r#"<a href="{}"{}>"#, EscapeHref(&href), TitleAttr(&title))
            }
            Ok(Resolved::Local(href)) | Ok(Resolved::Asset(href)) => {
                write!(w, r#"<a href="{}"{}>"#, EscapeHref(&href), TitleAttr(&title))
            }
            Err(err) => {
                warn!(link = %dest, error = %err, "leaving unresolvable link as written");
                write!(w, r#"<a href="{}"{}>"#, EscapeHref(&dest), TitleAttr(&title))
            }
        }
    }

    fn image_src(&self, dest: &str) -> String {
        match self.resolver.resolve_image(dest) {
            Ok(src) => src,
            Err(err) => {
                warn!(link = %dest, error = %err, "leaving unresolvable image as written");
                dest.to_owned()
            }
        }
    }

    fn on_image_end<W: StrWrite>(&mut self, w: &mut W) -> io::Result<()> {
        match self.image.take() {
            None => Ok(()),
            Some(image) => write!(
                w,
                r#"<img src="{}" alt="{}"{} />"#,
                EscapeHref(&image.src),
                EscapeHtml(&image.alt),
                TitleAttr(&image.title),
            ),
        }
    }

    fn on_code_block_end<W: StrWrite>(&mut self, w: &mut W) -> io::Result<()> {
        let code = match self.code.take() {
            None => return Ok(()),
            Some(code) => code,
        };
        match self.highlighter {
            None => {
                match &code.language {
                    Some(lang) => {
                        write!(w, r#"<pre><code class="language-{}">"#, EscapeHtml(lang))?
                    }
                    None => w.write_str("<pre><code>")?,
                }
                escape_html(&mut *w, &code.text)?;
            }
            Some(highlighter) => {
                let lang = code.language.as_deref().unwrap_or(FALLBACK_LANGUAGE);
                write!(w, r#"<pre><code class="hljs language-{}">"#, EscapeHtml(lang))?;
                match highlighter.highlight(lang, &code.text) {
                    Some(html) => w.write_str(&html)?,
                    None => escape_html(&mut *w, &code.text)?,
                }
            }
        }
        w.write_str("</code></pre>")
    }
}

/// Renders `events` into `out`, rewriting targets through `resolver` and
/// giving headings the ids in `slugs` (in order). Returns the fully-qualified
/// targets of all internal links, each once, in order of first appearance.
pub fn push_html<'a, I>(
    out: &mut String,
    events: I,
    resolver: &LinkResolver<'_>,
    slugs: Vec<String>,
    highlighter: Option<&dyn Highlighter>,
) -> io::Result<Vec<Url>>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut renderer = HtmlRenderer::new(resolver, slugs, highlighter);
    for event in events {
        renderer.on_event(out, event)?;
    }
    Ok(renderer.links)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url::site_root;
    use pulldown_cmark::{Options, Parser};

    fn render(markdown: &str, highlighter: Option<&dyn Highlighter>) -> (String, Vec<Url>) {
        let root = site_root(&Url::parse("https://example.org").unwrap());
        let statics = vec!["png".to_owned()];
        let resolver = LinkResolver::new(&root, "notes/page", false, &statics).unwrap();
        let mut out = String::new();
        let links = push_html(
            &mut out,
            Parser::new_ext(markdown, Options::ENABLE_TABLES),
            &resolver,
            vec!["first".to_owned()],
            highlighter,
        )
        .unwrap();
        (out, links)
    }

    #[test]
    fn test_external_link_attributes() {
        let (html, links) = render("[x](https://remote.org/a)", None);
        assert_eq!(
            concat!(
                r#"<p><a href="https://remote.org/a" "#,
                r#"rel="external noopener noreferrer">x</a></p>"#,
            ),
            html
        );
        assert!(links.is_empty());
    }

    #[test]
    fn test_internal_links_recorded_once() {
        let (html, links) = render("[a](b.md) [again](b.md#x \"B\")", None);
        assert_eq!(
            r##"<p><a href="/notes/b">a</a> <a href="/notes/b#x" title="B">again</a></p>"##,
            html
        );
        assert_eq!(vec![Url::parse("https://example.org/notes/b").unwrap()], links);
    }

    #[test]
    fn test_image_rewritten_not_recorded() {
        let (html, links) = render("![A *nice* cat](../img/cat.png)", None);
        assert_eq!(r#"<p><img src="/img/cat.png" alt="A nice cat" /></p>"#, html);
        assert!(links.is_empty());
    }

    #[test]
    fn test_static_file_link_not_recorded() {
        let (html, links) = render("[cat](../img/cat.png) [v](v1.2)", None);
        assert_eq!(
            r#"<p><a href="/img/cat.png">cat</a> <a href="/notes/v1-2">v</a></p>"#,
            html
        );
        assert_eq!(vec![Url::parse("https://example.org/notes/v1-2").unwrap()], links);
    }

    #[test]
    fn test_heading_ids() {
        let (html, _) = render("# Intro", None);
        assert_eq!(
            concat!(
                r#"<h1 id="first">"#,
                r##"<a class="anchor" href="#first" aria-hidden="true">#</a>Intro</h1>"##,
            ),
            html
        );
    }

    #[test]
    fn test_code_block_without_highlighter() {
        let (html, _) = render("```rust\nlet a = 1 < 2;\n```", None);
        assert_eq!(
            "<pre><code class=\"language-rust\">let a = 1 &lt; 2;\n</code></pre>",
            html
        );
    }

    #[test]
    fn test_writing_continues_after_code_block() {
        let (html, _) = render("```\na & b\n```\n\nafter", None);
        assert_eq!("<pre><code>a &amp; b\n</code></pre><p>after</p>", html);
    }

    #[test]
    fn test_code_block_with_highlighter() {
        let (html, _) = render("```\na\nb\n```", Some(&LineHighlighter));
        assert_eq!(
            "<pre><code class=\"hljs language-plaintext\"><span class=\"line\">a</span>\n\
             <span class=\"line\">b</span>\n</code></pre>",
            html
        );
    }

    struct Declining;

    impl Highlighter for Declining {
        fn highlight(&self, _: &str, _: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_declining_highlighter_falls_back_to_escaping() {
        let (html, _) = render("```js\n<b>\n```", Some(&Declining));
        assert_eq!(
            "<pre><code class=\"hljs language-js\">&lt;b&gt;\n</code></pre>",
            html
        );
    }
}
