//! In-memory page template.
//!
//! A [`Page`] is the host document the renderer writes into. It plays the role
//! of the browser DOM: regions are found by `#id` or `.class` and their
//! content or attributes are replaced in place. Everything outside the
//! matched regions is left byte-for-byte untouched, so hand-written page
//! templates survive a render unchanged apart from the regions themselves.
//!
//! ## What the scanner understands
//!
//! - Comments, doctype and processing instructions are skipped.
//! - Attribute values may be double-quoted, single-quoted or bare.
//! - Void elements (`img`, `br`, ...) and self-closing tags have no content;
//!   attribute updates still apply to them.
//! - The bodies of `script` and `style` are opaque.
//! - When matches nest, only the outermost one is touched.
//!
//! It is not a validating HTML parser. An element whose end tag cannot be
//! found is treated as having no content.

use maud::{Markup, html};
use std::fmt;
use std::ops::Range;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// How a region is located in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    /// `#name`; only the first match counts.
    Id(&'a str),
    /// `.name`; every match counts.
    Class(&'a str),
}

impl<'a> Selector<'a> {
    /// Parse `#id` or `.class`.
    pub fn parse(s: &'a str) -> Option<Self> {
        if let Some(id) = s.strip_prefix('#') {
            (!id.is_empty()).then_some(Selector::Id(id))
        } else if let Some(class) = s.strip_prefix('.') {
            (!class.is_empty()).then_some(Selector::Class(class))
        } else {
            None
        }
    }

    fn matches(&self, tag: &OpenTag) -> bool {
        match self {
            Selector::Id(id) => tag.attr("id").is_some_and(|v| v == *id),
            Selector::Class(class) => tag
                .attr("class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == *class)),
        }
    }
}

impl fmt::Display for Selector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "#{id}"),
            Selector::Class(class) => write!(f, ".{class}"),
        }
    }
}

#[derive(Debug, Clone)]
struct Attr {
    name: String,
    value: Option<String>,
    span: Range<usize>,
}

#[derive(Debug, Clone)]
struct OpenTag {
    name: String,
    span: Range<usize>,
    /// Where a new attribute goes: just before `>` or `/>`.
    insert_at: usize,
    self_closing: bool,
    attrs: Vec<Attr>,
}

impl OpenTag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    fn has_content(&self) -> bool {
        !self.self_closing && !VOID_ELEMENTS.contains(&self.name.as_str())
    }
}

#[derive(Debug, Clone)]
enum Token {
    Open(OpenTag),
    Close { name: String, span: Range<usize> },
}

#[derive(Debug, Clone)]
struct Element {
    open: OpenTag,
    /// Content between the start and end tags, when the element has one.
    inner: Option<Range<usize>>,
    /// Whole element including its end tag.
    outer: Range<usize>,
}

/// An HTML document whose regions can be rewritten by selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    html: String,
}

impl Page {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }

    /// Whether at least one element matches `selector`.
    pub fn contains(&self, selector: Selector<'_>) -> bool {
        tokenize(&self.html)
            .iter()
            .any(|t| matches!(t, Token::Open(open) if selector.matches(open)))
    }

    /// Number of elements `selector` would touch.
    pub fn count(&self, selector: Selector<'_>) -> usize {
        self.find(selector).len()
    }

    /// Replace the content of every matching element with `text`, escaped.
    pub fn set_text(&mut self, selector: Selector<'_>, text: &str) -> usize {
        self.set_inner_html(selector, html! { (text) })
    }

    /// Replace the content of every matching element with `markup`.
    ///
    /// Elements without content (void or self-closing) are skipped.
    pub fn set_inner_html(&mut self, selector: Selector<'_>, markup: Markup) -> usize {
        let replacement = markup.into_string();
        let mut touched = 0;
        for element in self.find(selector).iter().rev() {
            if let Some(inner) = &element.inner {
                self.html.replace_range(inner.clone(), &replacement);
                touched += 1;
            }
        }
        touched
    }

    /// Set `name="value"` on every matching element, replacing an existing
    /// attribute of that name. The value is escaped.
    pub fn set_attribute(&mut self, selector: Selector<'_>, name: &str, value: &str) -> usize {
        let rendered = format!(r#"{}="{}""#, name, escape(value));
        let elements = self.find(selector);
        for element in elements.iter().rev() {
            let existing = element
                .open
                .attrs
                .iter()
                .find(|a| a.name.eq_ignore_ascii_case(name));
            match existing {
                Some(attr) => self.html.replace_range(attr.span.clone(), &rendered),
                None => self
                    .html
                    .insert_str(element.open.insert_at, &format!(" {rendered}")),
            }
        }
        elements.len()
    }

    /// Set one declaration in the inline `style` of every matching element.
    ///
    /// Other declarations are kept. An earlier declaration of `property` is
    /// dropped and the new one is appended, so it is the one that applies.
    pub fn set_style_property(
        &mut self,
        selector: Selector<'_>,
        property: &str,
        value: &str,
    ) -> usize {
        let elements = self.find(selector);
        for element in elements.iter().rev() {
            let existing = element
                .open
                .attrs
                .iter()
                .find(|a| a.name.eq_ignore_ascii_case("style"));
            let mut declarations: Vec<String> = existing
                .and_then(|a| a.value.as_deref())
                .map(|raw| split_declarations(&decode_entities(raw)))
                .unwrap_or_default()
                .into_iter()
                .filter(|d| !declares(d, property))
                .collect();
            declarations.push(format!("{property}: {value}"));
            let rendered = format!(r#"style="{}""#, escape(&declarations.join("; ")));
            match existing {
                Some(attr) => self.html.replace_range(attr.span.clone(), &rendered),
                None => self
                    .html
                    .insert_str(element.open.insert_at, &format!(" {rendered}")),
            }
        }
        elements.len()
    }

    /// Read an attribute from the first matching element.
    pub fn attribute(&self, selector: Selector<'_>, name: &str) -> Option<String> {
        self.find(selector)
            .first()
            .and_then(|e| e.open.attr(name).map(str::to_string))
    }

    /// Content of the first matching element, as written.
    pub fn inner_html(&self, selector: Selector<'_>) -> Option<&str> {
        self.find(selector)
            .first()
            .and_then(|e| e.inner.clone())
            .map(|range| &self.html[range])
    }

    /// Matching elements in document order, with nested matches removed.
    fn find(&self, selector: Selector<'_>) -> Vec<Element> {
        let tokens = tokenize(&self.html);
        let mut found: Vec<Element> = Vec::new();
        for (idx, token) in tokens.iter().enumerate() {
            let Token::Open(open) = token else { continue };
            if !selector.matches(open) {
                continue;
            }
            if found
                .last()
                .is_some_and(|outer| outer.outer.contains(&open.span.start))
            {
                continue;
            }
            found.push(resolve_element(&tokens, idx, open));
            if matches!(selector, Selector::Id(_)) {
                break;
            }
        }
        found
    }
}

impl From<String> for Page {
    fn from(html: String) -> Self {
        Self::new(html)
    }
}

fn escape(value: &str) -> String {
    html! { (value) }.into_string()
}

/// Undo the entity escaping an attribute value may carry.
fn decode_entities(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Split an inline style into declarations. Semicolons inside quotes or
/// parentheses (`url("a;b.png")`) do not split.
fn split_declarations(style: &str) -> Vec<String> {
    let mut declarations = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    for c in style.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else {
            match c {
                '"' | '\'' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                ';' if depth == 0 => {
                    push_declaration(&mut declarations, &current);
                    current.clear();
                    continue;
                }
                _ => {}
            }
        }
        current.push(c);
    }
    push_declaration(&mut declarations, &current);
    declarations
}

fn push_declaration(declarations: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        declarations.push(text.to_string());
    }
}

fn declares(declaration: &str, property: &str) -> bool {
    declaration
        .split_once(':')
        .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case(property))
}

fn resolve_element(tokens: &[Token], idx: usize, open: &OpenTag) -> Element {
    let closed_by = open
        .has_content()
        .then(|| find_close(tokens, idx, &open.name))
        .flatten();
    match closed_by {
        Some(close) => Element {
            open: open.clone(),
            inner: Some(open.span.end..close.start),
            outer: open.span.start..close.end,
        },
        None => Element {
            open: open.clone(),
            inner: None,
            outer: open.span.clone(),
        },
    }
}

fn find_close(tokens: &[Token], idx: usize, name: &str) -> Option<Range<usize>> {
    let mut depth = 1usize;
    for token in &tokens[idx + 1..] {
        match token {
            Token::Open(open) if open.name == name && open.has_content() => depth += 1,
            Token::Close { name: close, span } if close == name => {
                depth -= 1;
                if depth == 0 {
                    return Some(span.clone());
                }
            }
            _ => {}
        }
    }
    None
}

fn tag_name_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-'))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn find_ci(html: &str, from: usize, needle: &str) -> Option<usize> {
    html[from..]
        .to_ascii_lowercase()
        .find(needle)
        .map(|offset| from + offset)
}

fn tokenize(html: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while let Some(offset) = html[pos..].find('<') {
        let start = pos + offset;
        let rest = &html[start..];

        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(html.len(), |e| start + e + 3);
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = rest.find('>').map_or(html.len(), |e| start + e + 1);
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            let len = tag_name_len(after);
            if len == 0 {
                pos = start + 2;
                continue;
            }
            let end = rest.find('>').map_or(html.len(), |e| start + e + 1);
            tokens.push(Token::Close {
                name: after[..len].to_ascii_lowercase(),
                span: start..end,
            });
            pos = end;
            continue;
        }

        let len = tag_name_len(&rest[1..]);
        if len == 0 {
            pos = start + 1;
            continue;
        }
        let name = rest[1..1 + len].to_ascii_lowercase();
        let Some(open) = parse_open_tag(html, start, start + 1 + len, name) else {
            break;
        };
        pos = open.span.end;
        if RAW_TEXT_ELEMENTS.contains(&open.name.as_str()) && !open.self_closing {
            pos = find_ci(html, pos, &format!("</{}", open.name)).unwrap_or(html.len());
        }
        tokens.push(Token::Open(open));
    }
    tokens
}

/// Parse attributes from `cursor` up to the end of the start tag.
/// Returns `None` when the tag never closes.
fn parse_open_tag(html: &str, start: usize, mut cursor: usize, name: String) -> Option<OpenTag> {
    let bytes = html.as_bytes();
    let mut attrs = Vec::new();
    loop {
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        match *bytes.get(cursor)? {
            b'>' => {
                return Some(OpenTag {
                    name,
                    span: start..cursor + 1,
                    insert_at: cursor,
                    self_closing: false,
                    attrs,
                });
            }
            b'/' if bytes.get(cursor + 1) == Some(&b'>') => {
                return Some(OpenTag {
                    name,
                    span: start..cursor + 2,
                    insert_at: cursor,
                    self_closing: true,
                    attrs,
                });
            }
            b'/' => {
                cursor += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = cursor;
        while cursor < bytes.len()
            && !bytes[cursor].is_ascii_whitespace()
            && !matches!(bytes[cursor], b'=' | b'>' | b'/')
        {
            cursor += 1;
        }
        if cursor == attr_start {
            cursor += 1;
            continue;
        }
        let attr_name = html[attr_start..cursor].to_ascii_lowercase();

        let mut ahead = cursor;
        while ahead < bytes.len() && bytes[ahead].is_ascii_whitespace() {
            ahead += 1;
        }
        let mut value = None;
        if bytes.get(ahead) == Some(&b'=') {
            ahead += 1;
            while ahead < bytes.len() && bytes[ahead].is_ascii_whitespace() {
                ahead += 1;
            }
            match *bytes.get(ahead)? {
                quote @ (b'"' | b'\'') => {
                    let close = html[ahead + 1..].find(quote as char)? + ahead + 1;
                    value = Some(html[ahead + 1..close].to_string());
                    cursor = close + 1;
                }
                _ => {
                    let value_start = ahead;
                    while ahead < bytes.len()
                        && !bytes[ahead].is_ascii_whitespace()
                        && bytes[ahead] != b'>'
                    {
                        ahead += 1;
                    }
                    value = Some(html[value_start..ahead].to_string());
                    cursor = ahead;
                }
            }
        }
        attrs.push(Attr {
            name: attr_name,
            value,
            span: attr_start..cursor,
        });
    }
}
