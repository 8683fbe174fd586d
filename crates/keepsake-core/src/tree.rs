//! Owned document tree.
//!
//! Fetched pages are parsed once with `scraper` (html5ever) and converted into
//! this small owned representation. Every later stage works on plain values:
//! the locator borrows a subtree, the sanitizer builds a new [`Fragment`], and
//! the image localizer maps one fragment into another. Nothing is shared
//! between items.

use crate::{Error, Result};
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Deepest nesting accepted from the parser.
///
/// Parsing cuts subtrees off below this depth and leaves a marker in their
/// place, so a page with deep markup outside the authored content still
/// parses. [`Element::validate`] reports the marker, and any tree deeper than
/// this, as [`Error::MalformedTree`].
pub const MAX_DEPTH: usize = 512;

/// Stands in for a subtree cut off at [`MAX_DEPTH`].
const TRUNCATED: &str = "#truncated";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// A node of a document tree: an element or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Element with attributes and children.
    Element(Element),
    /// Text payload.
    Text(String),
}

/// An element node. Attribute keys are unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Lowercase element kind (`div`, `img`, ...).
    pub name: String,
    /// Attribute name to value.
    pub attrs: BTreeMap<String, String>,
    /// Ordered children.
    pub children: Vec<Node>,
}

/// A rooted page as produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// The `<html>` element.
    pub root: Element,
}

/// An ordered run of nodes without a wrapping element.
///
/// The sanitizer's output: the standalone document body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    /// Top-level nodes.
    pub children: Vec<Node>,
}

impl Node {
    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            },
        }
    }

    /// Serialize this node as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_node(self, false, &mut out);
        out
    }

    /// The element, if this node is one.
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }
}

impl Element {
    /// Create an element with no attributes or children.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder: set an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Builder: append a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder: append text.
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.push_text(text);
        self
    }

    /// Append text, merging with a trailing text node.
    pub fn push_text(&mut self, text: &str) {
        push_text(&mut self.children, text);
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn class_tokens(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Whether the `class` attribute contains `token` as a whole word.
    pub fn has_class(&self, token: &str) -> bool {
        self.class_tokens().any(|t| t == token)
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First descendant (depth-first, pre-order) with the given kind.
    pub fn find_first(&self, name: &str) -> Option<&Self> {
        self.child_elements().find_map(|child| {
            if child.name == name {
                Some(child)
            } else {
                child.find_first(name)
            }
        })
    }

    /// All descendants with the given kind, in document order.
    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a Self>) {
        for child in self.child_elements() {
            if child.name == name {
                out.push(child);
            }
            child.find_all(name, out);
        }
    }

    /// Serialize this element as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    /// Check that the tree can be traversed.
    ///
    /// Walks iteratively so that overly deep input is rejected instead of
    /// overflowing the stack.
    pub fn validate(&self) -> Result<()> {
        let mut stack: Vec<(&Self, usize)> = vec![(self, 0)];
        while let Some((el, depth)) = stack.pop() {
            if depth > MAX_DEPTH || el.name == TRUNCATED {
                return Err(Error::MalformedTree(format!(
                    "nesting deeper than {MAX_DEPTH} levels"
                )));
            }
            if !is_valid_name(&el.name) {
                return Err(Error::MalformedTree(format!(
                    "invalid element name '{}'",
                    el.name
                )));
            }
            stack.extend(el.child_elements().map(|child| (child, depth + 1)));
        }
        Ok(())
    }
}

impl Fragment {
    /// Wrap a list of nodes.
    #[must_use]
    pub const fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Concatenated text of all nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }

    /// Serialize all nodes as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(child, false, &mut out);
        }
        out
    }

    /// Visit every element in document order.
    pub fn for_each_element<'a>(&'a self, mut visit: impl FnMut(&'a Element)) {
        let mut stack: Vec<&'a Node> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if let Node::Element(el) = node {
                visit(el);
                stack.extend(el.children.iter().rev());
            }
        }
    }

    /// Check that every element in the fragment can be traversed.
    pub fn validate(&self) -> Result<()> {
        for el in self.children.iter().filter_map(Node::as_element) {
            el.validate()?;
        }
        Ok(())
    }
}

/// Whether elements of this kind never have children.
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Append text to a node list, merging with a trailing text node.
pub fn push_text(children: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = children.last_mut() {
        last.push_str(text);
    } else {
        children.push(Node::Text(text.to_string()));
    }
}

/// Parse a full HTML page.
pub fn parse_document(html: &str) -> Result<Document> {
    let parsed = Html::parse_document(html);
    let root = convert_element(parsed.root_element(), 0)?;
    Ok(Document { root })
}

/// Parse an HTML snippet (for example an embed code) into a fragment.
pub fn parse_fragment(html: &str) -> Result<Fragment> {
    let parsed = Html::parse_fragment(html);
    let wrapper = convert_element(parsed.root_element(), 0)?;
    Ok(Fragment::new(wrapper.children))
}

impl Document {
    /// Text of the page `<title>`, if any.
    pub fn title(&self) -> Option<String> {
        self.root
            .find_first("title")
            .map(|title| title.text_content().trim().to_string())
            .filter(|title| !title.is_empty())
    }

    /// Target of `<link rel="canonical">`, if the page declares one.
    pub fn canonical_url(&self) -> Option<String> {
        let mut links = Vec::new();
        self.root.find_all("link", &mut links);
        links
            .into_iter()
            .find(|link| {
                link.attr("rel")
                    .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")))
            })
            .and_then(|link| link.attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string)
    }
}

fn convert_element(element: ElementRef<'_>, depth: usize) -> Result<Element> {
    if depth > MAX_DEPTH {
        return Ok(Element::new(TRUNCATED));
    }

    let value = element.value();
    let mut out = Element::new(value.name());
    for (name, attr_value) in value.attrs() {
        out.attrs.insert(name.to_string(), attr_value.to_string());
    }

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            out.children
                .push(Node::Element(convert_element(child_element, depth + 1)?));
        } else if let scraper::Node::Text(text) = child.value() {
            let text: &str = text;
            out.push_text(text);
        }
    }

    Ok(out)
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '_'))
}

fn write_node(node: &Node, raw_text: bool, out: &mut String) {
    match node {
        Node::Text(text) if raw_text => out.push_str(text),
        Node::Text(text) => out.push_str(&html_escape::encode_text(text)),
        Node::Element(el) => write_element(el, out),
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (name, value) in &el.attrs {
        // write! to String is infallible
        let _ = write!(
            out,
            " {name}=\"{}\"",
            html_escape::encode_double_quoted_attribute(value)
        );
    }
    out.push('>');

    if is_void(&el.name) {
        return;
    }

    let raw_text = RAW_TEXT_ELEMENTS.contains(&el.name.as_str());
    for child in &el.children {
        write_node(child, raw_text, out);
    }
    let _ = write!(out, "</{}>", el.name);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_keeps_text_and_attributes() {
        let doc = parse_document(
            r#"<html><head><title> Why? </title></head>
               <body><div class="a b" id="x">Hello <b>world</b></div></body></html>"#,
        )
        .unwrap();

        assert_eq!(doc.title().as_deref(), Some("Why?"));
        assert_eq!(doc.canonical_url(), None);
        let div = doc.root.find_first("div").unwrap();
        assert!(div.has_class("b"));
        assert!(!div.has_class("a b"));
        assert_eq!(div.attr("id"), Some("x"));
        assert_eq!(div.text_content(), "Hello world");
    }

    #[test]
    fn test_canonical_url_from_head() {
        let doc = parse_document(
            r#"<html><head><link rel="stylesheet" href="/a.css">
               <link rel="canonical" href="https://www.quora.com/Why/answer/Jane"></head></html>"#,
        )
        .unwrap();
        assert_eq!(
            doc.canonical_url().as_deref(),
            Some("https://www.quora.com/Why/answer/Jane")
        );
    }

    #[test]
    fn test_parse_fragment_returns_top_level_nodes() {
        let fragment =
            parse_fragment(r#"<iframe src="//www.youtube.com/embed/abc"></iframe>"#).unwrap();
        assert_eq!(fragment.children.len(), 1);
        let iframe = fragment.children[0].as_element().unwrap();
        assert_eq!(iframe.name, "iframe");
        assert_eq!(iframe.attr("src"), Some("//www.youtube.com/embed/abc"));
    }

    #[test]
    fn test_serialization_escapes_text_and_attributes() {
        let el = Element::new("a")
            .with_attr("href", "https://example.com/?a=1&b=\"2\"")
            .with_text("1 < 2 & 3");
        assert_eq!(
            el.to_html(),
            "<a href=\"https://example.com/?a=1&amp;b=&quot;2&quot;\">1 &lt; 2 &amp; 3</a>"
        );
    }

    #[test]
    fn test_void_and_raw_text_elements() {
        let el = Element::new("p")
            .with_text("line")
            .with_child(Element::new("br"))
            .with_child(Element::new("style").with_text("a > b { color: red; }"));
        assert_eq!(
            el.to_html(),
            "<p>line<br><style>a > b { color: red; }</style></p>"
        );
    }

    #[test]
    fn test_push_text_merges_adjacent_runs() {
        let el = Element::new("p").with_text("a").with_text("b");
        assert_eq!(el.children, vec![Node::Text("ab".into())]);
    }

    #[test]
    fn test_validate_rejects_deep_and_invalid_trees() {
        let mut deep = Element::new("div");
        for _ in 0..=MAX_DEPTH {
            deep = Element::new("span").with_child(deep);
        }
        assert!(matches!(deep.validate(), Err(Error::MalformedTree(_))));

        let bad_name = Element::new("div").with_child(Element::new("9lives"));
        assert!(matches!(bad_name.validate(), Err(Error::MalformedTree(_))));

        let office = Element::new("p").with_child(Element::new("o:p"));
        assert!(office.validate().is_ok());
    }

    #[test]
    fn test_deep_markup_is_cut_off_not_rejected() {
        let depth = MAX_DEPTH + 100;
        let html = format!(
            "<html><body><p>shallow</p>{}deep{}</body></html>",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        );
        let doc = parse_document(&html).unwrap();

        assert_eq!(doc.root.find_first("p").unwrap().text_content(), "shallow");
        assert!(matches!(doc.root.validate(), Err(Error::MalformedTree(_))));
        assert!(doc.root.find_first("p").unwrap().validate().is_ok());
    }

    #[test]
    fn test_for_each_element_visits_in_document_order() {
        let fragment = Fragment::new(vec![
            Node::Element(Element::new("p").with_child(Element::new("b"))),
            Node::Text("x".into()),
            Node::Element(Element::new("ul").with_child(Element::new("li"))),
        ]);
        let mut names = Vec::new();
        fragment.for_each_element(|el| names.push(el.name.clone()));
        assert_eq!(names, ["p", "b", "ul", "li"]);
    }
}
