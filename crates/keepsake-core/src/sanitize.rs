//! Whitelist-driven sanitization of located content.
//!
//! [`sanitize`] builds a new [`Fragment`] from the input; the input is never
//! mutated. Every decision comes from a [`SanitizationPolicy`]. Structures the
//! policy cannot classify keep their text and are reported through
//! [`Sanitized::unrecognized`] and a `warn!` event carrying the item label and
//! a preview of the offending markup.

use crate::policy::{ContentStructure, Disposition, ElementPolicy, Rewrite, SanitizationPolicy};
use crate::tree::{self, Element, Fragment, Node};
use crate::Result;
use tracing::{debug, warn};
use url::Url;

/// Characters of offending markup kept in an unrecognized-structure report.
pub const FRAGMENT_PREVIEW_CHARS: usize = 240;

const EMBED_WIDTH: &str = "525";
const EMBED_HEIGHT: &str = "295";

/// Per-item inputs the sanitizer needs besides the policy.
#[derive(Debug, Clone, Copy)]
pub struct SanitizeContext<'a> {
    /// Identifies the item in log output (file name or URL).
    pub label: &'a str,
    /// Base that site-relative links resolve against.
    pub site_base: &'a Url,
}

/// A structure the policy could not classify, or authored text a rewrite
/// could not place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedStructure {
    /// Item the structure was found in.
    pub label: String,
    /// Element kind of the offending node.
    pub kind: String,
    /// Why it could not be classified.
    pub reason: &'static str,
    /// Leading part of the node's markup, for triage.
    pub fragment: String,
}

/// Sanitizer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// The cleaned content.
    pub fragment: Fragment,
    /// Every structure that degraded to text, in document order.
    pub unrecognized: Vec<UnrecognizedStructure>,
}

/// Sanitize a fragment.
///
/// Fails only with [`crate::Error::MalformedTree`] when the input cannot be
/// traversed. Unrecognized structure never fails.
pub fn sanitize(
    input: &Fragment,
    policy: &SanitizationPolicy,
    ctx: &SanitizeContext<'_>,
) -> Result<Sanitized> {
    input.validate()?;
    Ok(Pass::new(policy, ctx).run(&input.children))
}

/// Sanitize the children of a located content container.
///
/// The container itself is not emitted.
pub fn sanitize_element(
    content: &Element,
    policy: &SanitizationPolicy,
    ctx: &SanitizeContext<'_>,
) -> Result<Sanitized> {
    content.validate()?;
    Ok(Pass::new(policy, ctx).run(&content.children))
}

/// A content structure rewritten into plain markup.
struct Rewritten {
    element: Option<Element>,
    /// Text of the wrapper that the rewrite did not consume.
    leftover: String,
}

type Skip<'s> = &'s dyn Fn(&Element) -> bool;

struct Pass<'a> {
    policy: &'a SanitizationPolicy,
    ctx: &'a SanitizeContext<'a>,
    unrecognized: Vec<UnrecognizedStructure>,
}

impl<'a> Pass<'a> {
    const fn new(policy: &'a SanitizationPolicy, ctx: &'a SanitizeContext<'a>) -> Self {
        Self {
            policy,
            ctx,
            unrecognized: Vec::new(),
        }
    }

    fn run(mut self, nodes: &[Node]) -> Sanitized {
        let mut children = Vec::new();
        self.visit_nodes(nodes, &mut children);
        Sanitized {
            fragment: Fragment::new(children),
            unrecognized: self.unrecognized,
        }
    }

    fn visit_nodes(&mut self, nodes: &[Node], out: &mut Vec<Node>) {
        for node in nodes {
            match node {
                Node::Text(text) => tree::push_text(out, text),
                Node::Element(el) => self.visit_element(el, out),
            }
        }
    }

    fn visit_element(&mut self, el: &Element, out: &mut Vec<Node>) {
        let policy = self.policy;

        if policy.is_chrome(el) {
            debug!(item = self.ctx.label, kind = %el.name, "dropping chrome");
            return;
        }

        if let Some(structure) = policy.content_structure(el) {
            match self.rewrite_structure(structure, el) {
                Ok(rewritten) => {
                    if let Some(element) = rewritten.element {
                        out.push(Node::Element(element));
                    }
                    self.keep_leftover(
                        el,
                        "text outside the rewritten structure",
                        &rewritten.leftover,
                        out,
                    );
                },
                Err(reason) => self.degrade(el, reason, out),
            }
            return;
        }

        match policy.element(&el.name).copied() {
            Some(rule) if rule.disposition == Disposition::Keep => self.keep(el, rule, out),
            Some(rule) if rule.disposition == Disposition::Unwrap => {
                self.visit_nodes(&el.children, out);
            },
            Some(_) => debug!(item = self.ctx.label, kind = %el.name, "discarding"),
            None => self.degrade(el, "element kind not in policy", out),
        }
    }

    fn keep(&mut self, el: &Element, rule: ElementPolicy, out: &mut Vec<Node>) {
        let Some(mut kept) = self.filter_attributes(el, rule) else {
            debug!(item = self.ctx.label, kind = %el.name, "dropping element without source");
            return;
        };

        if tree::is_void(&kept.name) {
            out.push(Node::Element(kept));
            // Constructed trees may still hang content off a void element.
            self.visit_nodes(&el.children, out);
            return;
        }

        // Frame children only render without frame support; their text
        // moves after the frame.
        if rule.rewrite == Some(Rewrite::EmbedFrame) {
            let fallback = self.text_except(el, &skip_nothing);
            out.push(Node::Element(kept));
            self.keep_leftover(el, "frame fallback text", &fallback, out);
            return;
        }

        self.visit_nodes(&el.children, &mut kept.children);
        collapse_same_kind(&mut kept);
        if kept.children.is_empty() && SanitizationPolicy::drops_when_empty(&kept.name) {
            return;
        }
        out.push(Node::Element(kept));
    }

    /// Copy of `el` without children, carrying only allowed attributes.
    ///
    /// `None` when a rewrite finds nothing to keep (an image with no source).
    fn filter_attributes(&self, el: &Element, rule: ElementPolicy) -> Option<Element> {
        let mut kept = Element::new(&el.name);

        match rule.rewrite {
            None => {},
            Some(Rewrite::AbsoluteHref) => {
                if let Some(href) = el.attr("href") {
                    kept.attrs.insert("href".into(), self.absolute(href));
                }
            },
            Some(Rewrite::ImageSource) => {
                let src = if el.has_class("math") {
                    el.attr("src")
                } else {
                    el.attr("master_src").or_else(|| el.attr("src"))
                };
                let src = src.map(str::trim).filter(|s| !s.is_empty())?;
                kept.attrs.insert("src".into(), self.absolute(src));
            },
            Some(Rewrite::EmbedFrame) => {
                if let Some(src) = el.attr("src") {
                    kept.attrs.insert("src".into(), self.absolute(src));
                }
            },
        }

        for (name, value) in &el.attrs {
            if rule.allowed_attributes.contains(&name.as_str()) && !kept.attrs.contains_key(name) {
                kept.attrs.insert(name.clone(), value.clone());
            }
        }
        Some(kept)
    }

    fn rewrite_structure(
        &self,
        structure: ContentStructure,
        el: &Element,
    ) -> std::result::Result<Rewritten, &'static str> {
        match structure {
            ContentStructure::VideoEmbed => Ok(Rewritten {
                element: Some(self.video_embed(el)?),
                leftover: self.text_except(el, &skip_nothing),
            }),
            ContentStructure::InlineCode => {
                let pre = self
                    .find_content(el, &|e: &Element| e.name == "pre")
                    .into_iter()
                    .next()
                    .ok_or("inline code without pre")?;
                let code = self.text_except(pre, &skip_nothing);
                Ok(Rewritten {
                    element: (!code.is_empty()).then(|| Element::new("code").with_text(&code)),
                    leftover: self.text_except(el, &|e: &Element| std::ptr::eq(e, pre)),
                })
            },
            ContentStructure::CodeBlock => {
                let rows = self.find_content(el, &is_code_row);
                if rows.is_empty() {
                    return Err("code block without line rows");
                }
                let lines: Vec<String> = rows
                    .into_iter()
                    .map(|row| self.text_except(row, &skip_nothing))
                    .collect();
                let code = lines.join("\n");
                let pre = Element::new("pre");
                let element = if code.is_empty() {
                    pre
                } else {
                    pre.with_child(Element::new("code").with_text(&code))
                };
                Ok(Rewritten {
                    element: Some(element),
                    leftover: self.text_except(el, &is_code_row),
                })
            },
        }
    }

    fn video_embed(&self, el: &Element) -> std::result::Result<Element, &'static str> {
        let markup = el.attr("data-embed").unwrap_or_default();
        let parsed = tree::parse_fragment(markup).map_err(|_| "embed markup could not be parsed")?;

        let mut frame = None;
        parsed.for_each_element(|candidate| {
            if frame.is_none() && candidate.name == "iframe" {
                frame = Some(candidate);
            }
        });
        let frame = frame.ok_or("embed markup has no iframe")?;
        let src = frame.attr("src").ok_or("embedded iframe has no src")?;

        let mut iframe = Element::new("iframe")
            .with_attr("src", &self.absolute(src))
            .with_attr("width", EMBED_WIDTH)
            .with_attr("height", EMBED_HEIGHT);
        if frame.attrs.contains_key("allowfullscreen") {
            iframe.attrs.insert("allowfullscreen".into(), String::new());
        }
        Ok(iframe)
    }

    /// Make site-relative and protocol-relative references absolute.
    fn absolute(&self, reference: &str) -> String {
        if reference.starts_with("//") {
            format!("https:{reference}")
        } else if reference.starts_with('/') {
            self.ctx
                .site_base
                .join(reference)
                .map_or_else(|_| reference.to_string(), String::from)
        } else {
            reference.to_string()
        }
    }

    /// Keep the text of an unclassifiable node, drop its markup.
    fn degrade(&mut self, el: &Element, reason: &'static str, out: &mut Vec<Node>) {
        let text = self.text_except(el, &skip_nothing);

        if text.trim().is_empty() {
            debug!(item = self.ctx.label, kind = %el.name, reason, "dropping empty structure");
        } else {
            self.report(el, reason);
        }
        tree::push_text(out, &text);
    }

    /// Emit authored text that a rewrite left behind as a plain text run.
    fn keep_leftover(
        &mut self,
        el: &Element,
        reason: &'static str,
        text: &str,
        out: &mut Vec<Node>,
    ) {
        if text.trim().is_empty() {
            return;
        }
        self.report(el, reason);
        tree::push_text(out, text);
    }

    fn report(&mut self, el: &Element, reason: &'static str) {
        let fragment = preview(&el.to_html());
        warn!(
            item = self.ctx.label,
            kind = %el.name,
            reason,
            fragment = %fragment,
            "unrecognized structure, keeping text only"
        );
        self.unrecognized.push(UnrecognizedStructure {
            label: self.ctx.label.to_string(),
            kind: el.name.clone(),
            reason,
            fragment,
        });
    }

    /// Chrome and discarded kinds never contribute text.
    fn is_dropped(&self, el: &Element) -> bool {
        self.policy.is_chrome(el)
            || self
                .policy
                .element(&el.name)
                .is_some_and(|rule| rule.disposition == Disposition::Discard)
    }

    /// Text of `el`, leaving out dropped subtrees and those `skip` claims.
    fn text_except(&self, el: &Element, skip: Skip<'_>) -> String {
        let mut out = String::new();
        self.collect_text(el, skip, &mut out);
        out
    }

    fn collect_text(&self, el: &Element, skip: Skip<'_>, out: &mut String) {
        for child in &el.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(inner) => {
                    if !self.is_dropped(inner) && !skip(inner) {
                        self.collect_text(inner, skip, out);
                    }
                },
            }
        }
    }

    /// Outermost descendants matching `wanted`, outside dropped subtrees.
    fn find_content<'e>(&self, el: &'e Element, wanted: Skip<'_>) -> Vec<&'e Element> {
        let mut found = Vec::new();
        self.collect_matches(el, wanted, &mut found);
        found
    }

    fn collect_matches<'e>(&self, el: &'e Element, wanted: Skip<'_>, found: &mut Vec<&'e Element>) {
        for child in el.child_elements() {
            if self.is_dropped(child) {
                continue;
            }
            if wanted(child) {
                found.push(child);
            } else {
                self.collect_matches(child, wanted, found);
            }
        }
    }
}

const fn skip_nothing(_: &Element) -> bool {
    false
}

/// A code block row: a `div` with no nested `div`.
fn is_code_row(el: &Element) -> bool {
    el.name == "div" && el.find_first("div").is_none()
}

/// `<x><x>..</x></x>` becomes `<x>..</x>` for collapsible kinds.
fn collapse_same_kind(el: &mut Element) {
    if !SanitizationPolicy::is_collapsible(&el.name) {
        return;
    }
    let single_same_kind = matches!(
        el.children.as_slice(),
        [Node::Element(only)] if only.name == el.name && only.attrs.is_empty()
    );
    if single_same_kind {
        if let Some(Node::Element(only)) = el.children.pop() {
            el.children = only.children;
        }
    }
}

fn preview(markup: &str) -> String {
    markup.chars().take(FRAGMENT_PREVIEW_CHARS).collect()
}
