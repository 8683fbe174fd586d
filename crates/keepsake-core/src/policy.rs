//! The sanitization whitelist.
//!
//! A single static table decides what survives conversion. When the source
//! markup drifts, this is the file to update: the traversal in
//! [`crate::sanitize`] never names an element kind or class of its own.
//!
//! Lookup order for every element:
//!
//! 1. **Chrome markers** - page furniture (vote bars, footers, comment
//!    sections). Dropped with everything inside, even when the element kind is
//!    otherwise allowed.
//! 2. **Content structures** - platform-specific wrappers that carry authored
//!    content in a non-obvious shape (video embeds, code blocks). Rewritten
//!    into plain markup.
//! 3. **Element table** - per-kind [`Disposition`], allowed attributes and an
//!    optional [`Rewrite`].
//!
//! Kinds absent from the table are unrecognized.

use crate::tree::Element;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Version of [`STANDARD_POLICY`]. Bump when the table changes meaningfully.
pub const POLICY_VERSION: u32 = 3;

/// What happens to an element of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Emitted, with attributes filtered to the allowed set.
    Keep,
    /// Generic container: the element disappears, its children are hoisted.
    Unwrap,
    /// Dropped with its subtree. Used for non-authored payloads.
    Discard,
}

/// Attribute rewrite applied to a kept element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// Make site-relative and protocol-relative `href` values absolute.
    AbsoluteHref,
    /// Pick the full-size image source and make it absolute.
    ImageSource,
    /// Normalize an embedded frame's `src`.
    EmbedFrame,
}

/// Policy record for one element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementPolicy {
    /// Element kind this record applies to.
    pub kind: &'static str,
    /// What to do with the element.
    pub disposition: Disposition,
    /// Attributes that survive filtering.
    pub allowed_attributes: &'static [&'static str],
    /// Optional attribute rewrite.
    pub rewrite: Option<Rewrite>,
}

/// A structural marker matched against a single element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Element kind equals the value.
    Kind(&'static str),
    /// `class` contains the value as a whole token.
    Class(&'static str),
    /// Attribute is present and non-empty.
    Attribute(&'static str),
}

impl Marker {
    /// Whether `el` carries this marker.
    pub fn matches(self, el: &Element) -> bool {
        match self {
            Self::Kind(kind) => el.name == kind,
            Self::Class(token) => el.has_class(token),
            Self::Attribute(name) => el.attr(name).is_some_and(|v| !v.is_empty()),
        }
    }
}

/// Authored-content wrappers that need a dedicated rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStructure {
    /// `data-embed` holds iframe markup for a video.
    VideoEmbed,
    /// `pre > span` wrapper for inline code; becomes `<code>`.
    InlineCode,
    /// Table of per-line rows; becomes `<pre><code>`.
    CodeBlock,
}

/// Marker-to-structure binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFingerprint {
    /// Marker identifying the wrapper.
    pub marker: Marker,
    /// How to rewrite it.
    pub structure: ContentStructure,
}

const NO_ATTRS: &[&str] = &[];

const fn keep(kind: &'static str) -> ElementPolicy {
    ElementPolicy {
        kind,
        disposition: Disposition::Keep,
        allowed_attributes: NO_ATTRS,
        rewrite: None,
    }
}

const fn unwrap(kind: &'static str) -> ElementPolicy {
    ElementPolicy {
        kind,
        disposition: Disposition::Unwrap,
        allowed_attributes: NO_ATTRS,
        rewrite: None,
    }
}

const fn discard(kind: &'static str) -> ElementPolicy {
    ElementPolicy {
        kind,
        disposition: Disposition::Discard,
        allowed_attributes: NO_ATTRS,
        rewrite: None,
    }
}

const ELEMENTS: &[ElementPolicy] = &[
    // Inline formatting
    keep("b"),
    keep("i"),
    keep("u"),
    keep("em"),
    keep("strong"),
    keep("s"),
    keep("sub"),
    keep("sup"),
    keep("code"),
    keep("wbr"),
    keep("br"),
    // Blocks
    keep("p"),
    keep("h1"),
    keep("h2"),
    keep("h3"),
    keep("h4"),
    keep("ol"),
    keep("ul"),
    keep("li"),
    keep("blockquote"),
    keep("pre"),
    keep("hr"),
    // Links and media
    ElementPolicy {
        kind: "a",
        disposition: Disposition::Keep,
        allowed_attributes: &["href"],
        rewrite: Some(Rewrite::AbsoluteHref),
    },
    ElementPolicy {
        kind: "img",
        disposition: Disposition::Keep,
        allowed_attributes: &["src", "alt"],
        rewrite: Some(Rewrite::ImageSource),
    },
    ElementPolicy {
        kind: "iframe",
        disposition: Disposition::Keep,
        allowed_attributes: &["src", "width", "height", "allowfullscreen"],
        rewrite: Some(Rewrite::EmbedFrame),
    },
    // Generic containers
    unwrap("span"),
    unwrap("div"),
    unwrap("section"),
    unwrap("article"),
    unwrap("main"),
    unwrap("font"),
    unwrap("center"),
    // Never authored
    discard("script"),
    discard("style"),
    discard("noscript"),
    discard("svg"),
    discard("button"),
    discard("form"),
    discard("input"),
    discard("template"),
    discard("link"),
    discard("meta"),
];

const CHROME: &[Marker] = &[
    Marker::Kind("nav"),
    Marker::Kind("header"),
    Marker::Kind("footer"),
    Marker::Kind("aside"),
    Marker::Class("ContentFooter"),
    Marker::Class("AnswerFooter"),
    Marker::Class("hidden"),
    Marker::Class("ActionBar"),
    Marker::Class("VoteButton"),
    Marker::Class("CommentSection"),
    Marker::Class("ExpandToggle"),
    Marker::Class("CollapsedContent"),
    Marker::Class("Credibility"),
    Marker::Class("ShareMenu"),
];

const CONTENT: &[ContentFingerprint] = &[
    ContentFingerprint {
        marker: Marker::Attribute("data-embed"),
        structure: ContentStructure::VideoEmbed,
    },
    ContentFingerprint {
        marker: Marker::Class("inline_codeblock"),
        structure: ContentStructure::InlineCode,
    },
    ContentFingerprint {
        marker: Marker::Class("codeblocktable"),
        structure: ContentStructure::CodeBlock,
    },
];

/// Formatting kinds where `<x><x>..</x></x>` collapses to `<x>..</x>`.
const COLLAPSIBLE: &[&str] = &["b", "i", "u", "em", "strong", "s"];

/// Formatting kinds removed when they end up with no children.
const DROP_WHEN_EMPTY: &[&str] = &["b", "i", "u", "em", "strong", "s", "sub", "sup", "code"];

/// The policy shipped with keepsake, built once per process.
pub static STANDARD_POLICY: LazyLock<SanitizationPolicy> = LazyLock::new(|| {
    SanitizationPolicy::from_tables(POLICY_VERSION, ELEMENTS, CHROME, CONTENT)
});

/// A versioned whitelist table.
#[derive(Debug, Clone)]
pub struct SanitizationPolicy {
    version: u32,
    elements: HashMap<&'static str, ElementPolicy>,
    chrome: &'static [Marker],
    content: &'static [ContentFingerprint],
}

impl SanitizationPolicy {
    /// Build a policy from static tables.
    #[must_use]
    pub fn from_tables(
        version: u32,
        elements: &'static [ElementPolicy],
        chrome: &'static [Marker],
        content: &'static [ContentFingerprint],
    ) -> Self {
        Self {
            version,
            elements: elements.iter().map(|p| (p.kind, *p)).collect(),
            chrome,
            content,
        }
    }

    /// The shared standard policy.
    pub fn standard() -> &'static Self {
        &STANDARD_POLICY
    }

    /// Table version.
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Policy record for an element kind.
    pub fn element(&self, kind: &str) -> Option<&ElementPolicy> {
        self.elements.get(kind)
    }

    /// Whether `el` is page chrome.
    pub fn is_chrome(&self, el: &Element) -> bool {
        self.chrome.iter().any(|marker| marker.matches(el))
    }

    /// Content structure `el` is a wrapper for, if any.
    pub fn content_structure(&self, el: &Element) -> Option<ContentStructure> {
        self.content
            .iter()
            .find(|fp| fp.marker.matches(el))
            .map(|fp| fp.structure)
    }

    /// Whether sanitized output may contain elements of this kind.
    pub fn emits(&self, kind: &str) -> bool {
        self.element(kind)
            .is_some_and(|p| p.disposition == Disposition::Keep)
    }

    /// Whether sanitized output may carry `attribute` on `kind`.
    pub fn allows_attribute(&self, kind: &str, attribute: &str) -> bool {
        self.element(kind).is_some_and(|p| {
            p.disposition == Disposition::Keep && p.allowed_attributes.contains(&attribute)
        })
    }

    /// Whether a single same-kind child collapses into its parent.
    pub fn is_collapsible(kind: &str) -> bool {
        COLLAPSIBLE.contains(&kind)
    }

    /// Whether an empty element of this kind is dropped.
    pub fn drops_when_empty(kind: &str) -> bool {
        DROP_WHEN_EMPTY.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_policy_lookup() {
        let policy = SanitizationPolicy::standard();
        assert_eq!(policy.version(), POLICY_VERSION);
        assert!(policy.emits("blockquote"));
        assert!(!policy.emits("div"), "containers are unwrapped, not emitted");
        assert!(!policy.emits("table"));
        assert!(policy.allows_attribute("a", "href"));
        assert!(!policy.allows_attribute("a", "class"));
        assert!(!policy.allows_attribute("span", "class"));
    }

    #[test]
    fn test_chrome_outranks_allowed_kind() {
        let policy = SanitizationPolicy::standard();
        let footer = Element::new("p").with_attr("class", "foo ContentFooter");
        assert!(policy.emits("p"));
        assert!(policy.is_chrome(&footer));
        assert!(!policy.is_chrome(&Element::new("p").with_attr("class", "Footerish")));
        assert!(policy.is_chrome(&Element::new("nav")));
    }

    #[test]
    fn test_content_structures() {
        let policy = SanitizationPolicy::standard();
        let embed = Element::new("div").with_attr("data-embed", "<iframe></iframe>");
        let empty_embed = Element::new("div").with_attr("data-embed", "");
        let code = Element::new("div").with_attr("class", "inline_codeblock");
        assert_eq!(
            policy.content_structure(&embed),
            Some(ContentStructure::VideoEmbed)
        );
        assert_eq!(policy.content_structure(&empty_embed), None);
        assert_eq!(
            policy.content_structure(&code),
            Some(ContentStructure::InlineCode)
        );
    }

    #[test]
    fn test_table_has_no_duplicate_kinds() {
        assert_eq!(STANDARD_POLICY.elements.len(), ELEMENTS.len());
    }

    #[test]
    fn test_every_emitted_kind_has_keep_disposition() {
        for kind in COLLAPSIBLE.iter().chain(DROP_WHEN_EMPTY) {
            assert!(STANDARD_POLICY.emits(kind), "{kind} must be kept");
        }
    }
}
