//! Content-container location.
//!
//! Answer pages wrap the authored text in a container with a stable class
//! marker while the layout around it changes between site revisions. The
//! locator searches for those markers instead of fixed paths.

use crate::policy::Marker;
use crate::tree::{Document, Element};
use crate::{Error, Result};

/// Deepest level searched for a content container.
pub const MAX_LOCATE_DEPTH: usize = 96;

/// One known container shape: an element kind plus markers that must all match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerFingerprint {
    /// Short name used in debug output.
    pub name: &'static str,
    /// Element kind of the container.
    pub kind: &'static str,
    /// Markers the container must carry.
    pub markers: &'static [Marker],
}

impl ContainerFingerprint {
    /// Whether `el` has this shape.
    pub fn matches(&self, el: &Element) -> bool {
        el.name == self.kind && self.markers.iter().all(|marker| marker.matches(el))
    }
}

/// Known containers, most specific first.
pub const CONTAINER_FINGERPRINTS: &[ContainerFingerprint] = &[
    ContainerFingerprint {
        name: "expanded-answer",
        kind: "div",
        markers: &[Marker::Class("ExpandedAnswer")],
    },
    ContainerFingerprint {
        name: "expanded-qanswer",
        kind: "div",
        markers: &[Marker::Class("ExpandedQAnswer")],
    },
    ContainerFingerprint {
        name: "answer-content",
        kind: "div",
        markers: &[Marker::Class("spacing_log_answer_content")],
    },
    ContainerFingerprint {
        name: "rendered-qtext",
        kind: "span",
        markers: &[Marker::Class("rendered_qtext")],
    },
];

/// The content container of a page.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    /// The container element. Its children are the authored content.
    pub content: &'a Element,
    /// Fingerprint that matched.
    pub fingerprint: &'static ContainerFingerprint,
    /// Depth of the container below the document root.
    pub depth: usize,
}

/// Find the content container using the built-in fingerprints.
pub fn locate(document: &Document) -> Result<Located<'_>> {
    locate_with(document, CONTAINER_FINGERPRINTS)
}

/// Find the content container using `fingerprints` in priority order.
///
/// For each fingerprint the tree is searched in document order down to
/// [`MAX_LOCATE_DEPTH`]; the first match of the highest-priority fingerprint
/// wins.
pub fn locate_with<'a>(
    document: &'a Document,
    fingerprints: &'static [ContainerFingerprint],
) -> Result<Located<'a>> {
    for fingerprint in fingerprints {
        if let Some((content, depth)) = find_in_order(&document.root, fingerprint) {
            tracing::debug!(
                fingerprint = fingerprint.name,
                depth,
                "located content container"
            );
            return Ok(Located {
                content,
                fingerprint,
                depth,
            });
        }
    }

    Err(Error::NotFound(format!(
        "no content container matched ({} fingerprints checked)",
        fingerprints.len()
    )))
}

fn find_in_order<'a>(
    root: &'a Element,
    fingerprint: &ContainerFingerprint,
) -> Option<(&'a Element, usize)> {
    let mut stack = vec![(root, 0usize)];
    while let Some((el, depth)) = stack.pop() {
        if fingerprint.matches(el) {
            return Some((el, depth));
        }
        if depth < MAX_LOCATE_DEPTH {
            let children: Vec<_> = el.child_elements().collect();
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
    }
    None
}
