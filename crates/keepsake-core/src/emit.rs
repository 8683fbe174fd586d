//! Standalone documents and their sidecar metadata.

use crate::localize::ImageReference;
use crate::storage::{Storage, write_atomic};
use crate::tree::Fragment;
use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Styles embedded in every document so it renders the same offline.
pub const STYLESHEET: &str = "blockquote { border-left: 2px solid #ddd; color: #666; margin: 0; padding-left: 16px; } \
code, pre { background: #f4f4f4; } \
pre, h2 { margin: 0; } \
ul { margin: 0 0 0 16px; padding: 8px 0; } \
ol { margin: 0 0 0 28px; padding: 8px 0; } \
li { margin: 0 0 8px; } ";

/// A sanitized body ready to be written as a self-contained page.
#[derive(Debug, Clone, Copy)]
pub struct StandaloneDocument<'a> {
    /// Page title, if the source page had one.
    pub title: Option<&'a str>,
    /// Sanitized (and possibly localized) content.
    pub body: &'a Fragment,
}

impl StandaloneDocument<'_> {
    /// Serialize as a complete HTML page.
    pub fn render(&self) -> String {
        let body = self.body.to_html();
        let mut out = String::with_capacity(body.len() + STYLESHEET.len() + 128);
        out.push_str("<!DOCTYPE html>\n<html><head>");
        if let Some(title) = self.title {
            out.push_str("<title>");
            out.push_str(&html_escape::encode_text(title));
            out.push_str("</title>");
        }
        out.push_str("<meta charset=\"utf-8\"><style>");
        out.push_str(STYLESHEET);
        out.push_str("</style></head><body>");
        out.push_str(&body);
        out.push_str("</body></html>\n");
        out
    }
}

/// Machine-readable facts about a converted document, stored as `<stem>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sidecar {
    /// Canonical URL of the answer, when the page declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Authoring date recorded in the file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Images found in the content.
    #[serde(default)]
    pub images: Vec<ImageReference>,
    /// Number of degraded features (unrecognized structure, remote images).
    pub warnings: usize,
    /// Sanitization policy version used.
    pub policy_version: u32,
}

/// Where an emitted item landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    /// The HTML document.
    pub document: PathBuf,
    /// The JSON sidecar.
    pub sidecar: PathBuf,
}

/// Write the document and sidecar for `stem` into the cooked directory.
pub fn emit(
    storage: &Storage,
    stem: &str,
    document: &StandaloneDocument<'_>,
    sidecar: &Sidecar,
) -> Result<Emitted> {
    let document_path = storage.document_path(stem);
    let sidecar_path = storage.sidecar_path(stem);

    write_atomic(&document_path, document.render().as_bytes())?;
    let mut json = serde_json::to_vec_pretty(sidecar)?;
    json.push(b'\n');
    write_atomic(&sidecar_path, &json)?;

    Ok(Emitted {
        document: document_path,
        sidecar: sidecar_path,
    })
}
