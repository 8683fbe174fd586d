//! Image localization.
//!
//! Remote images referenced by a sanitized fragment are downloaded into a
//! per-document asset directory and the `src` attributes rewritten to point
//! at the local copies. Anything that goes wrong with a single image leaves
//! that image remote and is reported as a warning; localization never fails
//! the item.
//!
//! Asset names are content-addressed from the image URL, so a second run
//! finds the file already on disk and a second pass over a localized
//! fragment has nothing left to do.

use crate::storage::{safe_component, write_atomic};
use crate::tree::{Element, Fragment, Node};
use crate::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

const ASSET_DIR_SUFFIX: &str = "_files";
const ASSET_PREFIX: &str = "img_";
const DEFAULT_EXTENSION: &str = "png";
const KNOWN_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"];

/// Links written by [`AssetDir`]: `<dir>_files/img_<sha256-12>.<ext>`.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static ASSET_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+_files/img_[0-9a-f]{12}\.[a-z]+$").unwrap());

/// Retrieves image bytes.
///
/// Implementations may be arbitrarily slow (rate limiting, retries); the
/// localizer awaits each call before starting the next.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the image at `url`.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// An image discovered in a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    /// Remote URL the image was found under.
    pub source_url: String,
    /// Reference written into the document, when the download succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

/// Localizer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localized {
    /// The fragment with local `src` values where downloads succeeded.
    pub fragment: Fragment,
    /// Every remote image, in first-seen order.
    pub images: Vec<ImageReference>,
    /// Images fetched over the network during this pass.
    pub downloaded: usize,
}

impl Localized {
    /// Images still pointing at their remote URL.
    pub fn unresolved(&self) -> usize {
        self.images.iter().filter(|img| img.local_path.is_none()).count()
    }
}

/// The asset directory belonging to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDir {
    dir: PathBuf,
    link_prefix: String,
}

impl AssetDir {
    /// Asset directory for the document `<stem>.html` inside `output_dir`.
    ///
    /// The directory name is the stem with anything outside
    /// `[A-Za-z0-9._-]` replaced by `_`, so relative references need no
    /// escaping.
    pub fn for_document(output_dir: &Path, stem: &str) -> Self {
        let name = format!("{}{ASSET_DIR_SUFFIX}", safe_component(stem));
        Self {
            dir: output_dir.join(&name),
            link_prefix: name,
        }
    }

    /// Directory on disk.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Whether `src` refers to a local copy rather than the network.
    ///
    /// Only `data:` URIs and links in the shape this type writes are local.
    /// Any other reference, relative or not, is treated as remote.
    pub fn is_local(src: &str) -> bool {
        let src = src.trim();
        src.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
            || ASSET_LINK_RE.is_match(src)
    }

    /// File name an image URL is stored under: `img_<sha256-12>.<ext>`.
    pub fn asset_name(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        let hash: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
        format!("{ASSET_PREFIX}{hash}.{}", extension_of(url))
    }

    fn link_for(&self, name: &str) -> String {
        format!("{}/{name}", self.link_prefix)
    }

    /// Store `url`, reusing an existing file. Returns the relative link and
    /// whether the network was used.
    async fn store(&self, url: &str, fetcher: &dyn ImageFetcher) -> Result<(String, bool)> {
        let name = Self::asset_name(url);
        let target = self.dir.join(&name);
        if target.is_file() {
            debug!(url, file = %target.display(), "image already saved");
            return Ok((self.link_for(&name), false));
        }

        let bytes = fetcher.fetch_image(url).await?;
        if bytes.is_empty() {
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: "empty response body".into(),
            });
        }
        write_atomic(&target, &bytes)?;
        debug!(url, file = %target.display(), bytes = bytes.len(), "image saved");
        Ok((self.link_for(&name), true))
    }
}

/// Localize every remote image in `fragment`.
///
/// `label` identifies the item in warnings.
pub async fn localize(
    fragment: Fragment,
    fetcher: &dyn ImageFetcher,
    assets: &AssetDir,
    label: &str,
) -> Localized {
    let remote = remote_images(&fragment);

    let mut resolved = HashMap::new();
    let mut images = Vec::with_capacity(remote.len());
    let mut downloaded = 0;
    for source_url in remote {
        let fetch_url = absolute_fetch_url(&source_url);
        let local_path = match assets.store(&fetch_url, fetcher).await {
            Ok((link, fetched)) => {
                downloaded += usize::from(fetched);
                resolved.insert(source_url.clone(), link.clone());
                Some(link)
            },
            Err(e) => {
                warn!(item = label, url = %source_url, "image left remote: {e}");
                None
            },
        };
        images.push(ImageReference {
            source_url,
            local_path,
        });
    }

    let fragment = if resolved.is_empty() {
        fragment
    } else {
        Fragment::new(rewrite_nodes(fragment.children, &resolved))
    };

    Localized {
        fragment,
        images,
        downloaded,
    }
}

/// Distinct remote image sources in document order.
pub fn remote_images(fragment: &Fragment) -> Vec<String> {
    let mut remote: Vec<String> = Vec::new();
    fragment.for_each_element(|el| {
        if el.name == "img" {
            if let Some(src) = el.attr("src") {
                if !AssetDir::is_local(src) && !remote.iter().any(|seen| seen == src) {
                    remote.push(src.to_string());
                }
            }
        }
    });
    remote
}

fn rewrite_nodes(nodes: Vec<Node>, resolved: &HashMap<String, String>) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Element(el) => Node::Element(rewrite_element(el, resolved)),
            text @ Node::Text(_) => text,
        })
        .collect()
}

fn rewrite_element(mut el: Element, resolved: &HashMap<String, String>) -> Element {
    if el.name == "img" {
        if let Some(local) = el.attr("src").and_then(|src| resolved.get(src)) {
            let local = local.clone();
            el.attrs.insert("src".into(), local);
        }
    }
    el.children = rewrite_nodes(el.children, resolved);
    el
}

fn absolute_fetch_url(src: &str) -> String {
    let src = src.trim();
    if src.starts_with("//") {
        format!("https:{src}")
    } else {
        src.to_string()
    }
}

fn extension_of(url: &str) -> &'static str {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();
    let ext = Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    ext.and_then(|ext| KNOWN_EXTENSIONS.iter().copied().find(|known| *known == ext))
        .unwrap_or(DEFAULT_EXTENSION)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records requests; answers with fixed bytes or fails.
    struct MockFetcher {
        fail: bool,
        requests: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn working() -> Self {
            Self {
                fail: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageFetcher for MockFetcher {
        async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.lock().unwrap().push(url.to_string());
            if self.fail {
                Err(Error::Fetch {
                    url: url.to_string(),
                    reason: "HTTP 503".into(),
                })
            } else {
                Ok(b"\x89PNG fake".to_vec())
            }
        }
    }

    fn img(src: &str) -> Node {
        Node::Element(Element::new("img").with_attr("src", src))
    }

    fn sample() -> Fragment {
        Fragment::new(vec![
            Node::Element(
                Element::new("p")
                    .with_text("Look: ")
                    .with_child(Element::new("img").with_attr("src", "https://q.example/a.png")),
            ),
            img("//q.example/main-qimg-b"),
            img("https://q.example/a.png"),
            img("already_files/img_0123456789ab.png"),
        ])
    }

    fn srcs(fragment: &Fragment) -> Vec<String> {
        let mut out = Vec::new();
        fragment.for_each_element(|el| {
            if let Some(src) = el.attr("src") {
                out.push(src.to_string());
            }
        });
        out
    }

    #[tokio::test]
    async fn test_localize_downloads_and_rewrites() {
        let out_dir = TempDir::new().unwrap();
        let assets = AssetDir::for_document(out_dir.path(), "2024-01-05 Why");
        let fetcher = MockFetcher::working();

        let result = localize(sample(), &fetcher, &assets, "item").await;

        assert_eq!(
            fetcher.requests(),
            ["https://q.example/a.png", "https://q.example/main-qimg-b"],
            "duplicates fetched once, local references skipped"
        );
        assert_eq!(result.downloaded, 2);
        assert_eq!(result.images.len(), 2);
        assert_eq!(result.unresolved(), 0);

        let a = AssetDir::asset_name("https://q.example/a.png");
        let b = AssetDir::asset_name("https://q.example/main-qimg-b");
        assert!(b.ends_with(".png"));
        assert_eq!(
            srcs(&result.fragment),
            [
                format!("2024-01-05_Why_files/{a}"),
                format!("2024-01-05_Why_files/{b}"),
                format!("2024-01-05_Why_files/{a}"),
                "already_files/img_0123456789ab.png".to_string(),
            ]
        );
        assert!(assets.path().join(&a).is_file());
    }

    #[tokio::test]
    async fn test_failing_fetcher_leaves_references_remote() {
        let out_dir = TempDir::new().unwrap();
        let assets = AssetDir::for_document(out_dir.path(), "x");
        let fetcher = MockFetcher::failing();
        let input = sample();

        let result = localize(input.clone(), &fetcher, &assets, "item").await;

        assert_eq!(result.fragment, input);
        assert_eq!(result.unresolved(), 2);
        assert!(result.images.iter().all(|img| img.local_path.is_none()));
        assert!(!assets.path().exists(), "nothing written on failure");
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let out_dir = TempDir::new().unwrap();
        let assets = AssetDir::for_document(out_dir.path(), "x");
        let fetcher = MockFetcher::working();

        let first = localize(sample(), &fetcher, &assets, "item").await;
        let requests_after_first = fetcher.requests().len();
        let second = localize(first.fragment.clone(), &fetcher, &assets, "item").await;

        assert_eq!(second.fragment, first.fragment);
        assert_eq!(fetcher.requests().len(), requests_after_first);
        assert_eq!(second.downloaded, 0);
        assert!(second.images.is_empty());
    }

    #[tokio::test]
    async fn test_existing_asset_is_reused() {
        let out_dir = TempDir::new().unwrap();
        let assets = AssetDir::for_document(out_dir.path(), "x");
        let url = "https://q.example/a.png";
        std::fs::create_dir_all(assets.path()).unwrap();
        std::fs::write(assets.path().join(AssetDir::asset_name(url)), b"old").unwrap();

        let fetcher = MockFetcher::failing();
        let result = localize(Fragment::new(vec![img(url)]), &fetcher, &assets, "item").await;

        assert!(fetcher.requests().is_empty());
        assert_eq!(result.unresolved(), 0);
        assert_eq!(result.downloaded, 0);
    }

    #[test]
    fn test_local_detection() {
        assert!(AssetDir::is_local("x_files/img_0123456789ab.png"));
        assert!(AssetDir::is_local("data:image/png;base64,AAAA"));
        assert!(!AssetDir::is_local("https://q.example/a.png"));
        assert!(!AssetDir::is_local("//q.example/a.png"));
        assert!(!AssetDir::is_local("thumb.jpg"));
        assert!(!AssetDir::is_local("x_files/img_1.png"));
        assert!(!AssetDir::is_local("https//q.example/broken.png"));
    }

    #[tokio::test]
    async fn test_relative_source_is_attempted_and_recorded() {
        let out_dir = TempDir::new().unwrap();
        let assets = AssetDir::for_document(out_dir.path(), "x");
        let fetcher = MockFetcher::failing();
        let input = Fragment::new(vec![img("thumb.jpg")]);

        assert_eq!(remote_images(&input), ["thumb.jpg"]);
        let result = localize(input.clone(), &fetcher, &assets, "item").await;

        assert_eq!(fetcher.requests(), ["thumb.jpg"]);
        assert_eq!(result.fragment, input);
        assert_eq!(result.unresolved(), 1);
        assert_eq!(result.images[0].source_url, "thumb.jpg");
    }

    #[test]
    fn test_asset_names() {
        let name = AssetDir::asset_name("https://q.example/photo.JPG?w=200");
        assert!(name.starts_with("img_"));
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), "img_".len() + 12 + ".jpg".len());
        assert_eq!(name, AssetDir::asset_name("https://q.example/photo.JPG?w=200"));
        assert!(AssetDir::asset_name("https://q.example/main-qimg-1").ends_with(".png"));
    }
}
