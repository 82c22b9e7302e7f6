//! Shared test utilities for the site-render test suite.
//!
//! Provides sample documents, an in-memory [`DocumentSource`] that records
//! every request, and a fixture copy helper for tests that need a real site
//! directory on disk.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let source = MemorySource::new()
//!     .with_config(&sample_config())
//!     .with_content("en", &sample_content(3));
//!
//! let content = load_content(&source, "de").unwrap();
//! assert_eq!(source.requests().last().unwrap(), "/content/en/content.json");
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::loader::{CONFIG_PATH, content_path};
use crate::source::{DocumentSource, Response, SourceError};
use crate::types::{
    Contact, ContentDocument, Donation, NewsItem, SermonItem, SiteConfig, SiteText,
};

// =========================================================================
// Sample documents
// =========================================================================

/// Two-language site config (`en` default, `fr`), no hero image.
pub fn sample_config() -> SiteConfig {
    SiteConfig {
        site_name: "Grace Chapel".to_string(),
        tagline: "A place to belong".to_string(),
        hero_image: None,
        available_langs: vec!["en".to_string(), "fr".to_string()],
        default_lang: Some("en".to_string()),
        donation: Donation {
            bank: "First Bank".to_string(),
            account: "12-345".to_string(),
            qr_image: "/assets/images/qr.png".to_string(),
        },
        contact: Contact {
            phone: "+1 555 0100".to_string(),
            email: "hello@grace.example".to_string(),
            address: "1 Chapel Lane".to_string(),
        },
    }
}

/// Content with `news_count` items titled `News 0`, `News 1`, ...
pub fn sample_content(news_count: usize) -> ContentDocument {
    sample_content_titled("News", news_count)
}

/// Content with `news_count` items titled `{prefix} 0`, `{prefix} 1`, ...
/// and two sermons, the second without audio.
pub fn sample_content_titled(prefix: &str, news_count: usize) -> ContentDocument {
    ContentDocument {
        site: SiteText {
            hero_image: None,
            mission: Some("We gather every Sunday.".to_string()),
        },
        news: (0..news_count)
            .map(|i| NewsItem {
                id: format!("{}", i + 1),
                title: format!("{prefix} {i}"),
                excerpt: Some(format!("Excerpt {i}")),
                image: None,
                date: format!("2024-05-{:02}", i + 1),
            })
            .collect(),
        sermons: vec![
            SermonItem {
                title: "Hope".to_string(),
                excerpt: Some("On hope".to_string()),
                audio: Some("/audio/hope.mp3".to_string()),
            },
            SermonItem {
                title: "Faith".to_string(),
                excerpt: None,
                audio: None,
            },
        ],
    }
}

// =========================================================================
// In-memory source
// =========================================================================

/// Serves canned responses and records the paths requested, in order.
/// Unknown paths answer 404.
#[derive(Debug, Default)]
pub struct MemorySource {
    responses: HashMap<String, (u16, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .insert(path.to_string(), (status, body.as_bytes().to_vec()));
        self
    }

    pub fn with_config(self, config: &SiteConfig) -> Self {
        let json = serde_json::to_string(config).unwrap();
        self.with_body(CONFIG_PATH, 200, &json)
    }

    pub fn with_content(self, lang: &str, content: &ContentDocument) -> Self {
        let json = serde_json::to_string(content).unwrap();
        self.with_body(&content_path(lang), 200, &json)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl DocumentSource for MemorySource {
    fn fetch(&self, path: &str) -> Result<Response, SourceError> {
        self.requests.lock().unwrap().push(path.to_string());
        Ok(match self.responses.get(path) {
            Some((status, body)) => Response {
                status: *status,
                body: body.clone(),
            },
            None => Response::not_found(),
        })
    }
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}
