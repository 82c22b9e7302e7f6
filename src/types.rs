//! Document schema shared by the loaders and the view binder.
//!
//! Two kinds of JSON documents drive a render:
//!
//! - `/site-config.json` → [`SiteConfig`]: language-independent settings
//!   (site name, languages, donation and contact details).
//! - `/content/{lang}/content.json` → [`ContentDocument`]: news, sermons and
//!   site text for one language.
//!
//! Both are decoded at the source boundary with [`SiteConfig::from_json`] and
//! [`ContentDocument::from_json`]. A body that fails to parse, or parses but
//! does not have the expected shape, is a [`DocumentError`] rather than a
//! generic parse failure further down the pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Language used when the site config does not name a default.
pub const FALLBACK_LANG: &str = "en";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid document: {0}")]
    Invalid(String),
}

/// Global, language-independent site settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub site_name: String,
    pub tagline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    /// Ordered list of language codes offered by the site.
    pub available_langs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_lang: Option<String>,
    pub donation: Donation,
    pub contact: Contact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub bank: String,
    pub account: String,
    pub qr_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub email: String,
    pub address: String,
}

impl SiteConfig {
    /// Decode and validate a `site-config.json` body.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DocumentError> {
        let config: SiteConfig = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the renderer relies on.
    ///
    /// `defaultLang` outside `availableLangs` is tolerated and only logged.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.available_langs.is_empty() {
            return Err(DocumentError::Invalid(
                "availableLangs must not be empty".into(),
            ));
        }
        for lang in self.available_langs.iter().chain(self.default_lang.iter()) {
            if !is_valid_lang_code(lang) {
                return Err(DocumentError::Invalid(format!(
                    "invalid language code {lang:?}"
                )));
            }
        }
        if let Some(default) = &self.default_lang
            && !self.available_langs.contains(default)
        {
            tracing::warn!(
                default_lang = %default,
                available = ?self.available_langs,
                "defaultLang is not one of availableLangs"
            );
        }
        Ok(())
    }

    /// The configured default language, or `"en"` when none is set.
    pub fn default_lang(&self) -> &str {
        self.default_lang.as_deref().unwrap_or(FALLBACK_LANG)
    }

    pub fn offers(&self, lang: &str) -> bool {
        self.available_langs.iter().any(|l| l == lang)
    }
}

/// Language codes end up inside fetch paths, so they must be a single
/// plain path segment.
pub fn is_valid_lang_code(code: &str) -> bool {
    !code.is_empty()
        && code != "."
        && !code.contains("..")
        && !code
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '?' || c == '#' || c.is_whitespace())
}

/// One language's worth of site text, news and sermons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    #[serde(default)]
    pub site: SiteText,
    #[serde(default)]
    pub news: Vec<NewsItem>,
    #[serde(default)]
    pub sermons: Vec<SermonItem>,
}

impl ContentDocument {
    /// Decode a `content.json` body.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DocumentError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Site-level text that varies per language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// CMS identifier; JSON numbers are accepted and kept as their decimal text.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SermonItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
