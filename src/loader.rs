//! Config and content loading.
//!
//! Every call goes back to the [`DocumentSource`]; nothing is memoized, so a
//! render pass sees whatever the store holds at that moment.
//!
//! Content loading has exactly one recovery path: when the requested
//! language's document answers with a failing status, the site config is
//! reloaded and the default language's document is fetched instead. Nothing
//! else falls back. A body that arrives but cannot be decoded is reported as
//! [`LoadError::Malformed`], and a failure of the fallback request itself
//! propagates to the caller.

use crate::source::{DocumentSource, Response, SourceError};
use crate::types::{ContentDocument, DocumentError, SiteConfig};
use thiserror::Error;

/// Well-known location of the site config document.
pub const CONFIG_PATH: &str = "/site-config.json";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("fetching {path}: {source}")]
    Source {
        path: String,
        #[source]
        source: SourceError,
    },
    #[error("{path} answered with status {status}")]
    Status { path: String, status: u16 },
    #[error("malformed content at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: DocumentError,
    },
}

impl LoadError {
    /// Path of the request that failed.
    pub fn path(&self) -> &str {
        match self {
            LoadError::Source { path, .. }
            | LoadError::Status { path, .. }
            | LoadError::Malformed { path, .. } => path,
        }
    }
}

/// Location of a language's content document.
pub fn content_path(lang: &str) -> String {
    format!("/content/{lang}/content.json")
}

fn fetch(source: &dyn DocumentSource, path: &str) -> Result<Response, LoadError> {
    source.fetch(path).map_err(|source| LoadError::Source {
        path: path.to_string(),
        source,
    })
}

fn require_success(path: &str, response: Response) -> Result<Response, LoadError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(LoadError::Status {
            path: path.to_string(),
            status: response.status,
        })
    }
}

/// Fetch and decode `/site-config.json`.
pub fn load_config(source: &dyn DocumentSource) -> Result<SiteConfig, LoadError> {
    let response = require_success(CONFIG_PATH, fetch(source, CONFIG_PATH)?)?;
    SiteConfig::from_json(&response.body).map_err(|source| LoadError::Malformed {
        path: CONFIG_PATH.to_string(),
        source,
    })
}

/// Fetch and decode the content document for `lang`, falling back to the
/// configured default language when the first request fails by status.
pub fn load_content(
    source: &dyn DocumentSource,
    lang: &str,
) -> Result<ContentDocument, LoadError> {
    let path = content_path(lang);
    let response = fetch(source, &path)?;
    if response.is_success() {
        return decode_content(&path, &response);
    }

    let config = load_config(source)?;
    let fallback = content_path(config.default_lang());
    tracing::warn!(
        requested = %path,
        status = response.status,
        fallback = %fallback,
        "content unavailable, using default language"
    );
    let response = require_success(&fallback, fetch(source, &fallback)?)?;
    decode_content(&fallback, &response)
}

fn decode_content(path: &str, response: &Response) -> Result<ContentDocument, LoadError> {
    ContentDocument::from_json(&response.body).map_err(|source| LoadError::Malformed {
        path: path.to_string(),
        source,
    })
}

/// How one language's content document looks in the store, fetched
/// directly without the default-language fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LangStatus {
    Available { news: usize, sermons: usize },
    Missing { status: u16 },
    Malformed { reason: String },
}

#[derive(Debug, Clone)]
pub struct SiteCheck {
    pub config: SiteConfig,
    pub langs: Vec<(String, LangStatus)>,
}

impl SiteCheck {
    /// The store can serve every render: every document decodes and the
    /// default language, which every fallback lands on, is present.
    pub fn is_healthy(&self) -> bool {
        let default = self.config.default_lang();
        let default_ok = self
            .langs
            .iter()
            .any(|(lang, status)| {
                lang == default && matches!(status, LangStatus::Available { .. })
            });
        let none_malformed = !self
            .langs
            .iter()
            .any(|(_, status)| matches!(status, LangStatus::Malformed { .. }));
        default_ok && none_malformed
    }
}

/// Fetch the config and every language's content, reporting per language
/// instead of stopping at the first problem.
pub fn check_site(source: &dyn DocumentSource) -> Result<SiteCheck, LoadError> {
    let config = load_config(source)?;
    let mut langs: Vec<String> = config.available_langs.clone();
    if !config.offers(config.default_lang()) {
        langs.push(config.default_lang().to_string());
    }

    let mut statuses = Vec::with_capacity(langs.len());
    for lang in langs {
        let path = content_path(&lang);
        let response = fetch(source, &path)?;
        let status = if !response.is_success() {
            LangStatus::Missing {
                status: response.status,
            }
        } else {
            match ContentDocument::from_json(&response.body) {
                Ok(content) => LangStatus::Available {
                    news: content.news.len(),
                    sermons: content.sermons.len(),
                },
                Err(e) => LangStatus::Malformed {
                    reason: e.to_string(),
                },
            }
        };
        statuses.push((lang, status));
    }
    Ok(SiteCheck {
        config,
        langs: statuses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    #[test]
    fn content_path_embeds_language() {
        assert_eq!(content_path("fr"), "/content/fr/content.json");
    }

    #[test]
    fn load_config_decodes_document() {
        let source = MemorySource::new().with_config(&sample_config());
        let config = load_config(&source).unwrap();
        assert_eq!(config.site_name, "Grace Chapel");
    }

    #[test]
    fn load_config_refetches_every_call() {
        let source = MemorySource::new().with_config(&sample_config());
        load_config(&source).unwrap();
        load_config(&source).unwrap();
        assert_eq!(source.requests(), vec![CONFIG_PATH, CONFIG_PATH]);
    }

    #[test]
    fn load_config_missing_is_status_error() {
        let source = MemorySource::new();
        let err = load_config(&source).unwrap_err();
        assert!(matches!(err, LoadError::Status { status: 404, .. }));
        assert_eq!(err.path(), CONFIG_PATH);
    }

    #[test]
    fn load_config_non_json_is_malformed() {
        let source = MemorySource::new().with_body(CONFIG_PATH, 200, "not json");
        let err = load_config(&source).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn load_content_returns_requested_language() {
        let source = MemorySource::new()
            .with_config(&sample_config())
            .with_content("fr", &sample_content_titled("Nouvelles", 2));
        let content = load_content(&source, "fr").unwrap();
        assert_eq!(content.news[0].title, "Nouvelles 0");
        assert_eq!(source.requests(), vec!["/content/fr/content.json"]);
    }

    #[test]
    fn failing_status_falls_back_to_default_language() {
        let source = MemorySource::new()
            .with_config(&sample_config())
            .with_content("en", &sample_content_titled("News", 1));
        let content = load_content(&source, "de").unwrap();
        assert_eq!(content.news[0].title, "News 0");
        assert_eq!(
            source.requests(),
            vec![
                "/content/de/content.json",
                CONFIG_PATH,
                "/content/en/content.json"
            ]
        );
    }

    #[test]
    fn fallback_uses_en_when_default_lang_absent() {
        let mut config = sample_config();
        config.default_lang = None;
        let source = MemorySource::new()
            .with_config(&config)
            .with_content("en", &sample_content(1));
        load_content(&source, "fr").unwrap();
        assert_eq!(
            source.requests().last().map(String::as_str),
            Some("/content/en/content.json")
        );
    }

    #[test]
    fn fallback_failure_propagates() {
        let source = MemorySource::new().with_config(&sample_config());
        let err = load_content(&source, "de").unwrap_err();
        assert!(matches!(err, LoadError::Status { status: 404, .. }));
        assert_eq!(err.path(), "/content/en/content.json");
    }

    #[test]
    fn server_error_also_triggers_fallback() {
        let source = MemorySource::new()
            .with_config(&sample_config())
            .with_body("/content/fr/content.json", 500, "")
            .with_content("en", &sample_content(1));
        assert!(load_content(&source, "fr").is_ok());
    }

    #[test]
    fn malformed_content_does_not_fall_back() {
        let source = MemorySource::new()
            .with_config(&sample_config())
            .with_body("/content/fr/content.json", 200, "{ broken")
            .with_content("en", &sample_content(1));
        let err = load_content(&source, "fr").unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
        assert_eq!(source.requests(), vec!["/content/fr/content.json"]);
    }

    #[test]
    fn check_site_reports_each_language() {
        let source = MemorySource::new()
            .with_config(&sample_config())
            .with_content("en", &sample_content(3))
            .with_body("/content/fr/content.json", 200, r#""oops""#);
        let check = check_site(&source).unwrap();
        assert_eq!(
            check.langs[0],
            (
                "en".to_string(),
                LangStatus::Available {
                    news: 3,
                    sermons: 2
                }
            )
        );
        assert!(matches!(check.langs[1].1, LangStatus::Malformed { .. }));
        assert!(!check.is_healthy());
    }

    #[test]
    fn check_site_missing_non_default_language_is_healthy() {
        let source = MemorySource::new()
            .with_config(&sample_config())
            .with_content("en", &sample_content(1));
        let check = check_site(&source).unwrap();
        assert_eq!(check.langs[1].1, LangStatus::Missing { status: 404 });
        assert!(check.is_healthy());
    }

    #[test]
    fn check_site_includes_default_outside_available() {
        let mut config = sample_config();
        config.default_lang = Some("de".to_string());
        let source = MemorySource::new()
            .with_config(&config)
            .with_content("en", &sample_content(1))
            .with_content("fr", &sample_content(1));
        let check = check_site(&source).unwrap();
        assert_eq!(check.langs.len(), 3);
        assert_eq!(check.langs[2].0, "de");
        assert!(!check.is_healthy());
    }
}
