//! Render passes over a live page.
//!
//! A [`Renderer`] owns one page and everything a render pass needs: the
//! document source, the user preferences and the renderer settings. It is
//! the Rust counterpart of the page script: [`Renderer::initialize`] runs
//! once when the page is ready, [`Renderer::switch_language`] runs whenever
//! the visitor picks another language.
//!
//! ## Ordering
//!
//! Passes may overlap (the API takes `&self`, so several threads can drive
//! one renderer). Each pass takes a ticket from a generation counter before
//! fetching anything. When its documents arrive it only touches the page if
//! its ticket is still the newest one; otherwise it reports
//! [`RenderOutcome::Stale`] and leaves the page alone. The last pass to be
//! *requested* therefore decides what the page shows, regardless of which
//! fetch completes last.

use crate::bind::{self, BindContext, BindReport, Region};
use crate::config::RenderConfig;
use crate::lang;
use crate::loader::{self, LoadError};
use crate::page::Page;
use crate::prefs::{LANG_KEY, PrefsError, UserPreferences};
use crate::source::DocumentSource;
use crate::types::is_valid_lang_code;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("saving preferences: {0}")]
    Prefs(#[from] PrefsError),
    #[error("invalid language code {0:?}")]
    InvalidLang(String),
}

/// What happened to a render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The page now shows this pass's documents.
    Applied(BindReport),
    /// A newer pass was requested while this one was fetching; its result
    /// was discarded.
    Stale { generation: u64, latest: u64 },
}

impl RenderOutcome {
    pub fn report(&self) -> Option<&BindReport> {
        match self {
            RenderOutcome::Applied(report) => Some(report),
            RenderOutcome::Stale { .. } => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, RenderOutcome::Stale { .. })
    }
}

/// Result of page initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initialized {
    /// Language chosen by resolution.
    pub lang: String,
    /// Options written into `#lang-select` (0 when the page has none or the
    /// pass was not applied).
    pub lang_options: usize,
    pub outcome: RenderOutcome,
}

pub struct Renderer<S, P> {
    source: S,
    prefs: Mutex<P>,
    settings: RenderConfig,
    page: Mutex<Page>,
    generation: AtomicU64,
}

fn check_lang(lang: &str) -> Result<(), RenderError> {
    if is_valid_lang_code(lang) {
        Ok(())
    } else {
        Err(RenderError::InvalidLang(lang.to_string()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: DocumentSource, P: UserPreferences> Renderer<S, P> {
    pub fn new(source: S, prefs: P, settings: RenderConfig, page: Page) -> Self {
        Self {
            source,
            prefs: Mutex::new(prefs),
            settings,
            page: Mutex::new(page),
            generation: AtomicU64::new(0),
        }
    }

    /// Page-ready entry point: load the site config, resolve the language
    /// from `location` (the page URL, if any) and the stored preference,
    /// then render.
    pub fn initialize(&self, location: Option<&str>) -> Result<Initialized, RenderError> {
        let config = loader::load_config(&self.source)?;
        let query = location.and_then(lang::query_lang);
        let lang = {
            let prefs = lock(&self.prefs);
            lang::resolve_language(&config, query.as_deref(), &*prefs)
        };
        tracing::info!(lang = %lang, query = ?query, "resolved language");

        let outcome = self.render_pass(&lang)?;
        let lang_options = outcome
            .report()
            .and_then(|report| report.items(Region::LangSelect))
            .unwrap_or(0);
        Ok(Initialized {
            lang,
            lang_options,
            outcome,
        })
    }

    /// The visitor picked `lang`: remember it, then render with it.
    ///
    /// A code that cannot name a content directory is rejected before
    /// anything is stored.
    pub fn switch_language(&self, lang: &str) -> Result<RenderOutcome, RenderError> {
        check_lang(lang)?;
        lock(&self.prefs).set(LANG_KEY, lang)?;
        tracing::info!(lang, "language switched");
        self.render_pass(lang)
    }

    /// One full fetch-and-bind cycle for `lang`.
    ///
    /// The language selector is re-bound along with the content. On error
    /// the page is left exactly as it was.
    pub fn render_pass(&self, lang: &str) -> Result<RenderOutcome, RenderError> {
        check_lang(lang)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(lang, generation, "render pass started");

        let content = loader::load_content(&self.source, lang)?;
        let config = loader::load_config(&self.source)?;

        let mut page = lock(&self.page);
        let latest = self.generation.load(Ordering::SeqCst);
        if latest != generation {
            tracing::warn!(lang, generation, latest, "discarding stale render pass");
            return Ok(RenderOutcome::Stale { generation, latest });
        }
        let report = bind::bind(
            &mut page,
            &BindContext {
                config: &config,
                content: &content,
                lang,
                settings: &self.settings,
            },
        );
        Ok(RenderOutcome::Applied(report))
    }

    /// Snapshot of the page as it currently stands.
    pub fn page_html(&self) -> String {
        lock(&self.page).as_str().to_string()
    }

    pub fn into_page(self) -> Page {
        self.page.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn preferences(&self) -> MutexGuard<'_, P> {
        lock(&self.prefs)
    }

    pub fn settings(&self) -> &RenderConfig {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::Region;
    use crate::page::Selector;
    use crate::prefs::MemoryPreferences;
    use crate::source::{Response, SourceError};
    use crate::test_helpers::*;
    use std::sync::mpsc;

    const TEMPLATE: &str = r#"<html><body>
<select id="lang-select"></select>
<h1 class="site-name"></h1>
<div id="news-list"></div>
</body></html>"#;

    fn two_language_source() -> MemorySource {
        MemorySource::new()
            .with_config(&sample_config())
            .with_content("en", &sample_content_titled("News", 2))
            .with_content("fr", &sample_content_titled("Nouvelles", 2))
    }

    fn renderer<S: DocumentSource>(
        source: S,
        prefs: MemoryPreferences,
    ) -> Renderer<S, MemoryPreferences> {
        Renderer::new(source, prefs, RenderConfig::default(), Page::new(TEMPLATE))
    }

    #[test]
    fn initialize_renders_default_language() {
        let r = renderer(two_language_source(), MemoryPreferences::new());
        let init = r.initialize(None).unwrap();
        assert_eq!(init.lang, "en");
        assert_eq!(init.lang_options, 2);
        assert!(init.outcome.report().unwrap().contains(Region::NewsList));

        let html = r.page_html();
        assert!(html.contains("News 0"));
        assert!(html.contains(r#"<option value="en" selected>EN</option>"#));
        assert!(html.contains("Grace Chapel"));
    }

    #[test]
    fn initialize_honors_query_over_preference() {
        let prefs = MemoryPreferences::new().with(LANG_KEY, "fr");
        let r = renderer(two_language_source(), prefs);
        let init = r.initialize(Some("/index.html?lang=en")).unwrap();
        assert_eq!(init.lang, "en");
        assert!(r.page_html().contains("News 0"));
    }

    #[test]
    fn initialize_uses_stored_preference() {
        let prefs = MemoryPreferences::new().with(LANG_KEY, "fr");
        let r = renderer(two_language_source(), prefs);
        let init = r.initialize(Some("/index.html")).unwrap();
        assert_eq!(init.lang, "fr");
        assert!(r.page_html().contains("Nouvelles 0"));
    }

    #[test]
    fn initialize_does_not_persist() {
        let r = renderer(two_language_source(), MemoryPreferences::new());
        r.initialize(Some("?lang=fr")).unwrap();
        assert_eq!(r.preferences().get(LANG_KEY), None);
    }

    #[test]
    fn switch_language_persists_and_rerenders() {
        let r = renderer(two_language_source(), MemoryPreferences::new());
        r.initialize(None).unwrap();

        let outcome = r.switch_language("fr").unwrap();
        assert_eq!(outcome.report().unwrap().lang, "fr");
        assert_eq!(r.preferences().get(LANG_KEY).as_deref(), Some("fr"));

        let html = r.page_html();
        assert!(html.contains("Nouvelles 0"));
        assert!(!html.contains("News 0"));
    }

    #[test]
    fn switch_language_moves_selector() {
        let r = renderer(two_language_source(), MemoryPreferences::new());
        r.initialize(None).unwrap();
        r.switch_language("fr").unwrap();

        let html = r.page_html();
        assert!(html.contains("Nouvelles 0"));
        assert!(html.contains(
            r#"<option value="en">EN</option><option value="fr" selected>FR</option>"#
        ));
    }

    #[test]
    fn switch_language_rejects_path_like_codes() {
        let source = two_language_source();
        let r = renderer(&source, MemoryPreferences::new());
        let err = r.switch_language("../private").unwrap_err();
        assert!(matches!(err, RenderError::InvalidLang(ref lang) if lang == "../private"));
        assert_eq!(r.preferences().get(LANG_KEY), None);
        assert!(source.requests().is_empty());
        assert_eq!(r.page_html(), TEMPLATE);
    }

    #[test]
    fn initialize_ignores_path_like_preference() {
        let prefs = MemoryPreferences::new().with(LANG_KEY, "../private");
        let source = two_language_source();
        let r = renderer(&source, prefs);
        let init = r.initialize(None).unwrap();
        assert_eq!(init.lang, "en");
        assert!(
            source
                .requests()
                .iter()
                .all(|path| !path.contains("private"))
        );
    }

    #[test]
    fn switch_to_missing_language_falls_back() {
        let r = renderer(two_language_source(), MemoryPreferences::new());
        r.switch_language("de").unwrap();
        assert_eq!(r.preferences().get(LANG_KEY).as_deref(), Some("de"));
        assert!(r.page_html().contains("News 0"));
    }

    #[test]
    fn failed_pass_leaves_page_untouched() {
        let source = MemorySource::new().with_config(&sample_config());
        let r = renderer(source, MemoryPreferences::new());
        let err = r.render_pass("fr").unwrap_err();
        assert!(matches!(err, RenderError::Load(LoadError::Status { .. })));
        assert_eq!(r.page_html(), TEMPLATE);
    }

    #[test]
    fn missing_config_fails_initialization() {
        let r = renderer(MemorySource::new(), MemoryPreferences::new());
        assert!(r.initialize(None).is_err());
        assert_eq!(r.page_html(), TEMPLATE);
    }

    /// Source whose `fr` content request blocks until released.
    struct GatedSource {
        inner: MemorySource,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl DocumentSource for GatedSource {
        fn fetch(&self, path: &str) -> Result<Response, SourceError> {
            if path == "/content/fr/content.json" {
                if let Some(entered) = lock(&self.entered).take() {
                    entered.send(()).ok();
                }
                lock(&self.release).recv().ok();
            }
            self.inner.fetch(path)
        }
    }

    #[test]
    fn stale_pass_is_discarded() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let source = GatedSource {
            inner: two_language_source(),
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
        };
        let r = renderer(source, MemoryPreferences::new());

        std::thread::scope(|scope| {
            // First request: French, stuck in its fetch.
            let slow = scope.spawn(|| r.switch_language("fr"));
            entered_rx.recv().unwrap();

            // Second request: English, completes first.
            let fast = r.switch_language("en").unwrap();
            assert!(!fast.is_stale());

            release_tx.send(()).unwrap();
            let slow = slow.join().unwrap().unwrap();
            assert_eq!(
                slow,
                RenderOutcome::Stale {
                    generation: 1,
                    latest: 2
                }
            );
        });

        let html = r.page_html();
        assert!(html.contains("News 0"));
        assert!(!html.contains("Nouvelles"));
        assert!(html.contains(r#"<option value="en" selected>EN</option>"#));
        assert_eq!(r.preferences().get(LANG_KEY).as_deref(), Some("en"));
    }

    #[test]
    fn into_page_returns_rendered_document() {
        let r = renderer(two_language_source(), MemoryPreferences::new());
        r.render_pass("en").unwrap();
        let page = r.into_page();
        assert_eq!(page.inner_html(Selector::Class("site-name")), Some("Grace Chapel"));
    }
}
