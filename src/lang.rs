//! Language resolution for the initial render.
//!
//! Precedence, first match wins:
//!
//! 1. `lang` query parameter of the page URL, if the site offers it
//! 2. the persisted `site-lang` preference, if it is a usable code
//! 3. `defaultLang` from the site config
//! 4. `"en"`
//!
//! Resolution never writes the preference; only an explicit language switch
//! does that.

use crate::prefs::{LANG_KEY, UserPreferences};
use crate::types::{SiteConfig, is_valid_lang_code};
use url::Url;

/// Extract the `lang` query parameter from a page location.
///
/// Accepts an absolute URL (`https://site/about.html?lang=fr`), a
/// site-relative one (`/about.html?lang=fr`) or a bare query (`?lang=fr`).
pub fn query_lang(location: &str) -> Option<String> {
    let url = Url::parse(location)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(location)))
        .ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "lang")
        .map(|(_, value)| value.into_owned())
}

pub fn resolve_language(
    config: &SiteConfig,
    query: Option<&str>,
    prefs: &dyn UserPreferences,
) -> String {
    if let Some(lang) = query
        && config.offers(lang)
    {
        return lang.to_string();
    }
    if let Some(saved) = prefs.get(LANG_KEY) {
        if is_valid_lang_code(&saved) {
            return saved;
        }
        tracing::warn!(saved = %saved, "ignoring unusable stored language");
    }
    config.default_lang().to_string()
}
