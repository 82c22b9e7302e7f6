//! Renderer settings.
//!
//! Handles loading, validating, and merging `render.toml`. These settings
//! describe how the renderer behaves (where the documents live, which
//! fallback assets to use, how many news cards fit on the home page). They
//! are distinct from `site-config.json`, which belongs to the site content
//! and is fetched on every render pass.
//!
//! ## Where It Lives
//!
//! `render.toml` is read from the config directory (`--config-dir`, default
//! the working directory). The file is optional: stock defaults apply for
//! anything it leaves out.
//!
//! ## Keys
//!
//! ```toml
//! # Stock values; every key may be omitted
//!
//! site_root = "site"         # Directory or http(s) URL serving the documents
//!
//! [assets]
//! hero_image = "/assets/images/hero.jpg"
//! news_placeholder = "/assets/images/news-placeholder.jpg"
//!
//! [links]
//! news_page = "/news.html"   # Detail page; news links append ?id=<id>
//!
//! [regions]
//! news_list_limit = 5
//! blog_placeholder = "Use the CMS to add blog posts (stored in content/*)."
//! activities_placeholder = "Use the CMS to add activities and events."
//!
//! [preferences]
//! path = ".site-prefs.json"  # Where the chosen language is remembered
//!
//! [processing]
//! max_processes = 4          # Max parallel workers for `build` (omit for auto)
//! ```
//!
//! ## Sparse Files
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [regions]
//! news_list_limit = 3
//! ```
//!
//! A key the renderer does not know is an error, so a misspelled
//! `news_list_limt` fails loudly instead of silently doing nothing.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILENAME: &str = "render.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading render.toml: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing render.toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid render.toml: {0}")]
    Validation(String),
}

/// Renderer settings loaded from `render.toml`.
///
/// Every field has a stock value, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Directory or `http(s)://` base URL serving `site-config.json` and `content/`.
    pub site_root: String,
    /// Fallback images.
    pub assets: AssetsConfig,
    /// Link targets generated by the binder.
    pub links: LinksConfig,
    /// Per-region rendering settings.
    pub regions: RegionsConfig,
    /// Persisted user preferences.
    pub preferences: PreferencesConfig,
    /// Parallel build settings.
    pub processing: ProcessingConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            site_root: "site".to_string(),
            assets: AssetsConfig::default(),
            links: LinksConfig::default(),
            regions: RegionsConfig::default(),
            preferences: PreferencesConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_root.trim().is_empty() {
            return Err(ConfigError::Validation("site_root must not be empty".into()));
        }
        if self.regions.news_list_limit == 0 {
            return Err(ConfigError::Validation(
                "regions.news_list_limit must be at least 1".into(),
            ));
        }
        if self.links.news_page.trim().is_empty() {
            return Err(ConfigError::Validation(
                "links.news_page must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Images used when the documents do not provide one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Hero background when neither content nor site config names one.
    pub hero_image: String,
    /// Card image for news items without an image.
    pub news_placeholder: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            hero_image: "/assets/images/hero.jpg".to_string(),
            news_placeholder: "/assets/images/news-placeholder.jpg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinksConfig {
    /// News detail page. Links carry the item id as `?id=<id>`.
    pub news_page: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            news_page: "/news.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionsConfig {
    /// How many cards the short news list (`#news-list`) shows.
    pub news_list_limit: usize,
    /// Text placed in `#blog-list`.
    pub blog_placeholder: String,
    /// Text placed in `#activities-list`.
    pub activities_placeholder: String,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            news_list_limit: 5,
            blog_placeholder: "Use the CMS to add blog posts (stored in content/*).".to_string(),
            activities_placeholder: "Use the CMS to add activities and events.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreferencesConfig {
    /// JSON file holding the remembered language. Relative paths resolve
    /// against the config directory.
    pub path: String,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: ".site-prefs.json".to_string(),
        }
    }
}

/// Worker pool used by `build`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers during `build`.
    /// Unset means one worker per core; larger values are clamped to the
    /// core count.
    pub max_processes: Option<usize>,
}

/// Worker count for the rayon pool: `max_processes` clamped to `1..=cores`,
/// or `cores` when unset.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// [`RenderConfig::default`] as a TOML table, the layer `render.toml` is
/// merged onto.
pub fn stock_defaults_value() -> toml::Value {
    // Every field of the default config is a plain string, integer or table,
    // so serialization cannot fail.
    toml::Value::try_from(RenderConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()))
}

/// Deep merge: where both sides hold a table the merge recurses, anywhere
/// else the `overlay` value wins. Keys only `base` has survive.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `render.toml` from a directory as a raw TOML value.
///
/// A missing file is `Ok(None)`; a file that does not parse is an error.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Apply `overlay` (if any) to `base` and decode the result into a validated
/// [`RenderConfig`].
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<RenderConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RenderConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `render.toml` in the given directory.
///
/// Stock values fill whatever the file leaves out.
pub fn load_config(dir: &Path) -> Result<RenderConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(dir = %dir.display(), site_root = %config.site_root, "loaded render config");
    Ok(config)
}

/// Commented `render.toml` printed by `gen-config`. Parsing it yields
/// exactly [`RenderConfig::default`].
pub fn stock_config_toml() -> &'static str {
    r##"# site-render Configuration
# =========================
# Every key is optional and shows its stock value. Delete what you do not
# change. Misspelled or unknown keys are rejected.

# Where the site documents live: a directory laid out like the web root
# (site-config.json, content/<lang>/content.json) or an http(s):// base URL.
site_root = "site"

# ---------------------------------------------------------------------------
# Fallback assets
# ---------------------------------------------------------------------------
[assets]
# Hero background used when neither the content nor the site config sets one.
hero_image = "/assets/images/hero.jpg"

# Card image for news items that have no image of their own.
news_placeholder = "/assets/images/news-placeholder.jpg"

# ---------------------------------------------------------------------------
# Links
# ---------------------------------------------------------------------------
[links]
# News detail page. Each news card links here with ?id=<news id>.
news_page = "/news.html"

# ---------------------------------------------------------------------------
# Regions
# ---------------------------------------------------------------------------
[regions]
# Number of cards in the short news list (#news-list).
news_list_limit = 5

# Static text for regions the CMS fills in directly.
blog_placeholder = "Use the CMS to add blog posts (stored in content/*)."
activities_placeholder = "Use the CMS to add activities and events."

# ---------------------------------------------------------------------------
# Preferences
# ---------------------------------------------------------------------------
[preferences]
# JSON file remembering the visitor's language choice.
# Relative paths resolve against the config directory.
path = ".site-prefs.json"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers for `build`.
# Leave commented out to use one worker per CPU core.
# max_processes = 4
"##
}
