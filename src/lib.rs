//! # site-render
//!
//! Renders a small multilingual organization website (the church or
//! community-group pattern: news, sermons, about, donations, contact) from
//! two kinds of JSON documents kept by an external CMS:
//!
//! ```text
//! site/
//! ├── site-config.json            # name, tagline, languages, donation, contact
//! └── content/
//!     ├── en/content.json         # news, sermons, mission text
//!     └── fr/content.json
//! ```
//!
//! Page templates are ordinary HTML. The renderer fills whichever regions a
//! template declares (`.site-name`, `#news-list`, `#contact-info`, ...) and
//! leaves everything else alone.
//!
//! # Render Pass
//!
//! ```text
//! initialize   load config → resolve language → render pass
//! render pass  load content (fallback to default language) → load config →
//!              bind regions and #lang-select
//! switch       persist language → render pass
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Document schema and validating decode |
//! | [`source`] | Where documents come from: directory or HTTP |
//! | [`loader`] | Config/content loading, default-language fallback, site check |
//! | [`lang`] | Language resolution: query → preference → default → `en` |
//! | [`prefs`] | Injected user preference storage (memory, JSON file) |
//! | [`page`] | HTML template with region lookup and in-place rewriting |
//! | [`bind`] | Region bindings built with Maud |
//! | [`render`] | Render passes over a live page, last-requested-wins ordering |
//! | [`generate`] | Static build of every page in every language |
//! | [`config`] | `render.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Escaped Markup Only
//!
//! Region markup is built with [Maud](https://maud.lambda.xyz/), so every
//! interpolated field is escaped. Content comes from a CMS that several
//! people may write to; a news title must never become script. URLs get an
//! extra scheme check in [`bind::safe_url`].
//!
//! ## Injected State
//!
//! The renderer does not reach for global storage. The document source and
//! the preference store are handed to [`render::Renderer`], which keeps a
//! render a function of its inputs and lets tests swap in memory-backed
//! versions.
//!
//! ## Generations Instead of Cancellation
//!
//! A fetch cannot be recalled once issued. Instead every render pass carries a
//! generation number, and a pass that finishes after a newer one was requested
//! drops its result. See [`render`].

pub mod bind;
pub mod config;
pub mod generate;
pub mod lang;
pub mod loader;
pub mod output;
pub mod page;
pub mod prefs;
pub mod render;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
