//! View binding: config and content → page regions.
//!
//! Each [`Region`] is an optional insertion point in the page. [`bind`] walks
//! the regions in a fixed order, skips the ones the page does not contain, and
//! writes markup built with maud into the rest. The result depends only on the
//! documents, the language, the settings, and which regions exist, so the
//! same inputs always produce the same page.
//!
//! All text goes through maud's escaping. URLs coming from documents are
//! additionally screened by [`safe_url`] so a `javascript:` link in the CMS
//! cannot end up clickable.

use crate::config::RenderConfig;
use crate::page::{Page, Selector};
use crate::types::{ContentDocument, NewsItem, SermonItem, SiteConfig};
use maud::{Markup, html};

/// A named place in the page the binder may populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    SiteName,
    Tagline,
    Hero,
    NewsList,
    Sermons,
    About,
    Donation,
    Contact,
    Blog,
    Activities,
    NewsCollection,
    LangSelect,
}

impl Region {
    /// Every region, in binding order.
    pub const ALL: [Region; 12] = [
        Region::SiteName,
        Region::Tagline,
        Region::Hero,
        Region::NewsList,
        Region::Sermons,
        Region::About,
        Region::Donation,
        Region::Contact,
        Region::Blog,
        Region::Activities,
        Region::NewsCollection,
        Region::LangSelect,
    ];

    pub fn selector(self) -> Selector<'static> {
        match self {
            Region::SiteName => Selector::Class("site-name"),
            Region::Tagline => Selector::Class("site-tagline"),
            Region::Hero => Selector::Class("hero-img"),
            Region::NewsList => Selector::Id("news-list"),
            Region::Sermons => Selector::Id("sermons-list"),
            Region::About => Selector::Id("about-content"),
            Region::Donation => Selector::Id("donate-info"),
            Region::Contact => Selector::Id("contact-info"),
            Region::Blog => Selector::Id("blog-list"),
            Region::Activities => Selector::Id("activities-list"),
            Region::NewsCollection => Selector::Id("news-collection"),
            Region::LangSelect => Selector::Id("lang-select"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::SiteName => "site name",
            Region::Tagline => "tagline",
            Region::Hero => "hero image",
            Region::NewsList => "news list",
            Region::Sermons => "sermons",
            Region::About => "about",
            Region::Donation => "donation",
            Region::Contact => "contact",
            Region::Blog => "blog",
            Region::Activities => "activities",
            Region::NewsCollection => "news collection",
            Region::LangSelect => "language selector",
        }
    }
}

/// One region that was written, with the number of items it received
/// (list regions) or elements it touched (text and attribute regions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundRegion {
    pub region: Region,
    pub items: usize,
}

/// What a binding pass did to the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    pub lang: String,
    pub bound: Vec<BoundRegion>,
}

impl BindReport {
    pub fn contains(&self, region: Region) -> bool {
        self.bound.iter().any(|b| b.region == region)
    }

    pub fn items(&self, region: Region) -> Option<usize> {
        self.bound
            .iter()
            .find(|b| b.region == region)
            .map(|b| b.items)
    }
}

/// Everything a binding pass reads.
#[derive(Debug, Clone, Copy)]
pub struct BindContext<'a> {
    pub config: &'a SiteConfig,
    pub content: &'a ContentDocument,
    pub lang: &'a str,
    pub settings: &'a RenderConfig,
}

/// Populate every region present in `page`, the language selector included.
pub fn bind(page: &mut Page, ctx: &BindContext<'_>) -> BindReport {
    let mut report = BindReport {
        lang: ctx.lang.to_string(),
        bound: Vec::new(),
    };
    for region in Region::ALL {
        if !page.contains(region.selector()) {
            continue;
        }
        let items = bind_region(page, region, ctx);
        tracing::debug!(region = region.name(), items, "bound region");
        report.bound.push(BoundRegion { region, items });
    }
    report
}

fn bind_region(page: &mut Page, region: Region, ctx: &BindContext<'_>) -> usize {
    let selector = region.selector();
    let settings = ctx.settings;
    match region {
        Region::SiteName => page.set_text(selector, &ctx.config.site_name),
        Region::Tagline => page.set_text(selector, &ctx.config.tagline),
        Region::Hero => {
            let url = hero_image(ctx.config, ctx.content, &settings.assets.hero_image);
            page.set_style_property(selector, "background-image", &background_url(url))
        }
        Region::NewsList => {
            let news = &ctx.content.news;
            let shown = &news[..news.len().min(settings.regions.news_list_limit)];
            page.set_inner_html(selector, news_cards(shown, settings));
            shown.len()
        }
        Region::Sermons => {
            page.set_inner_html(selector, sermon_list(&ctx.content.sermons));
            ctx.content.sermons.len()
        }
        Region::About => page.set_inner_html(selector, about(ctx.content)),
        Region::Donation => page.set_inner_html(selector, donation(ctx.config)),
        Region::Contact => page.set_inner_html(selector, contact(ctx.config)),
        Region::Blog => {
            page.set_inner_html(selector, placeholder(&settings.regions.blog_placeholder))
        }
        Region::Activities => page.set_inner_html(
            selector,
            placeholder(&settings.regions.activities_placeholder),
        ),
        Region::NewsCollection => {
            page.set_inner_html(selector, news_collection(&ctx.content.news, settings));
            ctx.content.news.len()
        }
        Region::LangSelect => bind_lang_select(page, ctx.config, ctx.lang),
    }
}

/// Fill `#lang-select` with one option per available language, the
/// resolved one selected. Returns the number of options written, or 0 when
/// the page has no selector.
pub fn bind_lang_select(page: &mut Page, config: &SiteConfig, lang: &str) -> usize {
    let selector = Region::LangSelect.selector();
    if !page.contains(selector) {
        return 0;
    }
    page.set_inner_html(selector, lang_options(&config.available_langs, lang));
    config.available_langs.len()
}

// ============================================================================
// Values
// ============================================================================

/// Content hero, else site hero, else the configured default.
pub fn hero_image<'a>(
    config: &'a SiteConfig,
    content: &'a ContentDocument,
    default: &'a str,
) -> &'a str {
    let non_empty = |url: &&str| !url.is_empty();
    content
        .site
        .hero_image
        .as_deref()
        .filter(non_empty)
        .or_else(|| config.hero_image.as_deref().filter(non_empty))
        .unwrap_or(default)
}

/// CSS `url()` value with the URL quoted.
pub fn background_url(url: &str) -> String {
    let mut quoted = String::with_capacity(url.len() + 2);
    for c in safe_url(url).chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' | '\r' => quoted.push(' '),
            _ => quoted.push(c),
        }
    }
    format!("url(\"{quoted}\")")
}

/// Neutralize URL schemes that execute or embed code.
pub fn safe_url(url: &str) -> &str {
    let scheme: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .take_while(|c| *c != ':')
        .collect::<String>()
        .to_ascii_lowercase();
    let has_scheme = url.contains(':');
    if has_scheme && matches!(scheme.as_str(), "javascript" | "vbscript" | "data") {
        "#"
    } else {
        url
    }
}

/// News detail link: `{news_page}?id={id}` with the id form-encoded.
pub fn news_link(news_page: &str, id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
    let separator = if news_page.contains('?') { '&' } else { '?' };
    format!("{news_page}{separator}id={encoded}")
}

// ============================================================================
// Markup
// ============================================================================

fn news_cards(items: &[NewsItem], settings: &RenderConfig) -> Markup {
    html! {
        @for item in items {
            @let image = item.image.as_deref().filter(|u| !u.is_empty()).unwrap_or(&settings.assets.news_placeholder);
            article class="flex gap-4 border-b pb-4 mb-4" {
                img class="w-28 h-20 object-cover rounded" src=(safe_url(image)) alt=(item.title);
                div {
                    h4 class="font-semibold" { (item.title) }
                    p class="text-sm text-gray-600 mt-1" { (item.excerpt.as_deref().unwrap_or("")) }
                    a href=(news_link(&settings.links.news_page, &item.id)) class="text-sm text-indigo-600 mt-2 inline-block" {
                        "Read more →"
                    }
                }
            }
        }
    }
}

fn sermon_list(sermons: &[SermonItem]) -> Markup {
    html! {
        @for sermon in sermons {
            div class="mb-4" {
                h3 class="font-semibold" { (sermon.title) }
                p class="text-sm text-gray-600" { (sermon.excerpt.as_deref().unwrap_or("")) }
                a href=(safe_url(sermon.audio.as_deref().filter(|u| !u.is_empty()).unwrap_or("#"))) class="text-sm text-indigo-600" {
                    "Listen"
                }
            }
        }
    }
}

fn about(content: &ContentDocument) -> Markup {
    html! {
        p class="text-gray-700" { (content.site.mission.as_deref().unwrap_or("")) }
    }
}

fn donation(config: &SiteConfig) -> Markup {
    let donation = &config.donation;
    html! {
        p {
            (donation.bank)
            br;
            (donation.account)
        }
        img src=(safe_url(&donation.qr_image)) alt="QR" class="w-48 mt-3";
    }
}

fn contact(config: &SiteConfig) -> Markup {
    let contact = &config.contact;
    html! {
        p {
            "Phone: "
            a href={ "tel:" (contact.phone) } { (contact.phone) }
            br;
            "Email: "
            a href={ "mailto:" (contact.email) } { (contact.email) }
            br;
            "Address: "
            (contact.address)
        }
    }
}

fn placeholder(text: &str) -> Markup {
    html! {
        p { (text) }
    }
}

fn news_collection(items: &[NewsItem], settings: &RenderConfig) -> Markup {
    html! {
        @for item in items {
            article class="mb-6 border-b pb-4" {
                h2 class="text-xl font-semibold" { (item.title) }
                p class="text-sm text-gray-500" { (item.date) }
                p class="mt-2" { (item.excerpt.as_deref().unwrap_or("")) }
                a href=(news_link(&settings.links.news_page, &item.id)) class="text-indigo-600" { "Read more" }
            }
        }
    }
}

fn lang_options(langs: &[String], selected: &str) -> Markup {
    html! {
        @for lang in langs {
            option value=(lang) selected[lang == selected] { (lang.to_uppercase()) }
        }
    }
}
