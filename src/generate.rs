//! Static site generation.
//!
//! Renders every page template for every language ahead of time, so the
//! site can be served as plain files with no client-side rendering at all.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html           # default language
//! ├── sermons.html
//! ├── en/
//! │   ├── index.html
//! │   └── sermons.html
//! └── fr/
//!     ├── index.html
//!     └── sermons.html
//! ```
//!
//! Templates are discovered recursively under the pages directory (`*.html`),
//! and their relative paths are preserved.
//!
//! ## Work Split
//!
//! The site config and each language's content are loaded once, up front
//! and sequentially. Binding is pure, so the (page × language) jobs then run
//! in parallel on the rayon pool.

use crate::bind::{self, BindContext, BindReport};
use crate::config::RenderConfig;
use crate::loader::{self, LoadError};
use crate::page::Page;
use crate::source::DocumentSource;
use crate::types::ContentDocument;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walking pages: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// A page written to the output directory.
#[derive(Debug, Clone)]
pub struct GeneratedPage {
    pub lang: String,
    /// Output path relative to the output directory.
    pub path: PathBuf,
    pub report: BindReport,
}

#[derive(Debug, Clone)]
pub struct GenerateSummary {
    pub default_lang: String,
    pub langs: Vec<String>,
    pub templates: usize,
    pub pages: Vec<GeneratedPage>,
}

/// Page templates under `pages_dir`, relative and sorted.
pub fn discover_pages(pages_dir: &Path) -> Result<Vec<PathBuf>, GenerateError> {
    let mut pages = Vec::new();
    for entry in WalkDir::new(pages_dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("html"))
            && let Ok(relative) = path.strip_prefix(pages_dir)
        {
            pages.push(relative.to_path_buf());
        }
    }
    pages.sort();
    Ok(pages)
}

pub fn generate(
    source: &dyn DocumentSource,
    pages_dir: &Path,
    output_dir: &Path,
    settings: &RenderConfig,
) -> Result<GenerateSummary, GenerateError> {
    let config = loader::load_config(source)?;
    let default_lang = config.default_lang().to_string();

    let mut langs = config.available_langs.clone();
    if !langs.contains(&default_lang) {
        langs.push(default_lang.clone());
    }

    let mut contents: BTreeMap<&str, ContentDocument> = BTreeMap::new();
    for lang in &langs {
        contents.insert(lang, loader::load_content(source, lang)?);
    }

    let templates: Vec<(PathBuf, String)> = discover_pages(pages_dir)?
        .into_iter()
        .map(|rel| fs::read_to_string(pages_dir.join(&rel)).map(|html| (rel, html)))
        .collect::<Result<_, _>>()?;

    // (language, output path, template)
    let mut jobs: Vec<(&str, PathBuf, &str)> = Vec::new();
    for (rel, html) in &templates {
        for lang in &langs {
            jobs.push((lang.as_str(), Path::new(lang).join(rel), html.as_str()));
        }
        jobs.push((default_lang.as_str(), rel.clone(), html.as_str()));
    }

    fs::create_dir_all(output_dir)?;
    let pages = jobs
        .par_iter()
        .map(|(lang, out_rel, template)| -> Result<GeneratedPage, GenerateError> {
            let mut page = Page::new(*template);
            let report = bind::bind(
                &mut page,
                &BindContext {
                    config: &config,
                    content: &contents[*lang],
                    lang: *lang,
                    settings,
                },
            );
            let out_path = output_dir.join(out_rel);
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&out_path, page.into_string())?;
            tracing::debug!(lang, path = %out_rel.display(), "generated page");
            Ok(GeneratedPage {
                lang: lang.to_string(),
                path: out_rel.clone(),
                report,
            })
        })
        .collect::<Result<Vec<_>, GenerateError>>()?;

    Ok(GenerateSummary {
        default_lang,
        langs,
        templates: templates.len(),
        pages,
    })
}
