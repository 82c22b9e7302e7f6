//! Where documents come from.
//!
//! The renderer never touches the filesystem or the network directly. It asks
//! a [`DocumentSource`] for a site-absolute path (`/site-config.json`,
//! `/content/en/content.json`) and gets back a status code and a body, the
//! same way a browser `fetch` would. A failing status is a normal
//! [`Response`], not an error: the content loader decides what a 404 means.
//! [`SourceError`] is reserved for transport failures.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Status and body of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: Vec::new(),
        }
    }

    /// 2xx, like `Response.ok` in the browser.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait DocumentSource: Send + Sync {
    fn fetch(&self, path: &str) -> Result<Response, SourceError>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn fetch(&self, path: &str) -> Result<Response, SourceError> {
        (**self).fetch(path)
    }
}

impl<T: DocumentSource + ?Sized> DocumentSource for Box<T> {
    fn fetch(&self, path: &str) -> Result<Response, SourceError> {
        (**self).fetch(path)
    }
}

/// Serves documents from a local directory laid out like the web root.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a site-absolute path onto the root, refusing anything that
    /// would climb out of it.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }
}

impl DocumentSource for DirSource {
    fn fetch(&self, path: &str) -> Result<Response, SourceError> {
        let Some(file) = self.resolve(path) else {
            tracing::debug!(path, "rejected path outside the site root");
            return Ok(Response::not_found());
        };
        match fs::read(&file) {
            Ok(body) => {
                tracing::debug!(path, bytes = body.len(), "fetched from disk");
                Ok(Response::ok(body))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path, "not found on disk");
                Ok(Response::not_found())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Fetches documents over HTTP from a base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: url::Url,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(base: &str) -> Result<Self, SourceError> {
        Ok(Self {
            base: url::Url::parse(base)?,
            client: reqwest::blocking::Client::new(),
        })
    }

    pub fn url_for(&self, path: &str) -> Result<url::Url, SourceError> {
        Ok(self.base.join(path)?)
    }
}

impl DocumentSource for HttpSource {
    fn fetch(&self, path: &str) -> Result<Response, SourceError> {
        let url = self.url_for(path)?;
        let response = self.client.get(url.clone()).send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        tracing::debug!(%url, status, bytes = body.len(), "fetched over HTTP");
        Ok(Response { status, body })
    }
}

/// Pick a source for a `site_root` setting: `http(s)://` roots go over the
/// network, anything else is a directory.
pub fn open_source(site_root: &str) -> Result<Box<dyn DocumentSource>, SourceError> {
    if site_root.starts_with("http://") || site_root.starts_with("https://") {
        Ok(Box::new(HttpSource::new(site_root)?))
    } else {
        Ok(Box::new(DirSource::new(site_root)))
    }
}
