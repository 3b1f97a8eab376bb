//! Document sources.
//!
//! Every page lives at `<path>/<name>` on the remote store. A page that is
//! not there is `Ok(None)`: series and instances are often listed before
//! anyone has built their page.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::FetchError;

pub trait Fetch: Send + Sync {
    fn fetch(&self, path: &str, name: &str) -> Result<Option<String>, FetchError>;
}

impl<T: Fetch + ?Sized> Fetch for Box<T> {
    fn fetch(&self, path: &str, name: &str) -> Result<Option<String>, FetchError> {
        (**self).fetch(path, name)
    }
}

fn join(path: &str, name: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", path, name)
    }
}

/// Reads pages over HTTP(S) from the published site.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(HttpFetcher {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, path: &str, name: &str) -> Result<Option<String>, FetchError> {
        let url = format!("{}/{}", self.base_url, join(path, name));
        debug!(%url, "GET");

        let http = |source| FetchError::Http {
            url: url.clone(),
            source,
        };
        let response = self.client.get(&url).send().map_err(http)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        response.text().map(Some).map_err(http)
    }
}

/// Reads pages from a local mirror of the site.
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirFetcher { root: root.into() }
    }
}

impl Fetch for DirFetcher {
    fn fetch(&self, path: &str, name: &str) -> Result<Option<String>, FetchError> {
        let file = self.root.join(join(path, name));
        match std::fs::read(&file) {
            // Old pages are not all UTF-8
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FetchError::Io {
                path: file.display().to_string(),
                source,
            }),
        }
    }
}

/// Pages held in memory, keyed by `path/name`.
#[derive(Default)]
pub struct MemoryFetcher {
    docs: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, name: &str, text: impl Into<String>) {
        self.docs.insert(join(path, name), text.into());
    }

    pub fn with(mut self, path: &str, name: &str, text: impl Into<String>) -> Self {
        self.insert(path, name, text);
        self
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, path: &str, name: &str) -> Result<Option<String>, FetchError> {
        Ok(self.docs.get(&join(path, name)).cloned())
    }
}
