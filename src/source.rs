use include_dir::{include_dir, Dir};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::loader::LoadError;

static BANK_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/banks");

const BUNDLED_PREFIX: &str = "bundled:";
const FILE_PREFIX: &str = "file://";
const CACHE_BUST_PARAM: &str = "t";
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Where a question bank lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Http(String),
    File(PathBuf),
    Bundled(String),
}

impl SourceLocation {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            SourceLocation::Http(raw.to_string())
        } else if let Some(name) = raw.strip_prefix(BUNDLED_PREFIX) {
            SourceLocation::Bundled(name.to_string())
        } else if let Some(path) = raw.strip_prefix(FILE_PREFIX) {
            SourceLocation::File(PathBuf::from(path))
        } else {
            SourceLocation::File(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Http(url) => write!(f, "{url}"),
            SourceLocation::File(path) => write!(f, "{}", path.display()),
            SourceLocation::Bundled(name) => write!(f, "{BUNDLED_PREFIX}{name}"),
        }
    }
}

/// Fetches the raw bytes of a question bank
pub trait QuestionSource: Send + Sync + 'static {
    fn fetch(&self, location: &SourceLocation) -> Result<Vec<u8>, LoadError>;
}

/// Appends a `t=<unix millis>` parameter so intermediaries serve a fresh copy.
pub fn cache_busted_url(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{CACHE_BUST_PARAM}={millis}")
}

/// Blocking HTTP client, safe to call from loader threads
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::blocking::Client,
    cache_bust: bool,
}

impl HttpSource {
    pub fn new(cache_bust: bool) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, cache_bust })
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let url = if self.cache_bust {
            cache_busted_url(url, chrono::Utc::now().timestamp_millis())
        } else {
            url.to_string()
        };

        tracing::debug!(%url, "fetching question bank");
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Routes each location kind to the matching backend
#[derive(Debug, Clone)]
pub struct DefaultSource {
    http: HttpSource,
}

impl DefaultSource {
    pub fn new(cache_bust: bool) -> Result<Self, LoadError> {
        Ok(Self {
            http: HttpSource::new(cache_bust)?,
        })
    }
}

impl QuestionSource for DefaultSource {
    fn fetch(&self, location: &SourceLocation) -> Result<Vec<u8>, LoadError> {
        match location {
            SourceLocation::Http(url) => self.http.get(url),
            SourceLocation::File(path) => fs::read(path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            }),
            SourceLocation::Bundled(name) => bundled_bank(name)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| LoadError::UnknownBundle(name.clone())),
        }
    }
}

/// Contents of a bank compiled into the binary
pub fn bundled_bank(name: &str) -> Option<&'static [u8]> {
    BANK_DIR
        .get_file(format!("{name}.json"))
        .map(|file| file.contents())
}

pub fn bundled_bank_names() -> Vec<String> {
    let mut names: Vec<String> = BANK_DIR
        .files()
        .filter_map(|f| f.path().file_stem())
        .map(|stem| stem.to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
