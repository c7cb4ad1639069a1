use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use anyhow::Context;

use crate::{
    assets::decode::{Logo, LogoFetchError, decode_logo},
    foundation::error::QrBrandResult,
};

/// Transport that produces the raw logo bytes.
pub trait LogoSource: Send + Sync {
    /// Human-readable origin used in logs.
    fn describe(&self) -> String;

    /// Fetch the encoded image bytes.
    fn fetch(&self) -> Result<Vec<u8>, LogoFetchError>;
}

impl<T: LogoSource + ?Sized> LogoSource for Arc<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn fetch(&self) -> Result<Vec<u8>, LogoFetchError> {
        (**self).fetch()
    }
}

/// Fetches the logo with a blocking HTTP GET.
pub struct HttpLogoSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpLogoSource {
    /// Build a source for `url` whose requests time out after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> QrBrandResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("build logo http client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl LogoSource for HttpLogoSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, LogoFetchError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| LogoFetchError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LogoFetchError::Status(status.as_u16()));
        }
        let body = resp
            .bytes()
            .map_err(|e| LogoFetchError::Network(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Reads the logo from local disk.
pub struct FileLogoSource {
    path: PathBuf,
}

impl FileLogoSource {
    /// Source reading `path` on every fetch.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LogoSource for FileLogoSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, LogoFetchError> {
        std::fs::read(&self.path)
            .map_err(|e| LogoFetchError::Network(format!("read '{}': {e}", self.path.display())))
    }
}

/// Process-wide holder of the decoded branding logo.
///
/// Only success is cached. While the slot is empty every [`AssetCache::get_logo`] call performs
/// a fresh fetch, unless a retry cooldown is configured. Concurrent first calls may fetch in
/// parallel; the last completed fetch wins. No lock is held while fetching.
pub struct AssetCache {
    source: Box<dyn LogoSource>,
    slot: RwLock<Option<Arc<Logo>>>,
    retry_cooldown: Option<Duration>,
    last_failure: Mutex<Option<(Instant, LogoFetchError)>>,
    fetch_count: AtomicU64,
}

impl AssetCache {
    /// Empty cache backed by `source`.
    pub fn new(source: impl LogoSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            slot: RwLock::new(None),
            retry_cooldown: None,
            last_failure: Mutex::new(None),
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Suppress fetches for `cooldown` after a failure. `None` retries on every call.
    pub fn with_retry_cooldown(mut self, cooldown: Option<Duration>) -> Self {
        self.retry_cooldown = cooldown;
        self
    }

    /// Return the cached logo, fetching it if the cache is still empty.
    pub fn get_logo(&self) -> Result<Arc<Logo>, LogoFetchError> {
        if let Some(logo) = self.cached() {
            return Ok(logo);
        }
        if let Some(err) = self.cooling_down() {
            tracing::debug!(error = %err, "logo fetch suppressed by retry cooldown");
            return Err(err);
        }

        match self.fetch_and_decode() {
            Ok(logo) => {
                let logo = Arc::new(logo);
                *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(logo.clone());
                *self.last_failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
                tracing::info!(
                    source = %self.source.describe(),
                    width = logo.width(),
                    height = logo.height(),
                    "logo cached"
                );
                Ok(logo)
            }
            Err(err) => {
                tracing::warn!(source = %self.source.describe(), error = %err, "logo fetch failed");
                if self.retry_cooldown.is_some() {
                    *self.last_failure.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some((Instant::now(), err.clone()));
                }
                Err(err)
            }
        }
    }

    /// One fetch attempt followed by decoding. Does not touch the cached slot.
    pub fn fetch_and_decode(&self) -> Result<Logo, LogoFetchError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        let bytes = self.source.fetch()?;
        decode_logo(&bytes)
    }

    /// The cached logo, if a fetch has succeeded.
    pub fn cached(&self) -> Option<Arc<Logo>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of fetch attempts made so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    fn cooling_down(&self) -> Option<LogoFetchError> {
        let cooldown = self.retry_cooldown?;
        let guard = self.last_failure.lock().unwrap_or_else(PoisonError::into_inner);
        let (at, err) = guard.as_ref()?;
        (at.elapsed() < cooldown).then(|| err.clone())
    }
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("source", &self.source.describe())
            .field("cached", &self.cached().is_some())
            .field("retry_cooldown", &self.retry_cooldown)
            .field("fetch_count", &self.fetch_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/cache.rs"]
mod tests;
