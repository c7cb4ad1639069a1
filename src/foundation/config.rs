use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{QrBrandError, QrBrandResult};

/// Maximum accepted payload length, counted in characters.
pub const MAX_PAYLOAD_CHARS: usize = 2048;

/// Default timeout for fetching the branding logo.
pub const DEFAULT_LOGO_TIMEOUT_MS: u64 = 10_000;

/// Environment variable consulted when no logo URL is configured explicitly.
pub const LOGO_URL_ENV: &str = "LOGO_URL";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Rendering policy shared by every request.
///
/// The two knobs collapse the fixed-border and fractional-border layouts, and the two caption
/// defaulting policies, into one code path.
pub struct RenderConfig {
    /// Pixels removed from each canvas dimension relative to the rendered QR raster. Half of it is
    /// clipped from each side, so `15` turns the 2-module quiet zone into a 1.5-module one.
    pub border_shrink_px: u32,
    /// When no caption is supplied, draw the payload itself as the caption.
    pub caption_defaults_to_payload: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            border_shrink_px: 15,
            caption_defaults_to_payload: false,
        }
    }
}

impl RenderConfig {
    /// Reject shrink values that would clip into the QR modules themselves.
    pub fn validate(&self, module_px: u32, border_modules: u32) -> QrBrandResult<()> {
        let border_px = module_px * border_modules;
        if self.border_shrink_px / 2 > border_px {
            return Err(QrBrandError::config(format!(
                "border_shrink_px {} clips past the {border_px}px quiet zone",
                self.border_shrink_px
            )));
        }
        Ok(())
    }

    /// Resolve the caption for a request from the explicit query value and the payload.
    pub fn resolve_caption<'a>(
        &self,
        payload: &'a str,
        explicit: Option<&'a str>,
    ) -> Option<&'a str> {
        match explicit {
            Some(c) => Some(c),
            None if self.caption_defaults_to_payload => Some(payload),
            None => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Process-level service settings.
pub struct ServiceConfig {
    /// Address the HTTP listener binds to.
    pub addr: SocketAddr,
    /// Source URL of the branding logo.
    pub logo_url: Option<String>,
    /// Timeout applied to each logo fetch.
    pub logo_timeout_ms: u64,
    /// Optional cooldown after a failed logo fetch during which no new fetch is attempted.
    /// `None` retries on every request.
    pub logo_retry_cooldown_ms: Option<u64>,
    /// Number of request worker threads.
    pub workers: usize,
    /// Extra directories scanned for caption fonts, in addition to system fonts.
    pub font_dirs: Vec<PathBuf>,
    /// Rendering policy.
    pub render: RenderConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            logo_url: None,
            logo_timeout_ms: DEFAULT_LOGO_TIMEOUT_MS,
            logo_retry_cooldown_ms: None,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            font_dirs: Vec::new(),
            render: RenderConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn from_path(path: impl AsRef<std::path::Path>) -> QrBrandResult<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path)
            .with_context(|| format!("open config '{}'", path.display()))?;
        let cfg = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| format!("parse config '{}'", path.display()))?;
        Ok(cfg)
    }

    /// Fill `logo_url` from the environment when it was not set explicitly.
    pub fn with_env_fallback(mut self) -> Self {
        if self.logo_url.is_none() {
            self.logo_url = std::env::var(LOGO_URL_ENV).ok().filter(|s| !s.is_empty());
        }
        self
    }

    /// The configured logo URL; absence is a fatal configuration error.
    pub fn require_logo_url(&self) -> QrBrandResult<&str> {
        self.logo_url.as_deref().ok_or_else(|| {
            QrBrandError::config(format!("logo URL missing: pass --logo-url or set {LOGO_URL_ENV}"))
        })
    }

    /// Logo fetch timeout as a [`Duration`].
    pub fn logo_timeout(&self) -> Duration {
        Duration::from_millis(self.logo_timeout_ms)
    }

    /// Retry cooldown as a [`Duration`], if configured.
    pub fn logo_retry_cooldown(&self) -> Option<Duration> {
        self.logo_retry_cooldown_ms.map(Duration::from_millis)
    }

    /// Check cross-field invariants before the service starts.
    pub fn validate(&self, module_px: u32, border_modules: u32) -> QrBrandResult<()> {
        if self.workers == 0 {
            return Err(QrBrandError::config("workers must be at least 1"));
        }
        if self.logo_timeout_ms == 0 {
            return Err(QrBrandError::config("logo_timeout_ms must be positive"));
        }
        self.require_logo_url()?;
        self.render.validate(module_px, border_modules)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
