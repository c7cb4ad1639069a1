use std::sync::Arc;

use percent_encoding::percent_decode_str;

use crate::{
    assets::cache::AssetCache,
    encode::matrix::encode,
    foundation::{
        config::MAX_PAYLOAD_CHARS,
        error::{QrBrandError, QrBrandResult},
    },
    render::compositor::Compositor,
};

/// Transport-neutral HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Type` header.
    pub content_type: &'static str,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    fn png(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "image/png",
            body,
        }
    }

    fn error(status: u16, detail: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: serde_json::json!({ "detail": detail }).to_string().into_bytes(),
        }
    }
}

/// Payload and caption extracted from `/<payload>.png?text=<caption>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Percent-decoded path without the leading `/` and trailing `.png`.
    pub payload: String,
    /// Form-decoded `text` query parameter, if present.
    pub caption: Option<String>,
}

/// Parse a request target. Returns `None` when the path does not end in `.png`.
pub fn parse_route(path_and_query: &str) -> Option<Route> {
    let (path, query) = match path_and_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_and_query, None),
    };
    let encoded = path.strip_prefix('/')?.strip_suffix(".png")?;
    let payload = percent_decode_str(encoded).decode_utf8_lossy().into_owned();
    let caption = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "text")
            .map(|(_, v)| v.into_owned())
    });
    Some(Route { payload, caption })
}

/// Orchestrates logo lookup, encoding and compositing for one request.
#[derive(Debug)]
pub struct RequestHandler {
    cache: Arc<AssetCache>,
    compositor: Compositor,
}

impl RequestHandler {
    /// Handler sharing `cache` with every other handler in the process.
    pub fn new(cache: Arc<AssetCache>, compositor: Compositor) -> Self {
        Self { cache, compositor }
    }

    /// The shared logo cache.
    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    /// Render `payload` as a branded PNG.
    ///
    /// `caption` is the explicit caption, if the caller supplied one; otherwise the configured
    /// default applies. The length and capacity checks both run before the logo is requested.
    pub fn render(&self, payload: &str, caption: Option<&str>) -> QrBrandResult<Vec<u8>> {
        let len = payload.chars().count();
        if len > MAX_PAYLOAD_CHARS {
            tracing::info!(len, max = MAX_PAYLOAD_CHARS, "payload rejected");
            return Err(QrBrandError::payload_too_large(len, MAX_PAYLOAD_CHARS));
        }

        let matrix = encode(payload)?;
        let logo = self
            .cache
            .get_logo()
            .map_err(QrBrandError::LogoUnavailable)?;
        let caption = self.compositor.config().resolve_caption(payload, caption);
        tracing::debug!(version = matrix.version(), caption = ?caption, "composing");
        self.compositor.compose_png(&matrix, &logo, caption)
    }

    /// Route and render one request, translating errors to HTTP responses.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn handle(&self, method: &str, path_and_query: &str) -> Response {
        if !method.eq_ignore_ascii_case("GET") {
            return Response::error(405, "Method Not Allowed");
        }
        let Some(route) = parse_route(path_and_query) else {
            return Response::error(404, "Not Found");
        };

        match self.render(&route.payload, route.caption.as_deref()) {
            Ok(png) => Response::png(png),
            Err(err) => {
                let status = err.status_code();
                if status >= 500 {
                    tracing::error!(error = %err, "request failed");
                } else {
                    tracing::info!(error = %err, "request rejected");
                }
                Response::error(status, err.public_message())
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/serve/handler.rs"]
mod tests;
