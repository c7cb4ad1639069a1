//! qrbrand renders branded QR codes: a QR symbol with a centered logo and an optional caption
//! plate, served as PNG over HTTP.
//!
//! # Pipeline overview
//!
//! 1. **Encode**: `text -> QrMatrix` at error-correction level H, smallest fitting version.
//! 2. **Rasterize**: `QrMatrix -> RgbaImage` at 15 px per module with a 2-module quiet zone.
//! 3. **Compose**: inset-crop the raster, paste the resized logo, draw the caption plate.
//! 4. **Serve**: encode the canvas as PNG and hand the bytes to the HTTP layer.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: identical payload, logo and caption give byte-identical PNGs.
//! - **One stateful component**: [`AssetCache`] owns the branding logo. Everything else allocates
//!   its working state per call.
//! - **Premultiplied blending**: overlays are composited with premultiplied source-over.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod assets;
mod encode;
mod foundation;
mod render;
mod serve;

pub use assets::cache::{AssetCache, FileLogoSource, HttpLogoSource, LogoSource};
pub use assets::decode::{Logo, LogoFetchError, decode_logo};
pub use encode::matrix::{EncodeError, QrMatrix, encode, render_matrix};
pub use foundation::config::{
    DEFAULT_LOGO_TIMEOUT_MS, MAX_PAYLOAD_CHARS, RenderConfig, ServiceConfig,
};
pub use foundation::error::{QrBrandError, QrBrandResult};
pub use render::blend::{PremulRgba8, over};
pub use render::caption::{CaptionBox, CaptionRenderer};
pub use render::compositor::{
    BORDER_MODULES, CAPTION_BOTTOM_MARGIN_PX, CAPTION_FONT_PX, CAPTION_PADDING_PX,
    LOGO_TARGET_WIDTH_PX, MODULE_PX, PLATE_ALPHA, PLATE_BORDER_PX, Compositor, encode_png,
    logo_offset, resized_logo_height,
};
pub use serve::handler::{RequestHandler, Response, Route, parse_route};
pub use serve::server::{Listener, serve};
