use std::io::Cursor;

use anyhow::Context;
use image::{Rgba, RgbaImage, imageops::FilterType};

use crate::{
    assets::decode::Logo,
    encode::matrix::{QrMatrix, render_matrix},
    foundation::{config::RenderConfig, error::QrBrandResult},
    render::{
        blend::{PremulRgba8, copy_image_at, fill_rect, over_image_at},
        caption::CaptionRenderer,
    },
};

/// Pixels per QR module.
pub const MODULE_PX: u32 = 15;
/// Quiet-zone width, in modules, of the rendered QR raster before inset-cropping.
pub const BORDER_MODULES: u32 = 2;
/// Width every logo is resized to.
pub const LOGO_TARGET_WIDTH_PX: u32 = 100;
/// Caption font size.
pub const CAPTION_FONT_PX: f32 = 18.0;
/// Padding between caption text and plate edge, on every side.
pub const CAPTION_PADDING_PX: u32 = 8;
/// Gap between the plate's bottom edge and the canvas bottom.
pub const CAPTION_BOTTOM_MARGIN_PX: u32 = 10;
/// Alpha of the plate's white fill.
pub const PLATE_ALPHA: u8 = 200;
/// Width of the plate's black outline.
pub const PLATE_BORDER_PX: u32 = 2;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: PremulRgba8 = [0, 0, 0, 255];
const PLATE_FILL: PremulRgba8 = [PLATE_ALPHA, PLATE_ALPHA, PLATE_ALPHA, PLATE_ALPHA];

/// Flattens a QR matrix, the branding logo and an optional caption into one raster.
///
/// Pure with respect to its inputs: all working buffers are allocated per call.
#[derive(Clone, Debug)]
pub struct Compositor {
    config: RenderConfig,
    captions: CaptionRenderer,
}

impl Compositor {
    /// Compositor applying `config`, drawing captions with `captions`.
    pub fn new(config: RenderConfig, captions: CaptionRenderer) -> Self {
        Self { config, captions }
    }

    /// Active rendering policy.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Build the final canvas. Empty captions draw no plate.
    pub fn compose(&self, matrix: &QrMatrix, logo: &Logo, caption: Option<&str>) -> RgbaImage {
        let mut canvas = self.inset_canvas(matrix);

        let resized = resize_logo(logo);
        let (x, y) = logo_offset(
            canvas.width(),
            canvas.height(),
            resized.width(),
            resized.height(),
        );
        over_image_at(&mut canvas, &resized, x, y, 1.0);

        if let Some(text) = caption.filter(|c| !c.is_empty()) {
            self.draw_caption(&mut canvas, text);
        }
        canvas
    }

    /// Compose and encode as PNG.
    pub fn compose_png(
        &self,
        matrix: &QrMatrix,
        logo: &Logo,
        caption: Option<&str>,
    ) -> QrBrandResult<Vec<u8>> {
        encode_png(&self.compose(matrix, logo, caption))
    }

    /// Render the matrix and clip `border_shrink_px / 2` pixels of quiet zone from each side.
    fn inset_canvas(&self, matrix: &QrMatrix) -> RgbaImage {
        let qr = render_matrix(matrix, MODULE_PX, BORDER_MODULES);
        let shrink = self.config.border_shrink_px.min(qr.width().saturating_sub(1));
        if shrink == 0 {
            return qr;
        }
        let mut canvas = RgbaImage::from_pixel(qr.width() - shrink, qr.height() - shrink, WHITE);
        let offset = -i64::from(shrink / 2);
        copy_image_at(&mut canvas, &qr, offset, offset);
        canvas
    }

    fn draw_caption(&self, canvas: &mut RgbaImage, text: &str) {
        let measured = self.captions.layout(text, canvas.width());
        let pad = i64::from(CAPTION_PADDING_PX);
        let box_w = i64::from(measured.width) + 2 * pad;
        let box_h = i64::from(measured.height) + 2 * pad;

        let x0 = (i64::from(canvas.width()) - box_w).div_euclid(2);
        let y0 = i64::from(canvas.height()) - box_h - i64::from(CAPTION_BOTTOM_MARGIN_PX);
        let (x1, y1) = (x0 + box_w, y0 + box_h);
        tracing::debug!(x0, y0, box_w, box_h, glyphs = measured.has_glyphs(), "caption plate");

        fill_rect(canvas, x0, y0, x1, y1, PLATE_FILL);

        let b = i64::from(PLATE_BORDER_PX);
        fill_rect(canvas, x0, y0, x1, y0 + b, BLACK);
        fill_rect(canvas, x0, y1 - b, x1, y1, BLACK);
        fill_rect(canvas, x0, y0 + b, x0 + b, y1 - b, BLACK);
        fill_rect(canvas, x1 - b, y0 + b, x1, y1 - b, BLACK);

        if let Some(glyphs) = self.captions.rasterize(&measured) {
            over_image_at(canvas, &glyphs, x0 + pad, y0 + pad, 1.0);
        }
    }
}

/// Height of a logo resized to [`LOGO_TARGET_WIDTH_PX`]: `floor(h * 100 / w)`, at least 1.
pub fn resized_logo_height(src_w: u32, src_h: u32) -> u32 {
    let h = u64::from(src_h) * u64::from(LOGO_TARGET_WIDTH_PX) / u64::from(src_w.max(1));
    (h.max(1)).min(u64::from(u32::MAX)) as u32
}

/// Top-left position centering a `logo_w x logo_h` box on the canvas, with floor division.
pub fn logo_offset(canvas_w: u32, canvas_h: u32, logo_w: u32, logo_h: u32) -> (i64, i64) {
    (
        (i64::from(canvas_w) - i64::from(logo_w)).div_euclid(2),
        (i64::from(canvas_h) - i64::from(logo_h)).div_euclid(2),
    )
}

/// Lanczos3 resize of the premultiplied logo. Ringing is clamped so color never exceeds alpha.
fn resize_logo(logo: &Logo) -> RgbaImage {
    let h = resized_logo_height(logo.width(), logo.height());
    let mut out =
        image::imageops::resize(logo.premul(), LOGO_TARGET_WIDTH_PX, h, FilterType::Lanczos3);
    for px in out.pixels_mut() {
        let a = px.0[3];
        for c in &mut px.0[..3] {
            *c = (*c).min(a);
        }
    }
    out
}

/// Serialize a canvas as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> QrBrandResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
