use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use image::RgbaImage;

/// DejaVu Sans, loaded into every font database so captions always have a face to shape with.
const BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/dejavu/DejaVuSans.ttf");

/// Width of one character, in em, assumed when no font face can shape the caption.
const FALLBACK_ADVANCE_EM: f32 = 0.6;

/// Narrowest advance, in em, assumed when cutting a caption down to what a canvas can show.
const MIN_ADVANCE_EM: f32 = 0.25;

/// Shapes and rasterizes caption text through usvg/resvg.
///
/// The font database is built once and shared read-only across requests.
#[derive(Clone)]
pub struct CaptionRenderer {
    fontdb: Arc<usvg::fontdb::Database>,
    bundled_face: Option<usvg::fontdb::ID>,
    font_px: f32,
}

/// Measured caption: the ink box size plus the shaped tree used to draw it.
pub struct CaptionBox {
    /// Ink box width in pixels.
    pub width: u32,
    /// Ink box height in pixels.
    pub height: u32,
    shaped: Option<(usvg::Tree, f32, f32)>,
}

impl CaptionBox {
    /// Whether glyphs were shaped. `false` means the size is an estimate and nothing is drawn.
    pub fn has_glyphs(&self) -> bool {
        self.shaped.is_some()
    }
}

impl std::fmt::Debug for CaptionBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionBox")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_glyphs", &self.has_glyphs())
            .finish()
    }
}

impl CaptionRenderer {
    /// Renderer backed by system fonts, any `.ttf`/`.otf`/`.ttc` files in `font_dirs`, and the
    /// bundled face as last resort.
    pub fn new(font_dirs: &[PathBuf], font_px: f32) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        for dir in font_dirs {
            load_fonts_from_dir(&mut db, dir);
        }
        let bundled_face = load_bundled_font(&mut db);
        tracing::debug!(faces = db.len(), "caption font database ready");
        Self {
            fontdb: Arc::new(db),
            bundled_face,
            font_px,
        }
    }

    /// Renderer that only knows the bundled face. Output does not depend on the host's fonts.
    pub fn with_bundled_font(font_px: f32) -> Self {
        let mut db = usvg::fontdb::Database::new();
        let bundled_face = load_bundled_font(&mut db);
        Self {
            fontdb: Arc::new(db),
            bundled_face,
            font_px,
        }
    }

    /// Renderer with an empty font database. Captions get estimated boxes and no glyphs.
    pub fn without_fonts(font_px: f32) -> Self {
        Self {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
            bundled_face: None,
            font_px,
        }
    }

    /// Number of loaded font faces.
    pub fn face_count(&self) -> usize {
        self.fontdb.len()
    }

    /// Font size in pixels.
    pub fn font_px(&self) -> f32 {
        self.font_px
    }

    /// Measure `text`, shaping it when a font face is available.
    ///
    /// Only the leading characters that could still be visible within `max_width_px` are kept,
    /// so the cost of a caption is bounded by the canvas rather than by the input.
    pub fn layout(&self, text: &str, max_width_px: u32) -> CaptionBox {
        let text = self.visible_prefix(text, max_width_px);
        match self.shape(text) {
            Some((tree, x, y, w, h)) => CaptionBox {
                width: w,
                height: h,
                shaped: Some((tree, x, y)),
            },
            None => {
                let chars = text.chars().count() as f32;
                CaptionBox {
                    width: (chars * self.font_px * FALLBACK_ADVANCE_EM).ceil() as u32,
                    height: self.font_px.ceil() as u32,
                    shaped: None,
                }
            }
        }
    }

    /// Rasterize a shaped caption to premultiplied RGBA sized exactly to its ink box.
    pub fn rasterize(&self, caption: &CaptionBox) -> Option<RgbaImage> {
        let (tree, x, y) = caption.shaped.as_ref()?;
        let mut pixmap = resvg::tiny_skia::Pixmap::new(caption.width, caption.height)?;
        let xform = resvg::tiny_skia::Transform::from_translate(-x, -y);
        resvg::render(tree, xform, &mut pixmap.as_mut());
        RgbaImage::from_raw(caption.width, caption.height, pixmap.data().to_vec())
    }

    fn visible_prefix<'a>(&self, text: &'a str, max_width_px: u32) -> &'a str {
        let min_advance = self.font_px.max(1.0) * MIN_ADVANCE_EM;
        let max_chars = ((max_width_px as f32 / min_advance).ceil() as usize).saturating_add(1);
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => {
                tracing::debug!(max_chars, "caption cut to visible prefix");
                &text[..cut]
            }
            None => text,
        }
    }

    fn shape(&self, text: &str) -> Option<(usvg::Tree, f32, f32, u32, u32)> {
        if self.fontdb.is_empty() || text.trim().is_empty() {
            return None;
        }
        let px = self.font_px;
        let svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
                r#"<text x="0" y="{px}" font-family="sans-serif" font-size="{px}" "#,
                r##"fill="#000000">"##,
                "{body}</text></svg>",
            ),
            w = (text.chars().count().max(1) as f32 * px * 2.0).ceil(),
            h = (px * 2.0).ceil(),
            px = px,
            body = xml_escape(text),
        );
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            font_resolver: make_font_resolver(self.bundled_face),
            ..Default::default()
        };
        let tree = match usvg::Tree::from_str(&svg, &opts) {
            Ok(tree) => tree,
            Err(err) => {
                tracing::debug!(error = %err, "caption svg rejected");
                return None;
            }
        };

        let bbox = first_text_bbox(tree.root())?;
        let (w, h) = (bbox.width().ceil(), bbox.height().ceil());
        if !(w.is_finite() && h.is_finite()) || w < 1.0 || h < 1.0 {
            return None;
        }
        let (x, y) = (bbox.x().floor(), bbox.y().floor());
        Some((tree, x, y, w as u32 + 1, h as u32 + 1))
    }
}

impl std::fmt::Debug for CaptionRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionRenderer")
            .field("faces", &self.fontdb.len())
            .field("bundled_face", &self.bundled_face.is_some())
            .field("font_px", &self.font_px)
            .finish()
    }
}

fn first_text_bbox(group: &usvg::Group) -> Option<usvg::Rect> {
    for child in group.children() {
        match child {
            usvg::Node::Group(g) => {
                if let Some(b) = first_text_bbox(g) {
                    return Some(b);
                }
            }
            usvg::Node::Text(t) => return Some(t.flattened().abs_bounding_box()),
            usvg::Node::Path(_) | usvg::Node::Image(_) => {}
        }
    }
    None
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "font directory not readable");
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(err) = db.load_font_file(&path) {
            tracing::warn!(path = %path.display(), error = %err, "skipping font file");
        }
    }
}

fn load_bundled_font(db: &mut usvg::fontdb::Database) -> Option<usvg::fontdb::ID> {
    let ids = db.load_font_source(usvg::fontdb::Source::Binary(Arc::new(BUNDLED_FONT)));
    let id = ids.first().copied();
    if id.is_none() {
        tracing::warn!("bundled caption font did not load");
    }
    id
}

/// Resolve the requested families, then generic fallbacks, then the bundled face, then any face
/// at all.
fn make_font_resolver(bundled_face: Option<usvg::fontdb::ID>) -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(move |font, fontdb| {
            let mut families = Vec::<usvg::fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => usvg::fontdb::Family::Name(s),
                });
            }
            families.push(usvg::fontdb::Family::SansSerif);
            families.push(usvg::fontdb::Family::Serif);

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch: usvg::fontdb::Stretch::Normal,
                style: usvg::fontdb::Style::Normal,
            };

            fontdb
                .query(&query)
                .or(bundled_face)
                .or_else(|| fontdb.faces().next().map(|f| f.id))
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/caption.rs"]
mod tests;
