use image::{Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode, types::QrError};

const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Errors raised while building a QR symbol.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The payload exceeds the capacity of a version-40 symbol at level H.
    #[error("data too long for a QR symbol at error-correction level H")]
    DataTooLong,

    /// Any other encoder rejection.
    #[error("qr encoder rejected input: {0}")]
    Rejected(String),
}

impl From<QrError> for EncodeError {
    fn from(err: QrError) -> Self {
        match err {
            QrError::DataTooLong => Self::DataTooLong,
            other => Self::Rejected(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Square grid of QR modules. Immutable once encoded.
pub struct QrMatrix {
    version: i16,
    width: usize,
    /// Row-major, `true` = dark.
    modules: Vec<bool>,
}

impl QrMatrix {
    /// Symbol version (1..=40).
    pub fn version(&self) -> i16 {
        self.version
    }

    /// Modules per side, excluding the quiet zone.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Module at `(x, y)`. Coordinates outside the symbol are light (quiet zone).
    pub fn is_dark(&self, x: i64, y: i64) -> bool {
        let w = self.width as i64;
        if x < 0 || y < 0 || x >= w || y >= w {
            return false;
        }
        self.modules[(y * w + x) as usize]
    }
}

/// Encode `text` at error-correction level H.
///
/// The version search starts at 1 and grows to the smallest symbol that holds the data.
/// Non-ASCII text is encoded as UTF-8 bytes.
#[tracing::instrument(level = "debug", skip(text), fields(len = text.len()))]
pub fn encode(text: &str) -> Result<QrMatrix, EncodeError> {
    let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::H)?;
    let width = code.width();
    let modules = code
        .to_colors()
        .into_iter()
        .map(|c| c == Color::Dark)
        .collect();
    Ok(QrMatrix {
        version: ((width.saturating_sub(17)) / 4) as i16,
        width,
        modules,
    })
}

/// Rasterize a matrix to an opaque black/white RGBA image.
///
/// The output is `(width + 2 * border_modules) * module_px` pixels per side.
pub fn render_matrix(matrix: &QrMatrix, module_px: u32, border_modules: u32) -> RgbaImage {
    let module_px = module_px.max(1);
    let side = (matrix.width() as u32 + 2 * border_modules) * module_px;
    let border = i64::from(border_modules);
    RgbaImage::from_fn(side, side, |x, y| {
        let mx = i64::from(x / module_px) - border;
        let my = i64::from(y / module_px) - border;
        if matrix.is_dark(mx, my) { DARK } else { LIGHT }
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/matrix.rs"]
mod tests;
