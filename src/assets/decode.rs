use image::RgbaImage;

/// Why a logo could not be obtained. The variants stay distinct so callers can act on the cause.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LogoFetchError {
    /// The transport failed before a response body was read.
    #[error("network error: {0}")]
    Network(String),

    /// The source answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(u16),

    /// The bytes were fetched but are not a decodable image.
    #[error("decode error: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Decoded branding logo in premultiplied RGBA8.
pub struct Logo {
    pixels: RgbaImage,
}

impl Logo {
    /// Wrap straight-alpha RGBA pixels, premultiplying them.
    pub fn from_rgba(mut rgba: RgbaImage) -> Self {
        premultiply_rgba8_in_place(&mut rgba);
        Self { pixels: rgba }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Premultiplied pixels, row-major.
    pub fn premul(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Decode PNG/JPEG/... bytes into a [`Logo`].
pub fn decode_logo(bytes: &[u8]) -> Result<Logo, LogoFetchError> {
    let dyn_img =
        image::load_from_memory(bytes).map_err(|e| LogoFetchError::Decode(e.to_string()))?;
    Ok(Logo::from_rgba(dyn_img.to_rgba8()))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
