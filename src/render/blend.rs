use image::RgbaImage;

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over with an extra opacity factor in `0.0..=1.0`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Composite a premultiplied `src` image onto `dst` with its top-left corner at `(x, y)`.
///
/// Offsets may be negative; anything falling outside `dst` is clipped.
pub(crate) fn over_image_at(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64, opacity: f32) {
    for_each_overlap(dst, src.width(), src.height(), x, y, |d, sx, sy| {
        let s = src.get_pixel(sx, sy).0;
        d.0 = over(d.0, s, opacity);
    });
}

/// Overwrite `dst` with `src` at `(x, y)`, clipping to `dst`.
pub(crate) fn copy_image_at(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    for_each_overlap(dst, src.width(), src.height(), x, y, |d, sx, sy| {
        *d = *src.get_pixel(sx, sy);
    });
}

/// Blend a solid premultiplied color over the rectangle `[x0, x1) x [y0, y1)`, clipped.
pub(crate) fn fill_rect(
    dst: &mut RgbaImage,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    color: PremulRgba8,
) {
    let w = (x1 - x0).max(0) as u32;
    let h = (y1 - y0).max(0) as u32;
    for_each_overlap(dst, w, h, x0, y0, |d, _, _| {
        d.0 = over(d.0, color, 1.0);
    });
}

fn for_each_overlap(
    dst: &mut RgbaImage,
    src_w: u32,
    src_h: u32,
    x: i64,
    y: i64,
    mut f: impl FnMut(&mut image::Rgba<u8>, u32, u32),
) {
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + i64::from(src_w)).min(dw);
    let y1 = (y + i64::from(src_h)).min(dh);
    for dy in y0..y1 {
        for dx in x0..x1 {
            let px = dst.get_pixel_mut(dx as u32, dy as u32);
            f(px, (dx - x) as u32, (dy - y) as u32);
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
