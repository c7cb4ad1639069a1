use super::*;
use crate::{encode::matrix::encode, render::blend::over};

fn compositor(border_shrink_px: u32) -> Compositor {
    Compositor::new(
        RenderConfig {
            border_shrink_px,
            caption_defaults_to_payload: false,
        },
        CaptionRenderer::without_fonts(CAPTION_FONT_PX),
    )
}

fn bundled_font_compositor() -> Compositor {
    Compositor::new(
        RenderConfig {
            border_shrink_px: 15,
            caption_defaults_to_payload: false,
        },
        CaptionRenderer::with_bundled_font(CAPTION_FONT_PX),
    )
}

fn decode_raster(img: &RgbaImage) -> Option<String> {
    let luma = image::DynamicImage::ImageRgba8(img.clone()).to_luma8();
    let (w, h) = luma.dimensions();
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
            luma.get_pixel(x as u32, y as u32).0[0]
        });
    prepared
        .detect_grids()
        .first()
        .and_then(|g| g.decode().ok())
        .map(|(_, content)| content)
}

fn solid_logo(w: u32, h: u32, rgba: [u8; 4]) -> Logo {
    Logo::from_rgba(RgbaImage::from_pixel(w, h, Rgba(rgba)))
}

#[test]
fn resized_height_is_floor_of_aspect_ratio() {
    assert_eq!(resized_logo_height(200, 50), 25);
    assert_eq!(resized_logo_height(100, 100), 100);
    assert_eq!(resized_logo_height(3, 7), 233);
    assert_eq!(resized_logo_height(300, 199), 66);
    assert_eq!(resized_logo_height(1000, 1), 1);
}

#[test]
fn logo_offset_floors_odd_remainders() {
    assert_eq!(logo_offset(360, 360, 100, 50), (130, 155));
    assert_eq!(logo_offset(361, 361, 100, 50), (130, 155));
    assert_eq!(logo_offset(100, 100, 100, 233), (0, -67));
}

#[test]
fn zero_shrink_keeps_the_full_two_module_border() {
    let m = encode("hello").unwrap();
    let img = compositor(0).compose(&m, &solid_logo(1, 1, [0, 0, 0, 0]), None);
    assert_eq!(img.dimensions(), (375, 375));
    assert_eq!(img.get_pixel(29, 29).0, [255, 255, 255, 255]);
    assert_eq!(img.get_pixel(30, 30).0, [0, 0, 0, 255]);
}

#[test]
fn inset_crop_clips_half_the_shrink_from_each_side() {
    let m = encode("hello").unwrap();
    let img = compositor(15).compose(&m, &solid_logo(1, 1, [0, 0, 0, 0]), None);
    assert_eq!(img.dimensions(), (360, 360));
    // 30px quiet zone minus 7 clipped pixels.
    assert_eq!(img.get_pixel(22, 22).0, [255, 255, 255, 255]);
    assert_eq!(img.get_pixel(23, 23).0, [0, 0, 0, 255]);
    assert!(img.pixels().all(|p| p.0[3] == 255));
}

#[test]
fn logo_is_centered_at_full_opacity() {
    let m = encode("hello").unwrap();
    let img = compositor(15).compose(&m, &solid_logo(200, 100, [220, 20, 20, 255]), None);

    let red = |x: u32, y: u32| {
        let p = img.get_pixel(x, y).0;
        p[0] > 150 && p[1] < 80 && p[2] < 80
    };
    let (x0, y0) = (130u32, 155u32);
    assert!(red(x0 + 2, y0 + 2));
    assert!(red(x0 + 50, y0 + 25));
    assert!(red(x0 + 97, y0 + 47));
    assert!(!red(x0 - 1, y0 + 25));
    assert!(!red(x0 + 100, y0 + 25));
    assert!(!red(x0 + 50, y0 - 1));
    assert!(!red(x0 + 50, y0 + 50));
}

#[test]
fn transparent_logo_pixels_leave_the_qr_visible() {
    let m = encode("hello").unwrap();
    let c = compositor(15);
    let bare = c.compose(&m, &solid_logo(1, 1, [0, 0, 0, 0]), None);

    let mut rgba = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 255, 255]));
    for y in 0..100 {
        for x in 0..50 {
            rgba.put_pixel(x, y, Rgba([0, 0, 255, 0]));
        }
    }
    let branded = c.compose(&m, &Logo::from_rgba(rgba), None);

    // Left half of the logo box (away from the resampling seam) is untouched QR.
    for y in 130..230 {
        for x in 130..170 {
            assert_eq!(branded.get_pixel(x, y), bare.get_pixel(x, y), "at {x},{y}");
        }
    }
    assert_eq!(branded.get_pixel(215, 180).0, [0, 0, 255, 255]);
}

#[test]
fn empty_caption_draws_no_plate() {
    let m = encode("https://example.com").unwrap();
    let c = compositor(15);
    let logo = solid_logo(10, 10, [0, 128, 0, 255]);
    assert_eq!(c.compose(&m, &logo, None), c.compose(&m, &logo, Some("")));
}

#[test]
fn caption_plate_is_bottom_centered_with_black_outline() {
    let m = encode("hello").unwrap();
    let c = compositor(15);
    let logo = solid_logo(10, 10, [0, 128, 0, 255]);
    let bare = c.compose(&m, &logo, None);
    let img = c.compose(&m, &logo, Some("Scan me"));

    // Estimated box: ceil(7 * 18 * 0.6) x 18, plus 8px padding on each side.
    let (box_w, box_h) = (76 + 16, 18 + 16);
    let x0 = (360 - box_w) / 2;
    let y0 = 360 - box_h - 10;
    let (x1, y1) = (x0 + box_w, y0 + box_h);

    for (x, y) in [(x0, y0), (x0 + 1, y0 + 1), (x1 - 1, y1 - 1), (x0 + 40, y0), (x0, y0 + 17)] {
        assert_eq!(img.get_pixel(x, y).0, [0, 0, 0, 255], "outline at {x},{y}");
    }
    for y in (y0 + 2)..(y1 - 2) {
        for x in (x0 + 2)..(x1 - 2) {
            let want = over(bare.get_pixel(x, y).0, PLATE_FILL, 1.0);
            assert_eq!(img.get_pixel(x, y).0, want, "fill at {x},{y}");
        }
    }
    // Outside the plate nothing changes.
    assert_eq!(img.get_pixel(x0 - 1, y0), bare.get_pixel(x0 - 1, y0));
    assert_eq!(img.get_pixel(x0, y1), bare.get_pixel(x0, y1));
}

#[test]
fn caption_text_is_drawn_inside_the_plate() {
    let m = encode("hello").unwrap();
    let c = bundled_font_compositor();
    let logo = solid_logo(10, 10, [0, 128, 0, 255]);
    let bare = c.compose(&m, &logo, None);
    let img = c.compose(&m, &logo, Some("Scan me"));

    let text = CaptionRenderer::with_bundled_font(CAPTION_FONT_PX).layout("Scan me", 360);
    assert!(text.has_glyphs());
    let pad = CAPTION_PADDING_PX;
    let (box_w, box_h) = (text.width + 2 * pad, text.height + 2 * pad);
    let x0 = (360 - box_w) / 2;
    let y0 = 360 - box_h - CAPTION_BOTTOM_MARGIN_PX;

    // Plate fill alone never goes below 200; anything darker inside the text box is ink.
    let mut ink = 0;
    for y in (y0 + pad)..(y0 + pad + text.height) {
        for x in (x0 + pad)..(x0 + pad + text.width) {
            assert!(over(bare.get_pixel(x, y).0, PLATE_FILL, 1.0)[0] >= PLATE_ALPHA);
            if img.get_pixel(x, y).0[0] < 100 {
                ink += 1;
            }
        }
    }
    assert!(ink > 30, "only {ink} glyph pixels");
}

#[test]
fn different_captions_render_differently() {
    let m = encode("hello").unwrap();
    let c = bundled_font_compositor();
    let logo = solid_logo(10, 10, [0, 128, 0, 255]);
    assert_ne!(
        c.compose(&m, &logo, Some("Scan me")),
        c.compose(&m, &logo, Some("XXXXXXX"))
    );
}

#[test]
fn huge_caption_costs_no_more_than_its_visible_prefix() {
    let m = encode("hello").unwrap();
    let c = bundled_font_compositor();
    let logo = solid_logo(10, 10, [0, 128, 0, 255]);
    let huge = c.compose(&m, &logo, Some(&"W".repeat(20_000)));
    assert_eq!(huge.dimensions(), (360, 360));
    assert_eq!(huge, c.compose(&m, &logo, Some(&"W".repeat(100))));
}

#[test]
fn captioned_code_scans_once_the_symbol_outgrows_version_1() {
    let payload = "https://example.com/products/qr-branding";
    let m = encode(payload).unwrap();
    assert!(m.version() > 1);
    let img = bundled_font_compositor().compose(
        &m,
        &solid_logo(200, 100, [30, 30, 200, 255]),
        Some("Scan me"),
    );
    assert_eq!(decode_raster(&img).as_deref(), Some(payload));
}

#[test]
fn overlong_caption_is_clipped_not_rejected() {
    let m = encode("hello").unwrap();
    let img = compositor(15).compose(
        &m,
        &solid_logo(10, 10, [0, 0, 0, 255]),
        Some(&"very long caption ".repeat(20)),
    );
    assert_eq!(img.dimensions(), (360, 360));
}

#[test]
fn compose_png_is_deterministic() {
    let m = encode("determinism").unwrap();
    let c = compositor(15);
    let logo = solid_logo(64, 48, [10, 200, 30, 180]);
    let a = c.compose_png(&m, &logo, Some("caption")).unwrap();
    let b = c.compose_png(&m, &logo, Some("caption")).unwrap();
    assert_eq!(a, b);

    let decoded = image::load_from_memory(&a).unwrap().to_rgba8();
    assert_eq!(decoded, c.compose(&m, &logo, Some("caption")));
}
