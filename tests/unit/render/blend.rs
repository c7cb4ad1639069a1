use super::*;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_opaque_dst_stays_opaque() {
    let dst = [0, 0, 0, 255];
    let plate = [200, 200, 200, 200];
    assert_eq!(over(dst, plate, 1.0), [200, 200, 200, 255]);
    assert_eq!(over([255, 255, 255, 255], plate, 1.0), [255, 255, 255, 255]);
}

#[test]
fn over_image_clips_negative_offsets() {
    let mut dst = RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
    let src = RgbaImage::from_pixel(3, 3, image::Rgba([255, 255, 255, 255]));
    over_image_at(&mut dst, &src, -2, -2, 1.0);
    assert_eq!(dst.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(dst.get_pixel(1, 0).0, [0, 0, 0, 255]);
    assert_eq!(dst.get_pixel(0, 1).0, [0, 0, 0, 255]);
}

#[test]
fn copy_image_crops_to_destination() {
    let mut dst = RgbaImage::from_pixel(2, 2, image::Rgba([9, 9, 9, 255]));
    let src = RgbaImage::from_fn(4, 4, |x, y| image::Rgba([x as u8, y as u8, 0, 255]));
    copy_image_at(&mut dst, &src, -1, -1);
    assert_eq!(dst.get_pixel(0, 0).0, [1, 1, 0, 255]);
    assert_eq!(dst.get_pixel(1, 1).0, [2, 2, 0, 255]);
}

#[test]
fn fill_rect_ignores_empty_and_offscreen_rects() {
    let mut dst = RgbaImage::from_pixel(3, 3, image::Rgba([0, 0, 0, 255]));
    fill_rect(&mut dst, 2, 2, 1, 1, [255, 255, 255, 255]);
    fill_rect(&mut dst, 10, 10, 20, 20, [255, 255, 255, 255]);
    assert!(dst.pixels().all(|p| p.0 == [0, 0, 0, 255]));

    fill_rect(&mut dst, -5, 1, 5, 2, [255, 255, 255, 255]);
    assert_eq!(dst.get_pixel(0, 1).0, [255, 255, 255, 255]);
    assert_eq!(dst.get_pixel(2, 1).0, [255, 255, 255, 255]);
    assert_eq!(dst.get_pixel(0, 0).0, [0, 0, 0, 255]);
}
