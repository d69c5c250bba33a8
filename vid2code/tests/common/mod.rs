// NOTE: every test will complain about the functions it doesn't use
#![allow(unused)]

use std::path::Path;

use image::{GrayImage, Rgb, RgbImage};

/// Deterministic high frequency texture; every patch is unique, so feature
/// descriptors match their own frame unambiguously.
pub fn noise_frame(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let mut v = x.wrapping_mul(0x9E37_79B1)
            ^ y.wrapping_mul(0x85EB_CA6B)
            ^ seed.wrapping_mul(0xC2B2_AE35);
        v ^= v >> 13;
        v = v.wrapping_mul(0x2545_F491);
        image::Luma([(v >> 16) as u8])
    })
}

/// A frame the rule based classifier accepts: bright glyph-sized blocks on a
/// dark background, textured so no two patches of the frame look alike.
pub fn code_frame() -> RgbImage {
    let texture = |x: u32, y: u32| -> u8 {
        let mut v = x.wrapping_mul(0x9E37_79B1) ^ y.wrapping_mul(0x85EB_CA6B);
        v ^= v >> 13;
        v = v.wrapping_mul(0x2545_F491);
        130 + ((v >> 16) % 100) as u8
    };

    let mut img = RgbImage::from_pixel(200, 200, Rgb([0, 0, 0]));
    for row in 0..6 {
        for col in 0..8 {
            let (x0, y0) = (10 + col * 22, 15 + row * 28);
            for y in y0..y0 + 10 {
                for x in x0..x0 + 10 {
                    let bright = texture(x, y);
                    img.put_pixel(x, y, Rgb([bright, bright, bright]));
                }
            }
        }
    }
    img
}

/// A frame no detector fires on.
pub fn title_card() -> RgbImage {
    RgbImage::from_pixel(200, 200, Rgb([245, 245, 245]))
}

pub fn write_gray(dir: &Path, name: &str, img: &GrayImage) {
    img.save(dir.join(name)).expect("could not write frame");
}

pub fn write_rgb(dir: &Path, name: &str, img: &RgbImage) {
    img.save(dir.join(name)).expect("could not write frame");
}

/// The file names in `dir`, unsorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("could not list dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}
