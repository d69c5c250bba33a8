use image::{GenericImageView, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

pub use image::imageops::colorops::grayscale;

pub const WHITE: u8 = u8::MAX;
pub const BLACK: u8 = u8::MIN;

/// A binary image where every pixel is either `WHITE` or `BLACK`.
pub struct Mask(pub GrayImage);

pub fn filled(width: u32, height: u32, red: u8, green: u8, blue: u8) -> RgbImage {
    let mut buf = ImageBuffer::new(width, height);
    buf.pixels_mut()
        .for_each(|pixel| *pixel = image::Rgb([red, green, blue]));
    buf
}

pub fn filled_gray(width: u32, height: u32, bright: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([bright]))
}

pub fn construct_gray(raw: &[&[u8]]) -> GrayImage {
    assert!(raw.windows(2).all(|w| w[0].len() == w[1].len()));
    let height = raw.len() as u32;
    let width = raw.first().map(|row| row.len()).unwrap_or(0) as u32;
    GrayImage::from_fn(width, height, |x, y| {
        image::Luma([raw[y as usize][x as usize]])
    })
}

pub fn is_img_empty<T>(img: &T) -> bool
where
    T: GenericImageView,
{
    img.width() == 0 || img.height() == 0
}

pub fn mean_brightness(img: &GrayImage) -> f64 {
    if is_img_empty(img) {
        return 0.0;
    }

    let sum: u64 = img.pixels().map(|p| p[0] as u64).sum();
    sum as f64 / (img.width() as u64 * img.height() as u64) as f64
}

/// Finds the threshold that best separates the gray levels into a dark and a
/// bright class, by maximizing the between-class variance.
// https://en.wikipedia.org/wiki/Otsu's_method
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut histogram = [0u32; 256];
    img.pixels().for_each(|p| histogram[p[0] as usize] += 1);

    let total: f64 = (img.width() as u64 * img.height() as u64) as f64;
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut sum_dark = 0.0;
    let mut weight_dark = 0.0;
    let mut best_level = 0u8;
    let mut best_separation = -1.0;

    for (level, &count) in histogram.iter().enumerate() {
        weight_dark += count as f64;
        if weight_dark == 0.0 {
            continue;
        }
        let weight_bright = total - weight_dark;
        if weight_bright == 0.0 {
            break;
        }

        sum_dark += level as f64 * count as f64;
        let mean_dark = sum_dark / weight_dark;
        let mean_bright = (sum_all - sum_dark) / weight_bright;
        let separation =
            weight_dark * weight_bright * (mean_dark - mean_bright).powi(2);

        if separation > best_separation {
            best_separation = separation;
            best_level = level as u8;
        }
    }

    best_level
}

/// Everything brighter than `level` becomes `WHITE` foreground.
pub fn threshold(img: &GrayImage, level: u8) -> Mask {
    let mut img = img.clone();
    img.pixels_mut().for_each(|p| {
        p[0] = if p[0] > level { WHITE } else { BLACK };
    });
    Mask(img)
}

/// One 8-connected region of `WHITE` pixels in a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub area: u32,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

pub fn foreground_regions(mask: &Mask) -> Vec<Region> {
    let mask = &mask.0;
    let (width, height) = mask.dimensions();
    let mut visited = vec![false; (width * height) as usize];
    let index = |x: u32, y: u32| (y * width + x) as usize;
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for start_y in 0..height {
        for start_x in 0..width {
            if visited[index(start_x, start_y)]
                || mask.get_pixel(start_x, start_y)[0] != WHITE
            {
                continue;
            }

            let (mut min_x, mut max_x) = (start_x, start_x);
            let (mut min_y, mut max_y) = (start_y, start_y);
            let mut area = 0u32;

            visited[index(start_x, start_y)] = true;
            stack.push((start_x, start_y));
            while let Some((x, y)) = stack.pop() {
                area += 1;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64
                        {
                            continue;
                        }
                        let (nx, ny) = (nx as u32, ny as u32);
                        if !visited[index(nx, ny)] && mask.get_pixel(nx, ny)[0] == WHITE
                        {
                            visited[index(nx, ny)] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            regions.push(Region {
                area,
                left: min_x,
                top: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            });
        }
    }

    regions
}

/// Converts to HSV with hue halved into 0..=179 so a full byte is enough,
/// the same scale most editor theme tables are written in.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> [u8; 3] {
    let r = pixel[0] as f64 / 255.0;
    let g = pixel[1] as f64 / 255.0;
    let b = pixel[2] as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let hue = if hue < 0.0 { hue + 360.0 } else { hue };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    [
        (hue / 2.0).round().min(179.0) as u8,
        (saturation * 255.0).round() as u8,
        (max * 255.0).round() as u8,
    ]
}

/// Per row, how many pixels are darker than `cutoff`.
pub fn dark_row_profile<I>(img: &I, cutoff: u8) -> Vec<u32>
where
    I: GenericImageView<Pixel = Luma<u8>>,
{
    let mut profile = vec![0u32; img.height() as usize];
    img.pixels().for_each(|(_, y, luma)| {
        if luma[0] < cutoff {
            profile[y as usize] += 1;
        }
    });
    profile
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn brightness_of_flat_images() {
        assert_eq!(0.0, mean_brightness(&filled_gray(10, 10, 0)));
        assert_eq!(255.0, mean_brightness(&filled_gray(10, 10, 255)));
        assert_eq!(0.0, mean_brightness(&construct_gray(&[])));
    }

    #[test]
    fn otsu_separates_two_classes() {
        let img = construct_gray(&[
            &[10, 10, 10, 200, 200, 200],
            &[10, 10, 10, 200, 200, 200],
        ]);
        let level = otsu_level(&img);
        assert!((10..200).contains(&level), "level was {level}");

        let mask = threshold(&img, level);
        let whites = mask.0.pixels().filter(|p| p[0] == WHITE).count();
        assert_eq!(6, whites);
    }

    #[test]
    fn regions_are_counted_with_bounds() {
        let mask = threshold(
            &construct_gray(&[
                &[0, 255, 255, 0, 0],
                &[0, 255, 255, 0, 0],
                &[0, 0, 0, 0, 255],
            ]),
            128,
        );
        let mut regions = foreground_regions(&mask);
        regions.sort_by_key(|r| r.area);

        assert_eq!(2, regions.len());
        assert_eq!(
            Region {
                area: 1,
                left: 4,
                top: 2,
                width: 1,
                height: 1
            },
            regions[0]
        );
        assert_eq!(
            Region {
                area: 4,
                left: 1,
                top: 0,
                width: 2,
                height: 2
            },
            regions[1]
        );
    }

    #[test]
    fn diagonal_pixels_connect() {
        let mask = threshold(
            &construct_gray(&[&[255, 0, 0], &[0, 255, 0], &[0, 0, 255]]),
            128,
        );
        assert_eq!(1, foreground_regions(&mask).len());
    }

    #[test]
    fn hue_of_primary_colors() {
        assert_eq!(0, rgb_to_hsv(Rgb([255, 0, 0]))[0]);
        assert_eq!(60, rgb_to_hsv(Rgb([0, 255, 0]))[0]);
        assert_eq!(120, rgb_to_hsv(Rgb([0, 0, 255]))[0]);

        let gray = rgb_to_hsv(Rgb([77, 77, 77]));
        assert_eq!(0, gray[1], "gray has no saturation");
        assert_eq!(77, gray[2]);
    }

    #[test]
    fn row_profile_counts_dark_pixels() {
        let img = construct_gray(&[
            &[255, 255, 255],
            &[0, 0, 255],
            &[0, 0, 0],
        ]);
        assert_eq!(vec![0, 2, 3], dark_row_profile(&img, 128));
    }
}
