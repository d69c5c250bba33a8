use std::f32::consts::PI;

use image::{imageops, GrayImage};

use super::imgutils::{is_img_empty, Mask, BLACK, WHITE};

const BLUR_SIGMA: f32 = 1.4;
const THETA_BINS: usize = 180;

/// A line in polar form: `x*cos(theta) + y*sin(theta) = rho`, with `theta` in
/// `[0, pi)`. A perfectly vertical line has `theta` 0 or close to `pi`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarLine {
    pub rho: f32,
    pub theta: f32,
}

pub fn angle_from_vertical(theta: f32) -> f32 {
    theta.min(PI - theta)
}

struct Gradients {
    width: u32,
    height: u32,
    /// L1 magnitude per pixel, zero along the border
    magnitude: Vec<f32>,
    /// gradient direction quantized to four sectors of 45 degrees
    sector: Vec<u8>,
}

impl Gradients {
    fn at(&self, x: u32, y: u32) -> f32 {
        self.magnitude[(y * self.width + x) as usize]
    }
}

fn sobel(img: &GrayImage) -> Gradients {
    let (width, height) = img.dimensions();
    let mut magnitude = vec![0.0; (width * height) as usize];
    let mut sector = vec![0u8; (width * height) as usize];

    let at = |x: u32, y: u32| img.get_pixel(x, y)[0] as f32;

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2.0 * at(x - 1, y)
                - at(x - 1, y + 1);
            let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2.0 * at(x, y - 1)
                - at(x + 1, y - 1);

            let i = (y * width + x) as usize;
            magnitude[i] = gx.abs() + gy.abs();

            let angle = gy.atan2(gx);
            let eighth = (angle / (PI / 4.0)).round() as i32;
            sector[i] = eighth.rem_euclid(4) as u8;
        }
    }

    Gradients {
        width,
        height,
        magnitude,
        sector,
    }
}

/// Canny edge detection: gaussian blur, sobel gradients, thinning to the
/// local gradient maximum, then hysteresis between the two thresholds.
pub fn canny(img: &GrayImage, low: f32, high: f32) -> Mask {
    let (width, height) = img.dimensions();
    if width < 3 || height < 3 {
        return Mask(GrayImage::from_pixel(width, height, image::Luma([BLACK])));
    }

    let blurred = imageops::blur(img, BLUR_SIGMA);
    let gradients = sobel(&blurred);

    // walk one pixel along and against the gradient; only the ridge survives
    let offsets = |sector: u8| -> ((i64, i64), (i64, i64)) {
        match sector {
            0 => ((-1, 0), (1, 0)),
            1 => ((-1, -1), (1, 1)),
            2 => ((0, -1), (0, 1)),
            _ => ((1, -1), (-1, 1)),
        }
    };

    let mut strong = Vec::new();
    let mut weak = vec![false; (width * height) as usize];
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mag = gradients.at(x, y);
            if mag < low {
                continue;
            }

            let i = (y * width + x) as usize;
            let ((px, py), (nx, ny)) = offsets(gradients.sector[i]);
            let prev = gradients.at((x as i64 + px) as u32, (y as i64 + py) as u32);
            let next = gradients.at((x as i64 + nx) as u32, (y as i64 + ny) as u32);
            if mag > prev && mag >= next {
                weak[i] = true;
                if mag >= high {
                    strong.push((x, y));
                }
            }
        }
    }

    let mut edges = GrayImage::from_pixel(width, height, image::Luma([BLACK]));
    let mut stack = strong;
    for &(x, y) in stack.iter() {
        edges.put_pixel(x, y, image::Luma([WHITE]));
    }
    while let Some((x, y)) = stack.pop() {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 1 || ny < 1 || nx >= (width - 1) as i64 || ny >= (height - 1) as i64
                {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                if weak[(ny * width + nx) as usize] && edges.get_pixel(nx, ny)[0] == BLACK
                {
                    edges.put_pixel(nx, ny, image::Luma([WHITE]));
                    stack.push((nx, ny));
                }
            }
        }
    }

    Mask(edges)
}

/// Straight lines in an edge mask, one degree of angular resolution and one
/// pixel of distance resolution. Returned lines are local maxima of the vote
/// accumulator with strictly more than `votes` supporting edge pixels.
pub fn hough_lines(edges: &Mask, votes: u32) -> Vec<PolarLine> {
    let edges = &edges.0;
    if is_img_empty(edges) {
        return vec![];
    }

    let (width, height) = edges.dimensions();
    let diagonal = ((width as f32).hypot(height as f32)).ceil() as i64;
    let rho_bins = (2 * diagonal + 1) as usize;

    let (sines, cosines): (Vec<f32>, Vec<f32>) = (0..THETA_BINS)
        .map(|t| (t as f32 * PI / THETA_BINS as f32).sin_cos())
        .unzip();

    let mut accumulator = vec![0u32; THETA_BINS * rho_bins];
    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel[0] != WHITE {
            continue;
        }
        for t in 0..THETA_BINS {
            let rho = x as f32 * cosines[t] + y as f32 * sines[t];
            let bin = (rho.round() as i64 + diagonal) as usize;
            accumulator[t * rho_bins + bin] += 1;
        }
    }

    let mut lines = Vec::new();
    for t in 0..THETA_BINS {
        for r in 0..rho_bins {
            let count = accumulator[t * rho_bins + r];
            if count <= votes {
                continue;
            }

            // a peak must beat earlier neighbours and at least tie later ones
            let mut is_peak = true;
            'neighbours: for dt in -1i64..=1 {
                for dr in -1i64..=1 {
                    if dt == 0 && dr == 0 {
                        continue;
                    }
                    let nt = t as i64 + dt;
                    let nr = r as i64 + dr;
                    if nt < 0 || nr < 0 || nt >= THETA_BINS as i64 || nr >= rho_bins as i64
                    {
                        continue;
                    }
                    let neighbour = accumulator[nt as usize * rho_bins + nr as usize];
                    let earlier = (nt, nr) < (t as i64, r as i64);
                    if neighbour > count || (earlier && neighbour == count) {
                        is_peak = false;
                        break 'neighbours;
                    }
                }
            }

            if is_peak {
                lines.push(PolarLine {
                    rho: (r as i64 - diagonal) as f32,
                    theta: t as f32 * PI / THETA_BINS as f32,
                });
            }
        }
    }

    lines
}
