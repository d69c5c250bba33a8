use image::{imageops, GrayImage};
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Fixed seed so every engine samples the same descriptor pattern; two
/// engines must produce comparable descriptors.
const PATTERN_SEED: u64 = 0x76696432636f6465;
const DESCRIPTOR_PAIRS: usize = 256;
const PATCH_RADIUS: i32 = 8;
const DESCRIBE_SIGMA: f32 = 2.0;

/// Bresenham circle of radius 3 around a corner candidate.
const RING: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];
const RING_RADIUS: i32 = 3;
const ARC_LENGTH: u32 = 9;

pub const DEFAULT_CORNER_THRESHOLD: u8 = 20;
pub const DEFAULT_MAX_KEYPOINTS: usize = 400;
pub const DEFAULT_OCTAVES: u32 = 3;

/// A 256 bit fingerprint of the image patch around one keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor([u64; 4]);

impl Descriptor {
    pub(crate) fn from_words(words: [u64; 4]) -> Self {
        Self(words)
    }

    pub fn distance_to(self, other: Self) -> u32 {
        self.0
            .iter()
            .zip(other.0)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct Keypoint {
    x: u32,
    y: u32,
    score: u32,
}

/// Extracts keypoint descriptors from grayscale frames. Corners come from a
/// segment test on a small pyramid of the image, so slow zooms still match,
/// and each corner is described by brightness comparisons at a fixed sampled
/// point pattern.
///
/// Construct one per reduction run and pass it to the duplicate filter; the
/// engine holds no per-frame state.
pub struct FeatureEngine {
    pattern: Vec<((i32, i32), (i32, i32))>,
    corner_threshold: u8,
    max_keypoints: usize,
    octaves: u32,
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEngine {
    pub fn new() -> Self {
        let mut rng = SmallRng::seed_from_u64(PATTERN_SEED);
        let mut coord = move || {
            (
                rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
            )
        };
        let pattern = (0..DESCRIPTOR_PAIRS)
            .map(|_| (coord(), coord()))
            .collect();

        Self {
            pattern,
            corner_threshold: DEFAULT_CORNER_THRESHOLD,
            max_keypoints: DEFAULT_MAX_KEYPOINTS,
            octaves: DEFAULT_OCTAVES,
        }
    }

    /// How much brighter or darker the ring must be to count as a corner
    pub fn corner_threshold(mut self, threshold: u8) -> Self {
        self.corner_threshold = threshold;
        self
    }

    pub fn max_keypoints(mut self, max: usize) -> Self {
        self.max_keypoints = max;
        self
    }

    pub fn octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves.max(1);
        self
    }

    /// All descriptors over the whole pyramid. An empty result means the
    /// frame has no usable texture, like a solid color card.
    pub fn descriptors(&self, img: &GrayImage) -> Vec<Descriptor> {
        let margin = (PATCH_RADIUS + RING_RADIUS) as u32;
        let mut all = Vec::new();
        let mut level = img.clone();

        for octave in 0..self.octaves {
            if level.width() <= 2 * margin || level.height() <= 2 * margin {
                break;
            }

            let corners = self.detect_corners(&level);
            let kept = suppress(corners, self.max_keypoints);
            if !kept.is_empty() {
                let smoothed = imageops::blur(&level, DESCRIBE_SIGMA);
                all.extend(kept.iter().map(|kp| self.describe(&smoothed, kp)));
            }

            if octave + 1 < self.octaves {
                level = imageops::resize(
                    &level,
                    level.width() / 2,
                    level.height() / 2,
                    imageops::FilterType::Triangle,
                );
            }
        }

        all
    }

    fn detect_corners(&self, img: &GrayImage) -> Vec<Keypoint> {
        let margin = (PATCH_RADIUS + RING_RADIUS) as u32;
        let threshold = self.corner_threshold as i32;
        let at = |x: i64, y: i64| img.get_pixel(x as u32, y as u32)[0] as i32;

        let mut corners = Vec::new();
        for y in margin..img.height() - margin {
            for x in margin..img.width() - margin {
                let center = at(x as i64, y as i64);
                let bright_floor = center + threshold;
                let dark_ceil = center - threshold;

                // an arc of nine covers at least two of the four compass
                // points, so most pixels are rejected after four reads
                let compass = [0, 4, 8, 12].map(|i| {
                    let (dx, dy) = RING[i];
                    at(x as i64 + dx as i64, y as i64 + dy as i64)
                });
                let brighter = compass.iter().filter(|&&v| v > bright_floor).count();
                let darker = compass.iter().filter(|&&v| v < dark_ceil).count();
                if brighter < 2 && darker < 2 {
                    continue;
                }

                let mut bright_mask = 0u32;
                let mut dark_mask = 0u32;
                let mut score = 0u32;
                for (i, (dx, dy)) in RING.iter().enumerate() {
                    let value = at(x as i64 + *dx as i64, y as i64 + *dy as i64);
                    if value > bright_floor {
                        bright_mask |= 1 << i;
                    } else if value < dark_ceil {
                        dark_mask |= 1 << i;
                    }
                    score += value.abs_diff(center);
                }

                if has_contiguous_arc(bright_mask) || has_contiguous_arc(dark_mask) {
                    corners.push(Keypoint { x, y, score });
                }
            }
        }

        corners
    }

    fn describe(&self, smoothed: &GrayImage, kp: &Keypoint) -> Descriptor {
        let at = |dx: i32, dy: i32| {
            smoothed.get_pixel((kp.x as i32 + dx) as u32, (kp.y as i32 + dy) as u32)[0]
        };

        let mut words = [0u64; 4];
        for (i, ((ax, ay), (bx, by))) in self.pattern.iter().enumerate() {
            if at(*ax, *ay) < at(*bx, *by) {
                words[i / 64] |= 1 << (i % 64);
            }
        }
        Descriptor(words)
    }
}

fn has_contiguous_arc(ring_mask: u32) -> bool {
    let arc = (1u32 << ARC_LENGTH) - 1;
    let wrapped = ring_mask | (ring_mask << 16);
    (0..16).any(|start| (wrapped >> start) & arc == arc)
}

/// Strongest corners first, none closer than a few pixels to a better one.
fn suppress(mut corners: Vec<Keypoint>, max: usize) -> Vec<Keypoint> {
    const MIN_DISTANCE: u32 = 4;

    corners.sort_by(|a, b| b.score.cmp(&a.score));
    let mut kept: Vec<Keypoint> = Vec::new();
    for corner in corners {
        if kept.len() >= max {
            break;
        }
        let crowded = kept.iter().any(|k| {
            k.x.abs_diff(corner.x) < MIN_DISTANCE && k.y.abs_diff(corner.y) < MIN_DISTANCE
        });
        if !crowded {
            kept.push(corner);
        }
    }
    kept
}

/// Outcome of matching a reference frame's descriptors against a candidate.
#[derive(Debug, Clone, Copy)]
pub struct MatchStats {
    pub good: usize,
    pub total: usize,
}

impl MatchStats {
    /// Fraction of reference descriptors with an unambiguous match.
    pub fn good_fraction(&self) -> f64 {
        self.good as f64 / self.total as f64
    }
}

/// For every reference descriptor, finds its two nearest candidate
/// descriptors and counts the match as good only when the nearest is clearly
/// closer than the runner up, `distance1 < ratio_cutoff * distance2`. The
/// candidate set must hold at least two descriptors.
pub fn ratio_test_matches(
    reference: &[Descriptor],
    candidate: &[Descriptor],
    ratio_cutoff: f64,
) -> MatchStats {
    debug_assert!(candidate.len() >= 2);

    let mut good = 0;
    for descriptor in reference {
        let mut nearest = u32::MAX;
        let mut second = u32::MAX;
        for other in candidate {
            let distance = descriptor.distance_to(*other);
            if distance < nearest {
                second = nearest;
                nearest = distance;
            } else if distance < second {
                second = distance;
            }
        }

        if (nearest as f64) < ratio_cutoff * (second as f64) {
            good += 1;
        }
    }

    MatchStats {
        good,
        total: reference.len(),
    }
}

/// Deterministic high frequency texture, unique almost everywhere.
#[cfg(test)]
pub(crate) fn noise_image(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let mut v = x.wrapping_mul(0x9E37_79B1)
            ^ y.wrapping_mul(0x85EB_CA6B)
            ^ seed.wrapping_mul(0xC2B2_AE35);
        v ^= v >> 13;
        v = v.wrapping_mul(0x2545_F491);
        image::Luma([(v >> 16) as u8])
    })
}
