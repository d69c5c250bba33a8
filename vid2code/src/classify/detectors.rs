use std::path::Path;

use image::{GenericImageView, GrayImage, RgbImage};
use vid2code_common::utils::{
    edges,
    imgutils::{self, is_img_empty},
    math::{find_peaks, Stats},
};

use super::config::{DetectionConfig, HsvRange, SignalWeights};
use crate::frames;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;
const DARK_PIXEL_CUTOFF: u8 = 128;

/// A sub-detector gave up instead of answering. Callers count this as the
/// signal not firing.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("frame has no pixels")]
    EmptyFrame,
    #[error("frame too narrow for a line number margin")]
    NoMargin,
}

/// Code editors render text in a monospace font, so the widths of the
/// thresholded glyph blobs barely vary.
pub fn detect_monospace_text(
    gray: &GrayImage,
    config: &DetectionConfig,
) -> Result<bool, ClassificationError> {
    if is_img_empty(gray) {
        return Err(ClassificationError::EmptyFrame);
    }

    let level = imgutils::otsu_level(gray);
    let mask = imgutils::threshold(gray, level);

    let widths: Vec<u32> = imgutils::foreground_regions(&mask)
        .into_iter()
        .filter(|r| config.min_contour_area < r.area && r.area < config.max_contour_area)
        .map(|r| r.width)
        .collect();

    if widths.len() < config.min_text_contours {
        return Ok(false);
    }

    let stats: Stats = widths.into_iter().collect();
    Ok(stats.variance() < config.max_width_variance)
}

/// Syntax highlighting leaves a noticeable share of blue keywords, green
/// strings and purple types on screen.
pub fn detect_syntax_colors(
    img: &RgbImage,
    config: &DetectionConfig,
) -> Result<bool, ClassificationError> {
    if is_img_empty(img) {
        return Err(ClassificationError::EmptyFrame);
    }

    let ranges = [config.blue_range, config.green_range, config.purple_range];
    let mut colored = 0u64;
    for pixel in img.pixels() {
        let hsv = imgutils::rgb_to_hsv(*pixel);
        for range in &ranges {
            if hsv_in_range(hsv, range) {
                colored += 1;
            }
        }
    }

    let total = (img.width() as u64 * img.height() as u64) as f64;
    Ok(colored as f64 / total > config.min_color_ratio)
}

fn hsv_in_range(hsv: [u8; 3], (lower, upper): &HsvRange) -> bool {
    hsv.iter()
        .zip(lower)
        .zip(upper)
        .all(|((&v, &lo), &hi)| lo <= v && v <= hi)
}

/// Indentation and editor gutters produce near-vertical lines in the edge
/// map. Too eager on furniture and door frames, which is why its default
/// weight is zero; it is still computed and reported.
pub fn detect_structure(
    gray: &GrayImage,
    config: &DetectionConfig,
) -> Result<bool, ClassificationError> {
    if is_img_empty(gray) {
        return Err(ClassificationError::EmptyFrame);
    }

    let edge_mask = edges::canny(gray, CANNY_LOW, CANNY_HIGH);
    let lines = edges::hough_lines(&edge_mask, config.hough_threshold);

    let vertical = lines
        .iter()
        .filter(|line| {
            edges::angle_from_vertical(line.theta) < config.vertical_angle_tolerance
        })
        .count();

    Ok(vertical > config.min_vertical_lines)
}

/// Line numbers sit in the left margin as short dark rows at a fixed
/// vertical rhythm; evenly spaced peaks in the dark-pixel profile of that
/// margin give them away.
pub fn detect_line_numbers(
    gray: &GrayImage,
    config: &DetectionConfig,
) -> Result<bool, ClassificationError> {
    if is_img_empty(gray) {
        return Err(ClassificationError::EmptyFrame);
    }

    let margin_width = (gray.width() as f64 * config.line_number_region_width) as u32;
    if margin_width == 0 {
        return Err(ClassificationError::NoMargin);
    }

    let margin = gray.view(0, 0, margin_width, gray.height());
    let profile = imgutils::dark_row_profile(&*margin, DARK_PIXEL_CUTOFF);
    let peaks = find_peaks(&profile, config.min_dark_pixels_per_line);

    if peaks.len() < config.min_lines_for_detection {
        return Ok(false);
    }

    let spacings: Stats = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    Ok(spacings.variance() < config.max_spacing_variance)
}

/// Most programming screencasts use a dark editor theme.
pub fn detect_dark_theme(
    gray: &GrayImage,
    config: &DetectionConfig,
) -> Result<bool, ClassificationError> {
    if is_img_empty(gray) {
        return Err(ClassificationError::EmptyFrame);
    }

    Ok(imgutils::mean_brightness(gray) < config.dark_theme_brightness_threshold)
}

/// One boolean per sub-detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodeSignals {
    pub monospace: bool,
    pub syntax_colors: bool,
    pub structure: bool,
    pub line_numbers: bool,
    pub dark_theme: bool,
}

impl CodeSignals {
    pub fn score(&self, weights: &SignalWeights) -> f64 {
        let on = |signal: bool, weight: f64| if signal { weight } else { 0.0 };
        on(self.monospace, weights.monospace)
            + on(self.syntax_colors, weights.syntax_colors)
            + on(self.structure, weights.structure)
            + on(self.line_numbers, weights.line_numbers)
            + on(self.dark_theme, weights.dark_theme)
    }

    pub fn is_code(&self, config: &DetectionConfig) -> bool {
        self.score(&config.weights) > config.final_threshold
    }
}

/// Runs all five detectors. A detector that gives up contributes a signal of
/// zero, it never takes the other detectors down with it.
pub fn detect_signals(img: &RgbImage, config: &DetectionConfig) -> CodeSignals {
    let gray = imgutils::grayscale(img);

    let contained = |name: &str, result: Result<bool, ClassificationError>| match result {
        Ok(signal) => signal,
        Err(e) => {
            log::warn!("{name} detector gave up: {e}");
            false
        }
    };

    CodeSignals {
        monospace: contained("monospace", detect_monospace_text(&gray, config)),
        syntax_colors: contained("syntax colors", detect_syntax_colors(img, config)),
        structure: contained("structure", detect_structure(&gray, config)),
        line_numbers: contained("line numbers", detect_line_numbers(&gray, config)),
        dark_theme: contained("dark theme", detect_dark_theme(&gray, config)),
    }
}

/// Does the frame at `path` show source code? Fails closed: a frame that
/// cannot be loaded or scored is never code.
pub fn classify_frame(path: &Path, config: &DetectionConfig) -> bool {
    let img = match frames::load_rgb(path) {
        Ok(img) => img,
        Err(e) => {
            log::warn!("treating unreadable frame as not code: {e}");
            return false;
        }
    };

    let signals = detect_signals(&img, config);
    let score = signals.score(&config.weights);
    log::debug!(
        "{}: monospace={} syntax_colors={} structure={} line_numbers={} dark_theme={} \
         score={score:.3}",
        path.display(),
        signals.monospace,
        signals.syntax_colors,
        signals.structure,
        signals.line_numbers,
        signals.dark_theme,
    );

    score > config.final_threshold
}
