/// Inclusive lower and upper HSV bounds, hue on the halved 0..=179 scale.
pub type HsvRange = ([u8; 3], [u8; 3]);

#[derive(Debug, Clone, Copy)]
pub struct SignalWeights {
    pub monospace: f64,
    pub syntax_colors: f64,
    pub structure: f64,
    pub line_numbers: f64,
    pub dark_theme: f64,
}

/// All tunables of the code frame detectors, passed by value into every
/// detector. Presets are alternative constructors, not separate types.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    // monospace text
    pub min_contour_area: u32,
    pub max_contour_area: u32,
    pub max_width_variance: f64,
    pub min_text_contours: usize,

    // syntax colors
    pub min_color_ratio: f64,
    pub blue_range: HsvRange,
    pub green_range: HsvRange,
    pub purple_range: HsvRange,

    // structure
    pub hough_threshold: u32,
    pub min_vertical_lines: usize,
    pub vertical_angle_tolerance: f32,

    // line numbers
    pub line_number_region_width: f64,
    pub max_spacing_variance: f64,
    pub min_dark_pixels_per_line: u32,
    pub min_lines_for_detection: usize,

    // dark theme
    pub dark_theme_brightness_threshold: f64,

    // final scoring
    pub weights: SignalWeights,
    pub final_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::optimized()
    }
}

impl DetectionConfig {
    /// The production preset. Rebalanced towards monospace detection, the
    /// most reliable signal; the structure detector still runs but its weight
    /// is zero because of its false positive rate.
    pub fn optimized() -> Self {
        Self {
            weights: SignalWeights {
                monospace: 0.6,
                syntax_colors: 0.2,
                structure: 0.0,
                line_numbers: 0.15,
                dark_theme: 0.05,
            },
            final_threshold: 0.5,
            ..Self::baseline()
        }
    }

    /// The untuned starting point with evenly spread weights.
    pub fn baseline() -> Self {
        Self {
            min_contour_area: 5,
            max_contour_area: 500,
            max_width_variance: 20.0,
            min_text_contours: 10,

            min_color_ratio: 0.05,
            blue_range: ([100, 50, 50], [130, 255, 255]),
            green_range: ([40, 50, 50], [80, 255, 255]),
            purple_range: ([130, 50, 50], [160, 255, 255]),

            hough_threshold: 100,
            min_vertical_lines: 5,
            vertical_angle_tolerance: 0.1,

            line_number_region_width: 0.1,
            max_spacing_variance: 100.0,
            min_dark_pixels_per_line: 5,
            min_lines_for_detection: 3,

            dark_theme_brightness_threshold: 80.0,

            weights: SignalWeights {
                monospace: 0.25,
                syntax_colors: 0.25,
                structure: 0.2,
                line_numbers: 0.15,
                dark_theme: 0.15,
            },
            final_threshold: 0.4,
        }
    }

    /// Tighter color ranges and relaxed monospace requirements, meant to cut
    /// false positives on non-code footage while keeping real editors.
    pub fn refined() -> Self {
        Self {
            max_width_variance: 40.0,
            min_text_contours: 8,

            min_color_ratio: 0.03,
            blue_range: ([110, 100, 100], [125, 255, 255]),
            green_range: ([50, 80, 80], [70, 255, 255]),
            purple_range: ([135, 80, 80], [155, 255, 255]),

            hough_threshold: 70,
            min_vertical_lines: 4,

            max_spacing_variance: 120.0,

            weights: SignalWeights {
                monospace: 0.3,
                syntax_colors: 0.3,
                structure: 0.2,
                line_numbers: 0.15,
                dark_theme: 0.05,
            },
            final_threshold: 0.4,
            ..Self::baseline()
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum ConfigPreset {
    Optimized,
    Baseline,
    Refined,
}

impl ConfigPreset {
    pub fn to_config(self) -> DetectionConfig {
        match self {
            ConfigPreset::Optimized => DetectionConfig::optimized(),
            ConfigPreset::Baseline => DetectionConfig::baseline(),
            ConfigPreset::Refined => DetectionConfig::refined(),
        }
    }
}
