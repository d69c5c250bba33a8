use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{self, Context};
use vid2code::classify::{config::ConfigPreset, detectors};
use vid2code_common::bin_common::init::init_eyre;

#[derive(Parser)]
#[command()]
/// Reports whether images look like frames of source code
struct Cli {
    /// Detection parameter preset to use
    #[arg(long, value_enum, default_value = "optimized")]
    preset: ConfigPreset,

    /// The image files to classify
    inputs: Vec<PathBuf>,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = Cli::parse();
    let config = cli.preset.to_config();

    for input in cli.inputs {
        let img = image::open(&input)
            .wrap_err_with(|| format!("Could not open {:?}", input))?
            .to_rgb8();

        let signals = detectors::detect_signals(&img, &config);
        let score = signals.score(&config.weights);
        let verdict = if score > config.final_threshold {
            "code"
        } else {
            "not code"
        };

        let input = input.display();
        println!(
            "{input}: monospace={} syntax_colors={} structure={} line_numbers={} \
             dark_theme={} score={score:.3} -> {verdict}",
            signals.monospace,
            signals.syntax_colors,
            signals.structure,
            signals.line_numbers,
            signals.dark_theme,
        );
    }

    Ok(())
}
