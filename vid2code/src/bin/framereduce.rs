use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre;
use log::LevelFilter;
use vid2code::{
    classify::{config::ConfigPreset, rule_based::RuleBasedFilter},
    dedup::{self, features::FeatureEngine, DedupCli},
    frames::FrameSequence,
    reduce::reduce_frames,
};
use vid2code_common::bin_common::init::{init_eyre, init_logger};

#[derive(Parser)]
#[command()]
/// Removes duplicate and non-code frames from a directory of video frames
struct Cli {
    #[command(flatten)]
    dedup: DedupCli,

    /// Detection parameter preset for the code frame classifier
    #[arg(long, value_enum, default_value = "optimized")]
    preset: ConfigPreset,

    /// Only remove duplicates, keep non-code frames
    #[arg(long)]
    dedup_only: bool,

    /// A file to additionally write the logs to
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Directory of frames whose names natural-sort into capture order
    frames_dir: PathBuf,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = Cli::parse();
    init_logger(LevelFilter::Debug, cli.logfile.as_deref())?;

    let engine = FeatureEngine::new();
    let dedup_args = cli.dedup.to_args();

    let seq = if cli.dedup_only {
        let mut seq = FrameSequence::from_dir(&cli.frames_dir)?;
        dedup::remove_duplicates(&mut seq, &engine, &dedup_args);
        seq
    } else {
        let filter = RuleBasedFilter::new(cli.preset.to_config());
        reduce_frames(&cli.frames_dir, &engine, &dedup_args, &filter)?
    };

    for name in seq.names() {
        println!("{name}");
    }

    Ok(())
}
