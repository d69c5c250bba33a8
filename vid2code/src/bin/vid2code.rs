use std::{
    cmp,
    ffi::OsString,
    fs,
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use log::LevelFilter;
use vid2code::{
    classify::{config::ConfigPreset, rule_based::RuleBasedFilter},
    dedup::{features::FeatureEngine, DedupArgs, DedupCli},
    reduce::reduce_frames,
    stages::{
        download::Downloader,
        ocr::Ocr,
        reconstruct::{write_source_file, LlmArgs, LlmCli, Reconstructor},
        split::FrameSplitter,
    },
};
use vid2code_common::bin_common::{
    init::{init_eyre, init_logger},
    termination::Terminator,
};
use vid2code_common::utils::fsutils::read_optional_file;

#[derive(Parser, Debug)]
#[command()]
/// Reconstructs source code from programming tutorial videos
struct Cli {
    /// Extract this many frames per second from each video
    #[arg(long, default_value_t = 1)]
    fps: u32,

    #[command(flatten)]
    dedup: DedupCli,

    /// Detection parameter preset for the code frame classifier
    #[arg(long, value_enum, default_value = "optimized")]
    preset: ConfigPreset,

    #[command(flatten)]
    llm: LlmCli,

    /// Use this many worker threads, each processing one video at a time
    #[arg(long, short = 'j', default_value = "1")]
    video_threads: NonZeroU32,

    /// Where downloaded videos and their frame directories live
    #[arg(long, default_value = "videos")]
    videos_dir: PathBuf,

    /// Where reconstructed source files are written
    #[arg(long, default_value = "generated_projects")]
    output_dir: PathBuf,

    /// File extension for reconstructed source files
    #[arg(long, default_value = "txt")]
    extension: String,

    /// Keep downloaded video files after splitting them into frames
    #[arg(long)]
    keep_video: bool,

    /// Stop after OCR and write the raw frame texts as JSON
    #[arg(long)]
    ocr_only: bool,

    /// A file to additionally write the logs to
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Video URLs to download, or paths of already downloaded videos
    #[arg(required = true)]
    inputs: Vec<String>,
}

fn cli_arguments() -> eyre::Result<Cli> {
    const ARGS_FILE: &str = ".vid2coderc";
    let mut args: Vec<OsString> = std::env::args_os().collect();

    if args.len() == 1 {
        if let Some(flags) = read_optional_file(ARGS_FILE)
            .wrap_err_with(|| format!("Could not read config file at: {ARGS_FILE}"))?
        {
            args.extend(
                flags
                    .split_whitespace()
                    .map(|s| std::ffi::OsStr::new(s).to_owned()),
            );
        }
    }

    Ok(Cli::parse_from(args))
}

struct RunConfig {
    fps: u32,
    dedup: DedupArgs,
    preset: ConfigPreset,
    llm: LlmArgs,
    videos_dir: PathBuf,
    output_dir: PathBuf,
    extension: String,
    keep_video: bool,
    ocr_only: bool,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = cli_arguments()?;
    init_logger(LevelFilter::Debug, cli.logfile.as_deref())?;

    let term = Terminator::install().wrap_err("Failed to install signal handlers")?;

    let config = RunConfig {
        fps: cli.fps,
        dedup: cli.dedup.to_args(),
        preset: cli.preset,
        llm: cli.llm.to_args(),
        videos_dir: cli.videos_dir,
        output_dir: cli.output_dir,
        extension: cli.extension,
        keep_video: cli.keep_video,
        ocr_only: cli.ocr_only,
    };

    let next = AtomicUsize::new(0);
    let worker_count = cmp::min(cli.inputs.len(), cli.video_threads.get() as usize);

    let inputs = &cli.inputs;
    let config = &config;
    let term = &term;
    let next = &next;

    thread::scope(|s| {
        let mut handles = Vec::new();
        for i in 0..worker_count {
            let handle = thread::Builder::new()
                .name(format!("V{i:03}"))
                .spawn_scoped(s, move || worker(inputs, next, config, term))
                .expect("failed to spawn thread");
            handles.push(handle);
        }

        for handle in handles {
            if handle.join().is_err() {
                log::error!("a video worker panicked");
            }
        }
    });

    Ok(())
}

fn worker(inputs: &[String], next: &AtomicUsize, config: &RunConfig, term: &Terminator) {
    loop {
        if term.should_stop() {
            log::info!("stopping before the next video");
            break;
        }

        let index = next.fetch_add(1, Ordering::SeqCst);
        let Some(input) = inputs.get(index) else {
            break;
        };
        log::info!("Progress: {}/{} videos", index + 1, inputs.len());

        if let Err(e) = process_video(input, config, term) {
            log::error!("failed to process '{input}': {e:?}");
        }
    }
}

fn process_video(input: &str, config: &RunConfig, term: &Terminator) -> eyre::Result<()> {
    let downloaded = !Path::new(input).exists();
    let video_path = if downloaded {
        Downloader::new(&config.videos_dir)
            .download(input)
            .wrap_err("failed to download the video")?
    } else {
        PathBuf::from(input)
    };

    let title = video_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let frames_dir = config.videos_dir.join(&title);

    FrameSplitter::new(config.fps)
        .split(&video_path, &frames_dir)
        .wrap_err("failed to split the video into frames")?;

    if downloaded && !config.keep_video {
        if let Err(e) = fs::remove_file(&video_path) {
            log::warn!("could not remove video {}: {e}", video_path.display());
        }
    }

    if term.should_stop() {
        log::info!("terminated before reducing '{title}'");
        return Ok(());
    }

    let engine = FeatureEngine::new();
    let filter = RuleBasedFilter::new(config.preset.to_config());
    let seq = reduce_frames(&frames_dir, &engine, &config.dedup, &filter)
        .wrap_err("failed to reduce the frames")?;

    if term.should_stop() {
        log::info!("terminated before OCR of '{title}'");
        return Ok(());
    }

    let texts = Ocr::new()
        .extract(&seq)
        .wrap_err("failed to extract text from the frames")?;

    if config.ocr_only {
        let json = serde_json::to_string_pretty(&texts)
            .wrap_err("failed to serialize the frame texts")?;
        write_source_file(&config.output_dir, &format!("{title}.json"), &json)
            .wrap_err("failed to write the frame texts")?;
        return Ok(());
    }

    let source = Reconstructor::new(config.llm.clone())
        .reconstruct(&texts)
        .wrap_err("failed to reconstruct the source file")?;
    write_source_file(
        &config.output_dir,
        &format!("{title}.{}", config.extension),
        &source,
    )
    .wrap_err("failed to write the reconstructed source file")?;

    Ok(())
}
