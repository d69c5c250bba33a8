use std::{fs::File, path::Path};

use color_eyre::eyre::{self, Context};
use log::LevelFilter;

pub fn init_eyre() -> eyre::Result<()> {
    use color_eyre::config::{HookBuilder, Theme};
    let theme = if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        Theme::dark()
    } else {
        Theme::new()
    };

    HookBuilder::default()
        .theme(theme)
        .display_env_section(false)
        .install()
        .wrap_err("Failed to install eyre")
}

pub fn init_logger(level: LevelFilter, logfile: Option<&Path>) -> eyre::Result<()> {
    use simplelog::*;

    let mut builder = ConfigBuilder::new();
    builder.set_target_level(LevelFilter::Error);
    builder.set_thread_level(LevelFilter::Off);
    builder.set_level_padding(LevelPadding::Right);

    // NOTE: only works reliably while the process is still single threaded
    let timezone_failed = builder.set_time_offset_to_local().is_err();

    let color = if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        builder.build(),
        TerminalMode::Stdout,
        color,
    )];

    let logfile_failed = logfile.and_then(|logfile| match File::create(logfile) {
        Ok(f) => {
            loggers.push(WriteLogger::new(level, builder.build(), f));
            None
        }
        Err(e) => Some(e),
    });

    CombinedLogger::init(loggers).wrap_err("Failed to set the logger")?;

    if timezone_failed {
        log::warn!("Failed to set the logger's time zone, timestamps are UTC");
    }

    if let Some(logfile) = logfile {
        match logfile_failed {
            Some(e) => log::error!(
                "Failed to create the log file at '{}' because: {e}",
                logfile.display()
            ),
            None => log::debug!("Logging to: {}", logfile.display()),
        }
    }

    Ok(())
}
