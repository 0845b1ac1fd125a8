use std::path::Path;

use color_eyre::{
    config::{HookBuilder, Theme},
    eyre::{self, Context},
};
use fern_format::{Format, Stream};

pub fn init_eyre() -> eyre::Result<()> {
    let eyre_color = if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        Theme::dark()
    } else {
        Theme::new()
    };

    let (stderr_panic_hook, eyre_hook) =
        HookBuilder::default().theme(eyre_color).into_hooks();
    eyre_hook
        .install()
        .wrap_err("failed to install eyre hook")?;

    let (log_panic_hook, _) = HookBuilder::default().theme(Theme::new()).into_hooks();

    std::panic::set_hook(Box::new(move |info| {
        eprintln!("{}", stderr_panic_hook.panic_report(info));

        log::error!(target: "panic", "{}", log_panic_hook.panic_report(info));
    }));

    Ok(())
}

/// Maps `-v` and `-q` counts to a level, `Info` being the default.
pub fn verbosity_level(verbose: u8, quiet: u8) -> log::LevelFilter {
    const LEVELS: [log::LevelFilter; 6] = [
        log::LevelFilter::Off,
        log::LevelFilter::Error,
        log::LevelFilter::Warn,
        log::LevelFilter::Info,
        log::LevelFilter::Debug,
        log::LevelFilter::Trace,
    ];
    let index = (3 + i16::from(verbose) - i16::from(quiet)).clamp(0, 5);
    LEVELS[index as usize]
}

/// Logs go to stderr since stdout is reserved for the response, and optionally to
/// `logfile` with everything down to `Debug`.
pub fn init_logger(level: log::LevelFilter, logfile: Option<&Path>) -> eyre::Result<()> {
    let mut dispatch = fern::Dispatch::new().level(log::LevelFilter::Trace).chain(
        fern::Dispatch::new()
            .level(level)
            .format(
                Format::new()
                    .color_if_supported(Stream::Stderr)
                    .uniquely_color_threads()
                    .callback(),
            )
            .chain(std::io::stderr()),
    );

    if let Some(logfile) = logfile {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(level.max(log::LevelFilter::Debug))
                .format(Format::new().thread_names().callback())
                .chain(fern::log_file(logfile).wrap_err_with(|| {
                    format!("failed to open the log file at: {logfile:?}")
                })?),
        );
    }

    dispatch.apply().wrap_err("failed to set the logger")?;

    Ok(())
}
