use std::{fmt::Arguments, path::Path};

use crate::timestamp::Timestamp;

pub trait Logger {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>);
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Level {
    Verbose,
    Info,
    Warn,
    Error,
}

pub struct LogLogger;

impl Logger for LogLogger {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>) {
        let level = match level {
            Level::Verbose => log::Level::Debug,
            Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
            Level::Error => log::Level::Error,
        };
        log::log!(target: target, level, "{}", body);
    }
}

/// Suffixes every message with the video, and the position in it if known.
#[derive(Clone, Copy)]
pub struct ContextLogger<'a> {
    video: &'a Path,
    at: Option<Timestamp>,
}

impl<'a> Logger for ContextLogger<'a> {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>) {
        let logger = LogLogger;
        match self.at {
            Some(at) => logger.log(
                level,
                target,
                format_args!("{} ({} @ {})", body, self.video.display(), at),
            ),
            None => logger.log(
                level,
                target,
                format_args!("{} ({})", body, self.video.display()),
            ),
        }
    }
}

impl<'a> ContextLogger<'a> {
    pub fn new(video: &'a Path) -> Self {
        Self { video, at: None }
    }

    pub fn at(self, at: Timestamp) -> Self {
        Self { at: Some(at), ..self }
    }
}

macro_rules! information {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::logger::Level::Info,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

macro_rules! warning {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::logger::Level::Warn,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

macro_rules! fault {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::logger::Level::Error,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

macro_rules! verbose {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::logger::Level::Verbose,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

pub(crate) use fault;
pub(crate) use information;
pub(crate) use verbose;
pub(crate) use warning;
