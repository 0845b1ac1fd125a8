//! Command line flags shared by the binaries.

use std::{path::PathBuf, time::Duration};

use crate::{
    planner::{DEFAULT_MIN_INTERVAL_SECS, DEFAULT_SENSITIVITY, DEFAULT_TARGET_FRAMES},
    tools::ToolSettings,
};

#[derive(clap::Args, Debug)]
pub struct ToolArgs {
    /// The ffmpeg binary to use
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// The ffprobe binary to use
    #[arg(long, default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Give up on finding the duration after this long
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    probe_timeout: Duration,

    /// Give up on one round of scene detection after this long
    #[arg(long, default_value = "2min", value_parser = humantime::parse_duration)]
    scene_timeout: Duration,

    /// Give up on grabbing one frame after this long
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    grab_timeout: Duration,

    /// JPEG quality of the frames, 2 is the best and 31 the worst
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(2..=31))]
    jpeg_quality: u8,
}

impl ToolArgs {
    pub fn to_settings(&self) -> ToolSettings {
        ToolSettings {
            ffmpeg: self.ffmpeg.clone(),
            ffprobe: self.ffprobe.clone(),
            probe_timeout: self.probe_timeout,
            scene_timeout: self.scene_timeout,
            grab_timeout: self.grab_timeout,
            jpeg_quality: self.jpeg_quality,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct PlanningArgs {
    /// How sensitive scene detection is, within (0, 1]
    #[arg(long, default_value_t = DEFAULT_SENSITIVITY)]
    pub sensitivity: f64,

    /// Minimum number of seconds between two frames
    #[arg(long, default_value_t = DEFAULT_MIN_INTERVAL_SECS)]
    pub min_interval: f64,

    /// Roughly how many frames to aim for when spacing them evenly
    #[arg(long, default_value_t = DEFAULT_TARGET_FRAMES)]
    pub target_frames: usize,
}

#[derive(clap::Args, Debug)]
pub struct LogArgs {
    /// A file to additionally write the logs to
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Log more, can be repeated
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log less, can be repeated
    #[arg(long, short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}
