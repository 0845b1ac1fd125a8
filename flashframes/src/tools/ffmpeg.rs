use std::{
    path::{Path, PathBuf},
    process::Command,
    sync::OnceLock,
    time::Duration,
};

use flashframes_common::{
    bin_common::termination::Cookie,
    utils::subprocess::{run_time_boxed, Captured},
};
use regex::Regex;

use super::{CutDetector, DurationProbe, FrameGrabber, ToolError};
use crate::timestamp::Timestamp;

/// How many lines of stderr to keep when a tool fails.
const STDERR_TAIL_LINES: usize = 8;

#[derive(Clone, Debug)]
pub struct ToolSettings {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub probe_timeout: Duration,
    /// Scene detection decodes the whole video, so this one needs to be generous.
    pub scene_timeout: Duration,
    pub grab_timeout: Duration,
    /// ffmpeg's `-q:v`, 2 is near lossless and 31 is the worst.
    pub jpeg_quality: u8,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
            probe_timeout: Duration::from_secs(30),
            scene_timeout: Duration::from_secs(120),
            grab_timeout: Duration::from_secs(30),
            jpeg_quality: 2,
        }
    }
}

/// All three tool capabilities, implemented with the `ffmpeg` and `ffprobe` binaries.
/// Every invocation is time-boxed and killed early if the cookie trips.
#[derive(Clone, Debug)]
pub struct Ffmpeg {
    settings: ToolSettings,
    cookie: Cookie,
}

impl Ffmpeg {
    pub fn new(settings: ToolSettings, cookie: Cookie) -> Self {
        Self { settings, cookie }
    }

    fn run(&self, cmd: Command, timeout: Duration) -> Result<Captured, ToolError> {
        let program = cmd.get_program().to_string_lossy().into_owned();
        let out = run_time_boxed(cmd, timeout, &self.cookie)?;
        if !out.status.success() {
            return Err(ToolError::Failed {
                program,
                status: out.status,
                stderr: stderr_tail(&out.stderr_lossy()),
            });
        }
        Ok(out)
    }
}

impl DurationProbe for Ffmpeg {
    fn duration(&self, video: &Path) -> Result<f64, ToolError> {
        let mut cmd = Command::new(&self.settings.ffprobe);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(video);

        let out = self.run(cmd, self.settings.probe_timeout)?;
        parse_duration(&out.stdout_lossy()).map_err(|reason| ToolError::Parse {
            program: self.settings.ffprobe.to_string_lossy().into_owned(),
            reason,
        })
    }
}

impl CutDetector for Ffmpeg {
    fn scene_cuts(&self, video: &Path, threshold: f64) -> Result<Vec<f64>, ToolError> {
        let mut cmd = Command::new(&self.settings.ffmpeg);
        cmd.args(["-hide_banner", "-nostats", "-nostdin", "-i"])
            .arg(video)
            .args([
                "-vf",
                format!("select='gt(scene,{threshold:.3})',showinfo").as_str(),
                "-an",
                "-f",
                "null",
                "-",
            ]);

        let out = self.run(cmd, self.settings.scene_timeout)?;
        let cuts = parse_showinfo_times(&out.stderr_lossy());
        log::debug!(
            "Scene detection at {threshold:.3} found {} cuts in {}",
            cuts.len(),
            video.display()
        );
        Ok(cuts)
    }
}

impl FrameGrabber for Ffmpeg {
    fn grab(&self, video: &Path, at: Timestamp, output: &Path) -> Result<(), ToolError> {
        let mut cmd = Command::new(&self.settings.ffmpeg);
        cmd.args(["-nostdin", "-ss", at.to_seek_arg().as_str(), "-i"])
            .arg(video)
            .args([
                "-frames:v",
                "1",
                "-q:v",
                self.settings.jpeg_quality.to_string().as_str(),
                "-loglevel",
                "error",
                "-y",
            ])
            .arg(output);

        self.run(cmd, self.settings.grab_timeout)?;
        Ok(())
    }
}

/// Parses ffprobe's bare `format=duration` output.
pub fn parse_duration(stdout: &str) -> Result<f64, String> {
    let trimmed = stdout.trim();
    let secs: f64 = trimmed
        .parse()
        .map_err(|_| format!("'{trimmed}' is not a duration"))?;
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err(format!("the duration {secs} is not positive"))
    }
}

fn pts_time_regex() -> &'static Regex {
    static PTS_TIME: OnceLock<Regex> = OnceLock::new();
    PTS_TIME.get_or_init(|| {
        Regex::new(r"pts_time:\s*(\d+(?:\.\d*)?)").expect("the regex is valid")
    })
}

/// Collects every `pts_time` the showinfo filter printed, in output order.
pub fn parse_showinfo_times(stderr: &str) -> Vec<f64> {
    pts_time_regex()
        .captures_iter(stderr)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let skip = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[skip..].join("\n")
}
