//! The external programs the pipeline leans on, behind one trait per capability so that
//! they can be swapped out in tests.

pub mod ffmpeg;

use std::{path::Path, process::ExitStatus};

use flashframes_common::utils::subprocess::RunError;

use crate::timestamp::Timestamp;

pub use ffmpeg::{Ffmpeg, ToolSettings};

#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("could not make sense of the output from '{program}': {reason}")]
    Parse { program: String, reason: String },
}

impl ToolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolError::Run(RunError::TimedOut { .. }))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Run(RunError::Cancelled { .. }))
    }
}

/// Knows how long a video is.
pub trait DurationProbe {
    /// The length in seconds, always finite and positive.
    fn duration(&self, video: &Path) -> Result<f64, ToolError>;
}

/// Finds abrupt visual changes in a video.
pub trait CutDetector {
    /// Timestamps, in seconds, of every frame whose scene change score is above
    /// `threshold`. Lower thresholds give more cuts.
    fn scene_cuts(&self, video: &Path, threshold: f64) -> Result<Vec<f64>, ToolError>;
}

/// Grabs single still images out of a video. Used from several threads at once.
pub trait FrameGrabber: Sync {
    /// Writes a JPEG of the frame at `at` to `output`.
    fn grab(&self, video: &Path, at: Timestamp, output: &Path) -> Result<(), ToolError>;
}
