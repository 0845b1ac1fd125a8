use std::{
    fs, io,
    path::{Path, PathBuf},
};

use flashframes_common::utils::workers::{scoped_workers, FinishedWorker};
use tempfile::TempDir;

use crate::{
    captions::{match_caption, CaptionCue},
    logger::{fault, information, verbose, warning, ContextLogger, Logger},
    timestamp::Timestamp,
    tools::{FrameGrabber, ToolError},
};

/// A grabbed frame with the caption shown around it.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FrameResult {
    pub timestamp: Timestamp,
    #[serde(serialize_with = "serialize_jpeg_data_url")]
    pub image: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("failed to read the grabbed frame at {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("the grabbed frame is empty")]
    Empty,
    #[error("the worker panicked: {0}")]
    Panicked(String),
}

#[derive(Debug)]
pub enum FrameAttempt {
    Extracted(FrameResult),
    Failed {
        timestamp: Timestamp,
        error: FrameError,
    },
}

impl FrameAttempt {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            FrameAttempt::Extracted(frame) => frame.timestamp,
            FrameAttempt::Failed { timestamp, .. } => *timestamp,
        }
    }
}

/// Splits into the extracted frames and the timestamps that failed, both in order.
pub fn partition_attempts(attempts: Vec<FrameAttempt>) -> (Vec<FrameResult>, Vec<Timestamp>) {
    let mut frames = Vec::with_capacity(attempts.len());
    let mut failed = Vec::new();
    for attempt in attempts {
        match attempt {
            FrameAttempt::Extracted(frame) => frames.push(frame),
            FrameAttempt::Failed { timestamp, .. } => failed.push(timestamp),
        }
    }
    (frames, failed)
}

/// A scratch directory for the intermediate images of one request. It is unique per
/// request, even for the same video, and removed when dropped.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    pub fn acquire(temp_root: &Path, video_id: &str) -> io::Result<Self> {
        fs::create_dir_all(temp_root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{video_id}_frames_"))
            .tempdir_in(temp_root)?;
        log::debug!("Created the working directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.path().join(format!("frame_{index:04}.jpg"))
    }

    /// Same as dropping it, but failures are logged.
    pub fn close(self) {
        let path = self.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => log::debug!("Removed the working directory {}", path.display()),
            Err(e) => log::warn!(
                "Failed to remove the working directory {}: {e}",
                path.display()
            ),
        }
    }
}

/// What identifies a video in names derived from it, its file stem.
pub fn video_id(video: &Path) -> String {
    video
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "video".to_string())
}

pub struct FrameExtractor<'a> {
    grabber: &'a dyn FrameGrabber,
    cues: &'a [CaptionCue],
}

impl<'a> FrameExtractor<'a> {
    pub fn new(grabber: &'a dyn FrameGrabber, cues: &'a [CaptionCue]) -> Self {
        Self { grabber, cues }
    }

    /// Grabs every timestamp concurrently, one thread each. The attempts are in the same
    /// order as `timestamps`, a failure of one never affects the others.
    pub fn extract_all(
        &self,
        video: &Path,
        timestamps: &[Timestamp],
        workdir: &WorkDir,
    ) -> Vec<FrameAttempt> {
        let logger = ContextLogger::new(video);
        information!(logger, "Grabbing {} frames", timestamps.len());

        let finished = scoped_workers(
            "grab",
            timestamps.iter().copied().enumerate(),
            |(index, at)| self.extract_one(video, at, &workdir.frame_path(index)),
        );

        let attempts: Vec<FrameAttempt> = finished
            .into_iter()
            .zip(timestamps)
            .map(|(FinishedWorker { name, result }, &at)| match result {
                Ok(attempt) => attempt,
                Err(panic) => {
                    fault!(
                        logger.at(at),
                        "Worker '{}' panicked: {}",
                        name,
                        panic
                    );
                    FrameAttempt::Failed {
                        timestamp: at,
                        error: FrameError::Panicked(panic.to_string()),
                    }
                }
            })
            .collect();

        let failed = attempts
            .iter()
            .filter(|attempt| matches!(attempt, FrameAttempt::Failed { .. }))
            .count();
        if failed > 0 {
            warning!(
                logger,
                "{} of {} frames could not be grabbed",
                failed,
                attempts.len()
            );
        }

        attempts
    }

    fn extract_one(&self, video: &Path, at: Timestamp, output: &Path) -> FrameAttempt {
        let logger = ContextLogger::new(video).at(at);
        match self.grab_bytes(video, at, output) {
            Ok(image) => {
                let caption = match_caption(self.cues, at.as_secs_f64()).map(str::to_string);
                verbose!(
                    logger,
                    "Grabbed {} bytes, caption: {:?}",
                    image.len(),
                    caption
                );
                FrameAttempt::Extracted(FrameResult {
                    timestamp: at,
                    image,
                    caption,
                })
            }
            Err(error) => {
                warning!(logger, "Dropping the frame: {}", error);
                FrameAttempt::Failed {
                    timestamp: at,
                    error,
                }
            }
        }
    }

    fn grab_bytes(&self, video: &Path, at: Timestamp, output: &Path) -> Result<Vec<u8>, FrameError> {
        self.grabber.grab(video, at, output)?;
        let image = fs::read(output).map_err(|source| FrameError::Read {
            path: output.to_path_buf(),
            source,
        })?;
        if image.is_empty() {
            return Err(FrameError::Empty);
        }
        Ok(image)
    }
}

fn serialize_jpeg_data_url<S: serde::Serializer>(
    image: &[u8],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&jpeg_data_url(image))
}

pub fn jpeg_data_url(image: &[u8]) -> String {
    let encoded = base64::Engine::encode(&base64::prelude::BASE64_STANDARD, image);
    format!("data:image/jpeg;base64,{encoded}")
}
