//! Ties everything together: one request in, the frames and some debug info out.

use std::{
    io,
    path::{Path, PathBuf},
};

use flashframes_common::utils::fsutils::ensure_readable_file;

use crate::{
    captions::parse_vtt,
    debug_info::DebugInfo,
    extractor::{partition_attempts, video_id, FrameExtractor, FrameResult, WorkDir},
    planner::{
        ConfigError, ExtractionConfig, Plan, TimestampPlanner, DEFAULT_MIN_INTERVAL_SECS,
        DEFAULT_SENSITIVITY, DEFAULT_TARGET_FRAMES,
    },
    tools::{CutDetector, DurationProbe, Ffmpeg, FrameGrabber, ToolError},
};

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,
    #[serde(default = "default_min_interval")]
    pub min_interval: f64,
    #[serde(default = "default_target_frames")]
    pub target_frames: usize,
    /// The contents of a WebVTT file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitles: Option<String>,
}

fn default_sensitivity() -> f64 {
    DEFAULT_SENSITIVITY
}

fn default_min_interval() -> f64 {
    DEFAULT_MIN_INTERVAL_SECS
}

fn default_target_frames() -> usize {
    DEFAULT_TARGET_FRAMES
}

#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    #[error("malformed request")]
    Json(#[from] serde_json::Error),
    #[error("filePath is required")]
    MissingFilePath,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ExtractRequest {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            sensitivity: DEFAULT_SENSITIVITY,
            min_interval: DEFAULT_MIN_INTERVAL_SECS,
            target_frames: DEFAULT_TARGET_FRAMES,
            subtitles: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn video(&self) -> Result<&Path, RequestError> {
        match self.file_path.as_deref() {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(RequestError::MissingFilePath),
        }
    }

    pub fn config(&self) -> Result<ExtractionConfig, RequestError> {
        Ok(ExtractionConfig::new(
            self.sensitivity,
            self.min_interval,
            self.target_frames,
        )?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    ExtractionFailed,
}

impl ErrorClass {
    pub fn status(self) -> u16 {
        match self {
            ErrorClass::BadRequest => 400,
            ErrorClass::NotFound => 404,
            ErrorClass::ExtractionFailed => 500,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    BadRequest(#[from] RequestError),
    #[error("the video {} can not be read", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to find out how long the video is")]
    Duration(#[source] ToolError),
    #[error("failed to create a working directory in {}", .temp_root.display())]
    WorkDir {
        temp_root: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("none of the {planned} planned frames could be extracted")]
    Exhausted { planned: usize },
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::BadRequest(_) => ErrorClass::BadRequest,
            PipelineError::NotFound { .. } => ErrorClass::NotFound,
            PipelineError::Duration(_)
            | PipelineError::WorkDir { .. }
            | PipelineError::Exhausted { .. } => ErrorClass::ExtractionFailed,
        }
    }

    pub fn status(&self) -> u16 {
        self.class().status()
    }
}

/// What a failed request answers with.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub status: u16,
}

impl From<&PipelineError> for ErrorBody {
    fn from(error: &PipelineError) -> Self {
        let mut message = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            message,
            status: error.status(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ExtractResponse {
    pub frames: Vec<FrameResult>,
    pub debug: DebugInfo,
}

pub struct Pipeline<'a> {
    probe: &'a dyn DurationProbe,
    detector: &'a dyn CutDetector,
    grabber: &'a dyn FrameGrabber,
    temp_root: PathBuf,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        probe: &'a dyn DurationProbe,
        detector: &'a dyn CutDetector,
        grabber: &'a dyn FrameGrabber,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            probe,
            detector,
            grabber,
            temp_root: temp_root.into(),
        }
    }

    pub fn with_ffmpeg(ffmpeg: &'a Ffmpeg, temp_root: impl Into<PathBuf>) -> Self {
        Self::new(ffmpeg, ffmpeg, ffmpeg, temp_root)
    }

    /// Only decides where to grab frames, nothing is extracted.
    pub fn plan_video(
        &self,
        video: &Path,
        config: &ExtractionConfig,
    ) -> Result<Plan, PipelineError> {
        ensure_readable_file(video).map_err(|source| PipelineError::NotFound {
            path: video.to_path_buf(),
            source,
        })?;

        let duration = self
            .probe
            .duration(video)
            .map_err(PipelineError::Duration)?;
        log::debug!("{} is {duration}s long", video.display());

        Ok(TimestampPlanner::new(config, self.detector).plan(video, duration))
    }

    pub fn run(&self, request: &ExtractRequest) -> Result<ExtractResponse, PipelineError> {
        let video = request.video()?;
        let config = request.config()?;
        log::info!("Extracting frames from {}", video.display());

        let cues = request
            .subtitles
            .as_deref()
            .map(parse_vtt)
            .unwrap_or_default();
        if request.subtitles.is_some() {
            log::debug!("Parsed {} caption cues", cues.len());
        }

        let plan = self.plan_video(video, &config)?;

        let workdir = WorkDir::acquire(&self.temp_root, &video_id(video)).map_err(
            |source| PipelineError::WorkDir {
                temp_root: self.temp_root.clone(),
                source,
            },
        )?;
        let attempts =
            FrameExtractor::new(self.grabber, &cues).extract_all(video, &plan.timestamps, &workdir);
        workdir.close();

        let (frames, failed) = partition_attempts(attempts);
        if frames.is_empty() {
            return Err(PipelineError::Exhausted {
                planned: plan.timestamps.len(),
            });
        }

        log::info!(
            "Extracted {} of {} planned frames from {}",
            frames.len(),
            plan.timestamps.len(),
            video.display()
        );

        let extracted = frames.iter().map(|frame| frame.timestamp).collect();
        Ok(ExtractResponse {
            debug: DebugInfo::new(plan, config.target_frames(), extracted, failed),
            frames,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_defaults() {
        let request = ExtractRequest::from_json(r#"{"filePath": "/v/a.mp4"}"#).unwrap();
        assert_eq!(ExtractRequest::new("/v/a.mp4"), request);
        assert_eq!(Path::new("/v/a.mp4"), request.video().unwrap());
    }

    #[test]
    fn request_null_subtitles() {
        let request =
            ExtractRequest::from_json(r#"{"filePath": "a.mp4", "subtitles": null}"#).unwrap();
        assert!(request.subtitles.is_none());
    }

    #[test]
    fn request_all_fields() {
        let request = ExtractRequest::from_json(
            r#"{"filePath": "a.mp4", "sensitivity": 0.5, "minInterval": 3, "targetFrames": 12, "subtitles": "WEBVTT"}"#,
        )
        .unwrap();
        let config = request.config().unwrap();
        assert_eq!(0.5, config.sensitivity());
        assert_eq!(3.0, config.min_interval());
        assert_eq!(12, config.target_frames());
        assert_eq!(Some("WEBVTT"), request.subtitles.as_deref());
    }

    #[test]
    fn request_missing_path() {
        let request = ExtractRequest::from_json("{}").unwrap();
        assert!(matches!(request.video(), Err(RequestError::MissingFilePath)));
        let request = ExtractRequest::from_json(r#"{"filePath": ""}"#).unwrap();
        assert!(matches!(request.video(), Err(RequestError::MissingFilePath)));
    }

    #[test]
    fn request_malformed() {
        assert!(ExtractRequest::from_json("{filePath").is_err());
        assert!(ExtractRequest::from_json(r#"{"filePath": "a", "targetFrames": -1}"#).is_err());
    }

    #[test]
    fn error_classes() {
        let bad: PipelineError = RequestError::MissingFilePath.into();
        assert_eq!(400, bad.status());
        let missing = PipelineError::NotFound {
            path: "a.mp4".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(404, missing.status());
        assert_eq!(500, PipelineError::Exhausted { planned: 3 }.status());
    }

    #[test]
    fn error_body_includes_causes() {
        let error = PipelineError::NotFound {
            path: "a.mp4".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        let body = ErrorBody::from(&error);
        assert_eq!(404, body.status);
        assert_eq!("the video a.mp4 can not be read: no such file", body.message);
    }
}
