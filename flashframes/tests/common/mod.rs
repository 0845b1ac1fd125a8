// NOTE: every test will complain about the functions it doesn't use
#![allow(unused)]

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use flashframes::{
    tools::{CutDetector, DurationProbe, FrameGrabber, ToolError},
    Timestamp,
};
use tempfile::TempDir;

pub const FAKE_JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];

/// Returns cargo's tmpdir
pub fn cargo_tmpdir() -> PathBuf {
    PathBuf::from(option_env!("CARGO_TARGET_TMPDIR").expect("no cargo tmpdir???"))
}

/// Returns a fresh temporary directory inside cargo's tmpdir
pub fn tmp_dir() -> TempDir {
    tempfile::tempdir_in(cargo_tmpdir()).expect("could not create temporary dir")
}

/// Creates a file that only pretends to be a video
pub fn fake_video(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"not really a video").expect("could not write the fake video");
    path
}

pub fn tool_error(reason: &str) -> ToolError {
    ToolError::Parse {
        program: "stub".to_string(),
        reason: reason.to_string(),
    }
}

pub fn secs(timestamps: &[Timestamp]) -> Vec<f64> {
    timestamps.iter().map(|ts| ts.as_secs_f64()).collect()
}

pub struct StubProbe {
    pub duration: Option<f64>,
    pub calls: AtomicUsize,
}

impl StubProbe {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            duration: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl DurationProbe for StubProbe {
    fn duration(&self, _video: &Path) -> Result<f64, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.duration.ok_or_else(|| tool_error("no duration"))
    }
}

/// Answers with the cuts for the first threshold it is at or above, nothing otherwise.
pub struct StubDetector {
    by_threshold: Vec<(f64, Result<Vec<f64>, String>)>,
    pub thresholds: Mutex<Vec<f64>>,
}

impl StubDetector {
    pub fn none() -> Self {
        Self::new(vec![])
    }

    pub fn always(cuts: Vec<f64>) -> Self {
        Self::new(vec![(0.0, Ok(cuts))])
    }

    pub fn failing() -> Self {
        Self::new(vec![(0.0, Err("scene detection exploded".to_string()))])
    }

    /// Sorted by descending threshold.
    pub fn new(by_threshold: Vec<(f64, Result<Vec<f64>, String>)>) -> Self {
        Self {
            by_threshold,
            thresholds: Mutex::new(Vec::new()),
        }
    }

    pub fn called_with(&self) -> Vec<f64> {
        self.thresholds.lock().unwrap().clone()
    }
}

impl CutDetector for StubDetector {
    fn scene_cuts(&self, _video: &Path, threshold: f64) -> Result<Vec<f64>, ToolError> {
        self.thresholds.lock().unwrap().push(threshold);
        match self.by_threshold.iter().find(|(at, _)| threshold >= *at) {
            Some((_, Ok(cuts))) => Ok(cuts.clone()),
            Some((_, Err(reason))) => Err(tool_error(reason)),
            None => Ok(vec![]),
        }
    }
}

pub enum Grab {
    Ok,
    Fail,
    Empty,
    Panic,
}

/// Writes [`FAKE_JPEG`] unless `behaviour` says otherwise for the timestamp.
pub struct StubGrabber<F> {
    behaviour: F,
    pub outputs: Mutex<Vec<PathBuf>>,
}

impl<F> StubGrabber<F>
where
    F: Fn(Timestamp) -> Grab + Sync,
{
    pub fn new(behaviour: F) -> Self {
        Self {
            behaviour,
            outputs: Mutex::new(Vec::new()),
        }
    }

    pub fn outputs(&self) -> Vec<PathBuf> {
        self.outputs.lock().unwrap().clone()
    }
}

pub fn ok_grabber() -> StubGrabber<impl Fn(Timestamp) -> Grab + Sync> {
    StubGrabber::new(|_| Grab::Ok)
}

impl<F> FrameGrabber for StubGrabber<F>
where
    F: Fn(Timestamp) -> Grab + Sync,
{
    fn grab(&self, _video: &Path, at: Timestamp, output: &Path) -> Result<(), ToolError> {
        self.outputs.lock().unwrap().push(output.to_path_buf());
        match (self.behaviour)(at) {
            Grab::Ok => {
                fs::write(output, FAKE_JPEG).expect("could not write the fake frame");
                Ok(())
            }
            Grab::Fail => Err(tool_error("could not grab")),
            Grab::Empty => {
                fs::write(output, b"").expect("could not write the fake frame");
                Ok(())
            }
            Grab::Panic => panic!("grabber blew up at {at}"),
        }
    }
}
