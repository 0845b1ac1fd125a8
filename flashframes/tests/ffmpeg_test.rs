mod common;

use std::{path::PathBuf, process::Stdio, time::Duration};

use common::{cargo_tmpdir, fake_video, tmp_dir};
use flashframes::{
    pipeline::{ExtractRequest, Pipeline},
    tools::{DurationProbe, Ffmpeg, FrameGrabber, ToolError, ToolSettings},
    Timestamp,
};
use flashframes_common::{bin_common::termination::Cookie, utils::subprocess::RunError};

const TEST_VIDEO_LENGTH_SEC: f64 = 30.0;

#[test]
fn test_cancelled_before_starting() {
    let dir = tmp_dir();
    let video = fake_video(dir.path(), "a.mp4");
    let cookie = Cookie::manual();
    cookie.terminate();

    let err = Ffmpeg::new(ToolSettings::default(), cookie)
        .duration(&video)
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn test_missing_binary() {
    let dir = tmp_dir();
    let video = fake_video(dir.path(), "a.mp4");
    let settings = ToolSettings {
        ffmpeg: dir.path().join("no-ffmpeg-here"),
        ..ToolSettings::default()
    };

    let err = Ffmpeg::new(settings, Cookie::manual())
        .grab(&video, Timestamp::from_tenths(5), &dir.path().join("out.jpg"))
        .unwrap_err();
    assert!(matches!(err, ToolError::Run(RunError::Spawn { .. })));
}

#[test]
#[ignore = "needs ffmpeg and ffprobe"]
fn test_duration() {
    let video = create_test_video();
    let duration = ffmpeg().duration(&video).unwrap();
    assert!((duration - TEST_VIDEO_LENGTH_SEC).abs() < 0.1, "{duration}");
}

#[test]
#[ignore = "needs ffmpeg and ffprobe"]
fn test_garbage_is_not_a_video() {
    let dir = tmp_dir();
    let video = fake_video(dir.path(), "garbage.mp4");
    let err = ffmpeg().duration(&video).unwrap_err();
    assert!(matches!(err, ToolError::Failed { .. }), "{err:?}");
}

#[test]
#[ignore = "needs ffmpeg and ffprobe"]
fn test_whole_pipeline() {
    let video = create_test_video();
    let dir = tmp_dir();
    let ffmpeg = ffmpeg();

    let response = Pipeline::with_ffmpeg(&ffmpeg, dir.path())
        .run(&ExtractRequest::new(&video))
        .unwrap();

    assert!(response.debug.failed_frames.is_empty());
    assert!(response.frames.len() >= 10);
    for frame in &response.frames {
        assert!(frame.image.starts_with(&[0xff, 0xd8]), "not a jpeg");
    }
}

#[test]
#[ignore = "needs ffmpeg and ffprobe"]
fn test_grab_timeout() {
    let video = create_test_video();
    let dir = tmp_dir();
    let settings = ToolSettings {
        grab_timeout: Duration::from_nanos(1),
        ..ToolSettings::default()
    };

    let err = Ffmpeg::new(settings, Cookie::manual())
        .grab(&video, Timestamp::from_tenths(50), &dir.path().join("out.jpg"))
        .unwrap_err();
    assert!(err.is_timeout());
}

fn ffmpeg() -> Ffmpeg {
    Ffmpeg::new(ToolSettings::default(), Cookie::manual())
}

fn create_test_video() -> PathBuf {
    let tmpvideo = cargo_tmpdir().join("flashframes_testvideo.mkv");

    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::fs::remove_file(&tmpvideo).ok();
        std::process::Command::new("ffmpeg")
            .args([
                "-f",
                "lavfi",
                "-i",
                "testsrc=duration=30:rate=25",
                tmpvideo.as_os_str().to_str().expect("no probs, probably"),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .status()
            .expect("failed to execute ffmpeg");
    });

    tmpvideo
}
