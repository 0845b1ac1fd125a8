//! Picks the timestamps to grab frames at.
//!
//! The plan is built by a ladder of strategies, each weaker but more reliable than the
//! one before it, since scene detection on its own gives anything from zero to hundreds
//! of cuts depending on the kind of video:
//!
//! 1. scene detection with a threshold derived from the sensitivity,
//! 2. scene detection again with a very low threshold,
//! 3. evenly spaced timestamps,
//!
//! where a step only runs if the ones before it found fewer than the minimum number of
//! frames. An anchor near the start is always added. The candidates are then thinned
//! out to respect the minimum interval (relaxed once if that removes too much), replaced
//! wholesale by an evenly spaced sequence as a last resort, and finally capped to the
//! maximum number of frames.

use std::path::Path;

use crate::{
    timestamp::{Timestamp, TimestampSet},
    tools::CutDetector,
};

pub const DEFAULT_SENSITIVITY: f64 = 0.3;
pub const DEFAULT_MIN_INTERVAL_SECS: f64 = 2.0;
pub const DEFAULT_TARGET_FRAMES: usize = 15;
pub const DEFAULT_MIN_FRAMES: usize = 10;
pub const DEFAULT_MAX_FRAMES: usize = 20;
pub const MAX_TARGET_FRAMES: usize = 1000;

/// Scene cuts closer than this to either end of the video are ignored.
pub const EDGE_MARGIN_SECS: f64 = 0.5;
/// Always part of the candidates, so there is a frame from the very beginning.
pub const ANCHOR: Timestamp = Timestamp::from_tenths(5);
pub const MIN_PRIMARY_THRESHOLD: f64 = 0.05;
pub const ESCALATED_THRESHOLD: f64 = 0.02;
/// The relaxed minimum interval never goes below this.
pub const MIN_RELAXED_INTERVAL_SECS: f64 = 1.0;

const INTERVAL_TOLERANCE: f64 = 1e-9;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("sensitivity must be within (0, 1], got {0}")]
    Sensitivity(f64),
    #[error("the minimum interval must be a non-negative number of seconds, got {0}")]
    MinInterval(f64),
    #[error("the target frame count must be within [1, {}], got {0}", MAX_TARGET_FRAMES)]
    TargetFrames(usize),
    #[error("the frame budget [{min}, {max}] is empty")]
    FrameBudget { min: usize, max: usize },
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ExtractionConfig {
    sensitivity: f64,
    min_interval: f64,
    target_frames: usize,
    min_frames: usize,
    max_frames: usize,
}

impl ExtractionConfig {
    pub fn new(
        sensitivity: f64,
        min_interval: f64,
        target_frames: usize,
    ) -> Result<Self, ConfigError> {
        if !(sensitivity > 0.0 && sensitivity <= 1.0) {
            return Err(ConfigError::Sensitivity(sensitivity));
        }
        if !(min_interval.is_finite() && min_interval >= 0.0) {
            return Err(ConfigError::MinInterval(min_interval));
        }
        if !(1..=MAX_TARGET_FRAMES).contains(&target_frames) {
            return Err(ConfigError::TargetFrames(target_frames));
        }
        Ok(Self {
            sensitivity,
            min_interval,
            target_frames,
            min_frames: DEFAULT_MIN_FRAMES,
            max_frames: DEFAULT_MAX_FRAMES,
        })
    }

    pub fn with_frame_budget(mut self, min: usize, max: usize) -> Result<Self, ConfigError> {
        if max == 0 || min > max {
            return Err(ConfigError::FrameBudget { min, max });
        }
        self.min_frames = min;
        self.max_frames = max;
        Ok(self)
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn min_interval(&self) -> f64 {
        self.min_interval
    }

    pub fn target_frames(&self) -> usize {
        self.target_frames
    }

    pub fn min_frames(&self) -> usize {
        self.min_frames
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn primary_threshold(&self) -> f64 {
        (self.sensitivity * 0.5).max(MIN_PRIMARY_THRESHOLD)
    }

    pub fn relaxed_interval(&self) -> f64 {
        (self.min_interval / 2.0).max(MIN_RELAXED_INTERVAL_SECS)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_SENSITIVITY,
            DEFAULT_MIN_INTERVAL_SECS,
            DEFAULT_TARGET_FRAMES,
        )
        .expect("the defaults are valid")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum PlanStage {
    SceneDetectPrimary,
    SceneDetectEscalated,
    EvenSpacingFallback,
    Anchor,
    IntervalFilter,
    Relaxed,
    FinalFallback,
    Capped,
}

/// What one stage of the ladder did.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct StageOutcome {
    pub stage: PlanStage,
    /// The threshold, interval or cap the stage worked with.
    pub parameter: f64,
    /// Number of candidates after the stage ran.
    pub candidates: usize,
    /// Why the stage contributed nothing, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageOutcome {
    fn new(stage: PlanStage, parameter: f64, candidates: usize) -> Self {
        Self {
            stage,
            parameter,
            candidates,
            error: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Plan {
    pub duration: f64,
    pub timestamps: Vec<Timestamp>,
    pub stages: Vec<StageOutcome>,
}

impl Plan {
    pub fn ran(&self, stage: PlanStage) -> bool {
        self.stages.iter().any(|outcome| outcome.stage == stage)
    }
}

pub struct TimestampPlanner<'a> {
    config: &'a ExtractionConfig,
    detector: &'a dyn CutDetector,
}

impl<'a> TimestampPlanner<'a> {
    pub fn new(config: &'a ExtractionConfig, detector: &'a dyn CutDetector) -> Self {
        Self { config, detector }
    }

    pub fn plan(&self, video: &Path, duration: f64) -> Plan {
        let config = self.config;
        let mut stages = Vec::new();
        let mut candidates = TimestampSet::new();

        stages.push(self.scene_tier(
            PlanStage::SceneDetectPrimary,
            config.primary_threshold(),
            video,
            duration,
            &mut candidates,
        ));

        if candidates.len() < config.min_frames() {
            stages.push(self.scene_tier(
                PlanStage::SceneDetectEscalated,
                ESCALATED_THRESHOLD,
                video,
                duration,
                &mut candidates,
            ));
        }

        if candidates.len() < config.min_frames() {
            candidates.extend(even_spacing(duration, config.target_frames()));
            stages.push(StageOutcome::new(
                PlanStage::EvenSpacingFallback,
                spacing_interval(duration, config.target_frames()),
                candidates.len(),
            ));
        }

        candidates.insert(ANCHOR);
        stages.push(StageOutcome::new(
            PlanStage::Anchor,
            ANCHOR.as_secs_f64(),
            candidates.len(),
        ));

        let mut timestamps = interval_filter(candidates.as_slice(), config.min_interval());
        stages.push(StageOutcome::new(
            PlanStage::IntervalFilter,
            config.min_interval(),
            timestamps.len(),
        ));

        if timestamps.len() < config.min_frames() {
            let relaxed = config.relaxed_interval();
            timestamps = interval_filter(candidates.as_slice(), relaxed);
            stages.push(StageOutcome::new(
                PlanStage::Relaxed,
                relaxed,
                timestamps.len(),
            ));
        }

        if timestamps.len() < config.min_frames() {
            timestamps = anchored_even_spacing(duration, config.target_frames());
            stages.push(StageOutcome::new(
                PlanStage::FinalFallback,
                spacing_interval(duration, config.target_frames()),
                timestamps.len(),
            ));
        }

        if timestamps.len() > config.max_frames() {
            timestamps = stride_sample(timestamps, config.max_frames());
            stages.push(StageOutcome::new(
                PlanStage::Capped,
                config.max_frames() as f64,
                timestamps.len(),
            ));
        }

        log::info!(
            "Planned {} frames for {} ({}s long) after {} stages",
            timestamps.len(),
            video.display(),
            duration,
            stages.len()
        );

        Plan {
            duration,
            timestamps,
            stages,
        }
    }

    /// Adds the detector's cuts to the candidates. A failing detector adds nothing.
    fn scene_tier(
        &self,
        stage: PlanStage,
        threshold: f64,
        video: &Path,
        duration: f64,
        candidates: &mut TimestampSet,
    ) -> StageOutcome {
        match self.detector.scene_cuts(video, threshold) {
            Ok(cuts) => {
                let before = candidates.len();
                candidates.extend(
                    cuts.into_iter()
                        .filter(|&cut| within_margins(cut, duration))
                        .map(Timestamp::from_secs_f64),
                );
                log::debug!(
                    "{stage:?} at threshold {threshold} added {} candidates",
                    candidates.len() - before
                );
                StageOutcome::new(stage, threshold, candidates.len())
            }
            Err(e) => {
                log::warn!("{stage:?} at threshold {threshold} failed, skipping it: {e}");
                StageOutcome {
                    error: Some(e.to_string()),
                    ..StageOutcome::new(stage, threshold, candidates.len())
                }
            }
        }
    }
}

/// Whether a cut is strictly inside `(margin, duration - margin)`.
pub fn within_margins(secs: f64, duration: f64) -> bool {
    secs > EDGE_MARGIN_SECS && secs < duration - EDGE_MARGIN_SECS
}

pub fn spacing_interval(duration: f64, target_frames: usize) -> f64 {
    duration / (target_frames as f64 + 1.0)
}

fn spaced_from(start: f64, duration: f64, target_frames: usize) -> Vec<Timestamp> {
    let interval = spacing_interval(duration, target_frames);
    if !(interval.is_finite() && interval > 0.0) {
        return Vec::new();
    }
    let end = duration - EDGE_MARGIN_SECS;
    (0u64..)
        .map(|k| start + k as f64 * interval)
        .take_while(|&secs| secs < end)
        .map(Timestamp::from_secs_f64)
        .collect()
}

/// `interval, 2*interval, ...` up to the end margin, where
/// `interval = duration / (target_frames + 1)`.
pub fn even_spacing(duration: f64, target_frames: usize) -> Vec<Timestamp> {
    spaced_from(spacing_interval(duration, target_frames), duration, target_frames)
}

/// Like [`even_spacing`] but starting at the anchor, which is always included.
pub fn anchored_even_spacing(duration: f64, target_frames: usize) -> Vec<Timestamp> {
    let mut set: TimestampSet =
        spaced_from(ANCHOR.as_secs_f64(), duration, target_frames)
            .into_iter()
            .collect();
    set.insert(ANCHOR);
    set.into_vec()
}

/// Keeps a sorted timestamp only if it is at least `min_interval` after the last kept
/// one. The first one is always kept.
pub fn interval_filter(sorted: &[Timestamp], min_interval: f64) -> Vec<Timestamp> {
    let mut kept = Vec::new();
    let mut last = -min_interval;
    for &ts in sorted {
        let secs = ts.as_secs_f64();
        if secs - last >= min_interval - INTERVAL_TOLERANCE {
            kept.push(ts);
            last = secs;
        }
    }
    kept
}

/// Thins out to exactly `max` elements picked at evenly spread indices, keeping the
/// order and the first element.
pub fn stride_sample<T: Copy>(items: Vec<T>, max: usize) -> Vec<T> {
    let len = items.len();
    if len <= max {
        return items;
    }
    (0..max).map(|i| items[i * len / max]).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn secs(timestamps: &[Timestamp]) -> Vec<f64> {
        timestamps.iter().map(|ts| ts.as_secs_f64()).collect()
    }

    fn tenths(values: &[u64]) -> Vec<Timestamp> {
        values.iter().copied().map(Timestamp::from_tenths).collect()
    }

    #[test]
    fn config_validation() {
        assert!(ExtractionConfig::new(0.3, 2.0, 15).is_ok());
        assert!(ExtractionConfig::new(1.0, 0.0, 1).is_ok());
        assert_eq!(
            Err(ConfigError::Sensitivity(0.0)),
            ExtractionConfig::new(0.0, 2.0, 15)
        );
        assert!(ExtractionConfig::new(1.5, 2.0, 15).is_err());
        assert!(ExtractionConfig::new(f64::NAN, 2.0, 15).is_err());
        assert!(ExtractionConfig::new(0.3, -1.0, 15).is_err());
        assert!(ExtractionConfig::new(0.3, f64::INFINITY, 15).is_err());
        assert_eq!(
            Err(ConfigError::TargetFrames(0)),
            ExtractionConfig::new(0.3, 2.0, 0)
        );
        assert!(ExtractionConfig::default().with_frame_budget(5, 4).is_err());
        assert!(ExtractionConfig::default().with_frame_budget(0, 0).is_err());
        assert!(ExtractionConfig::default().with_frame_budget(3, 3).is_ok());
    }

    #[test]
    fn thresholds() {
        assert_eq!(0.15, ExtractionConfig::default().primary_threshold());
        let low = ExtractionConfig::new(0.02, 2.0, 15).unwrap();
        assert_eq!(MIN_PRIMARY_THRESHOLD, low.primary_threshold());
    }

    #[test]
    fn relaxed_interval_floor() {
        assert_eq!(1.0, ExtractionConfig::default().relaxed_interval());
        let wide = ExtractionConfig::new(0.3, 10.0, 15).unwrap();
        assert_eq!(5.0, wide.relaxed_interval());
    }

    #[test]
    fn margins_are_exclusive() {
        assert!(!within_margins(0.5, 10.0));
        assert!(within_margins(0.51, 10.0));
        assert!(within_margins(9.49, 10.0));
        assert!(!within_margins(9.5, 10.0));
    }

    #[test]
    fn even_spacing_stops_before_end_margin() {
        // interval = 10 / 4 = 2.5
        assert_eq!(vec![2.5, 5.0, 7.5], secs(&even_spacing(10.0, 3)));
        assert!(even_spacing(0.0, 3).is_empty());
    }

    #[test]
    fn anchored_spacing() {
        // interval = 10 / 5 = 2
        assert_eq!(vec![0.5, 2.5, 4.5, 6.5, 8.5], secs(&anchored_even_spacing(10.0, 4)));
        assert_eq!(vec![0.5], secs(&anchored_even_spacing(0.8, 4)));
    }

    #[test]
    fn interval_filter_keeps_first() {
        let ts = tenths(&[5, 10, 25, 30, 45, 46, 70]);
        assert_eq!(vec![0.5, 2.5, 4.5, 7.0], secs(&interval_filter(&ts, 2.0)));
        assert_eq!(ts, interval_filter(&ts, 0.0));
    }

    #[test]
    fn interval_filter_exact_gap() {
        let ts = tenths(&[1, 22, 43]);
        assert_eq!(ts, interval_filter(&ts, 2.1));
    }

    #[test]
    fn stride_sample_exact_count() {
        let items: Vec<u32> = (0..25).collect();
        let sampled = stride_sample(items, 20);
        assert_eq!(20, sampled.len());
        assert_eq!(0, sampled[0]);
        assert!(sampled.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn stride_sample_short_is_untouched() {
        assert_eq!(vec![1, 2, 3], stride_sample(vec![1, 2, 3], 20));
    }

    #[test]
    fn stride_sample_even_stride() {
        let items: Vec<u32> = (0..40).collect();
        let expected: Vec<u32> = (0..40).step_by(2).collect();
        assert_eq!(expected, stride_sample(items, 20));
    }
}
