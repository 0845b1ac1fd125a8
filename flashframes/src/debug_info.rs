use crate::{
    planner::{Plan, StageOutcome},
    timestamp::Timestamp,
};

/// How a request went, returned next to the frames.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub duration: f64,
    pub requested_target_frames: usize,
    pub actual_frame_count: usize,
    /// The timestamps of the frames that were actually extracted.
    pub timestamps: Vec<Timestamp>,
    pub planned_frame_count: usize,
    pub failed_frames: Vec<Timestamp>,
    pub stages: Vec<StageOutcome>,
}

impl DebugInfo {
    pub fn new(
        plan: Plan,
        requested_target_frames: usize,
        extracted: Vec<Timestamp>,
        failed_frames: Vec<Timestamp>,
    ) -> Self {
        Self {
            duration: plan.duration,
            requested_target_frames,
            actual_frame_count: extracted.len(),
            timestamps: extracted,
            planned_frame_count: plan.timestamps.len(),
            failed_frames,
            stages: plan.stages,
        }
    }
}

pub fn save_to<T: serde::Serialize>(writer: impl std::io::Write, info: &T) -> ron::Result<()> {
    let conf = ron::ser::PrettyConfig::new().struct_names(true);
    ron::ser::to_writer_pretty(writer, info, conf)
}
