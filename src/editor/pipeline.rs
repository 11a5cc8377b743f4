use std::collections::HashMap;

use super::segment::{Segment, SegmentStatus};

/// One remote pipeline stage. Translation saves are not a stage: they never
/// move `status` on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Analyze,
    GenerateTts,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Analyze => "analyze",
            Self::GenerateTts => "generate TTS",
        }
    }
}

/// Pipeline decision table. Single writer of auto-advance state: the guard
/// against duplicate auto-requests is an explicit per-segment field, not a
/// render-local flag, so repeated observations of the same status are
/// idempotent until the request resolves.
#[derive(Debug, Default)]
pub struct PipelineTracker {
    pending_auto: HashMap<String, Stage>,
    last_failed: HashMap<String, Stage>,
}

impl PipelineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Can `stage` be started from the segment's current status? `error` is
    /// always a valid starting point (retry).
    pub fn can_start(segment: &Segment, stage: Stage) -> bool {
        use SegmentStatus::*;
        match stage {
            Stage::Extract => matches!(segment.status, Created | Error),
            Stage::Analyze => matches!(segment.status, Extracted | Error),
            Stage::GenerateTts => matches!(segment.status, Analyzed | Completed | Error),
        }
    }

    /// Observe a reconciled segment and decide whether to auto-advance.
    /// Returns the stage to issue at most once per guard window.
    pub fn observe(&mut self, segment: &Segment) -> Option<Stage> {
        if segment.status != SegmentStatus::Extracted {
            return None;
        }
        // GUARD: one auto-analyze per segment until the request resolves.
        if self.pending_auto.contains_key(&segment.id) {
            return None;
        }
        self.pending_auto.insert(segment.id.clone(), Stage::Analyze);
        Some(Stage::Analyze)
    }

    /// A stage request for this segment finished. Failure re-arms the
    /// auto-trigger guard and records the stage for retry.
    pub fn stage_resolved(&mut self, segment_id: &str, stage: Stage, ok: bool) {
        self.pending_auto.remove(segment_id);
        if ok {
            self.last_failed.remove(segment_id);
        } else {
            self.last_failed.insert(segment_id.to_string(), stage);
        }
    }

    /// Which stage a retry should re-issue. Prefers the stage recorded when
    /// the failure happened locally; for a server-pushed error, derives it
    /// from which artifacts are missing.
    pub fn retry_stage(&self, segment: &Segment) -> Option<Stage> {
        if segment.status != SegmentStatus::Error {
            return None;
        }
        if let Some(stage) = self.last_failed.get(&segment.id) {
            return Some(*stage);
        }
        if segment.audio_file.is_none() {
            Some(Stage::Extract)
        } else if segment.analysis_json.is_none() {
            Some(Stage::Analyze)
        } else {
            Some(Stage::GenerateTts)
        }
    }

    /// Segment deleted or torn down: drop all tracked state for it.
    pub fn forget(&mut self, segment_id: &str) {
        self.pending_auto.remove(segment_id);
        self.last_failed.remove(segment_id);
    }
}
