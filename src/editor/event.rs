use crate::services::api::ApiError;
use crate::waveform::engine::WaveformEvent;

use super::media::MediaKind;
use super::pipeline::Stage;
use super::segment::{AnalysisField, AnalysisValue, AnalysisPatch, Segment, TtsOptions};

/// Everything that enters the controller loop. Remote completions come back
/// through the same channel as user input, so the step function sees one
/// ordered stream.
#[derive(Debug)]
pub enum EditorEvent {
    Command(UserCommand),
    Waveform(WaveformEvent),
    Api(ApiOutcome),
    Media(MediaOutcome),
}

/// Command surface exposed to the UI layer.
#[derive(Debug, Clone)]
pub enum UserCommand {
    /// Bind a project: load its track and fetch its segment list.
    OpenProject {
        project_id: String,
        audio_source: String,
    },
    RefreshSegments,
    CreateFromPendingRegion,
    DeleteSegment { segment_id: String },
    ExtractSegment { segment_id: String },
    Retry { segment_id: String },
    /// Keystroke-level edit; lands in the draft overlay only.
    EditTranslation { segment_id: String, text: String },
    /// Explicit save; also updates the overlay so the response race is safe.
    SaveTranslation { segment_id: String, text: String },
    /// Overlay edit plus debounced autosave.
    EditAnalysisField {
        segment_id: String,
        field: AnalysisField,
        value: AnalysisValue,
    },
    GenerateTts { segment_id: String, voice: String },
    /// Select a segment from the list UI (region clicks select too).
    SelectSegment { segment_id: String },
    SetShowAll(bool),
    /// Hover state from the segment list UI.
    HoverSegment(Option<String>),
    PlayPause,
    Seek { seconds: f64 },
    Zoom { px_per_sec: f64 },
}

/// An outbound remote request, executed by the driver. `seq` is the
/// controller-wide monotonic sequence used for stale-response rejection.
#[derive(Debug, Clone)]
pub enum ApiRequest {
    CreateSegment {
        project_id: String,
        region_id: String,
        start_time: f64,
        end_time: f64,
        seq: u64,
    },
    RefreshSegments { project_id: String, seq: u64 },
    DeleteSegment { segment_id: String, seq: u64 },
    RunStage {
        segment_id: String,
        stage: Stage,
        tts: Option<TtsOptions>,
        seq: u64,
    },
    UpdateTranslation {
        segment_id: String,
        text: String,
        seq: u64,
    },
    UpdateAnalysis {
        segment_id: String,
        patch: AnalysisPatch,
        seq: u64,
    },
}

impl ApiRequest {
    pub fn seq(&self) -> u64 {
        match self {
            Self::CreateSegment { seq, .. }
            | Self::RefreshSegments { seq, .. }
            | Self::DeleteSegment { seq, .. }
            | Self::RunStage { seq, .. }
            | Self::UpdateTranslation { seq, .. }
            | Self::UpdateAnalysis { seq, .. } => *seq,
        }
    }

    pub fn origin(&self) -> ApiOrigin {
        match self {
            Self::CreateSegment {
                project_id,
                region_id,
                ..
            } => ApiOrigin::CreateSegment {
                project_id: project_id.clone(),
                region_id: region_id.clone(),
            },
            Self::RefreshSegments { project_id, .. } => ApiOrigin::RefreshSegments {
                project_id: project_id.clone(),
            },
            Self::DeleteSegment { segment_id, .. } => ApiOrigin::DeleteSegment {
                segment_id: segment_id.clone(),
            },
            Self::RunStage {
                segment_id, stage, ..
            } => ApiOrigin::Stage {
                segment_id: segment_id.clone(),
                stage: *stage,
            },
            Self::UpdateTranslation { segment_id, .. } => ApiOrigin::SaveTranslation {
                segment_id: segment_id.clone(),
            },
            Self::UpdateAnalysis {
                segment_id, patch, ..
            } => ApiOrigin::SaveAnalysis {
                segment_id: segment_id.clone(),
                patch: patch.clone(),
            },
        }
    }
}

/// What a completed request was for, kept alongside its result so the
/// controller can reconcile without a lookup table.
#[derive(Debug, Clone)]
pub enum ApiOrigin {
    CreateSegment { project_id: String, region_id: String },
    RefreshSegments { project_id: String },
    DeleteSegment { segment_id: String },
    Stage { segment_id: String, stage: Stage },
    SaveTranslation { segment_id: String },
    /// Carries the sent patch so a failed save can be re-queued.
    SaveAnalysis {
        segment_id: String,
        patch: AnalysisPatch,
    },
}

#[derive(Debug, Clone)]
pub enum ApiPayload {
    Segment(Segment),
    Segments(Vec<Segment>),
    Deleted,
}

#[derive(Debug)]
pub struct ApiOutcome {
    pub seq: u64,
    pub origin: ApiOrigin,
    pub result: Result<ApiPayload, ApiError>,
}

#[derive(Debug)]
pub struct MediaOutcome {
    pub segment_id: String,
    pub kind: MediaKind,
    pub filename: String,
    pub seq: u64,
    pub result: Result<Vec<u8>, ApiError>,
}

/// Dismissible user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}
