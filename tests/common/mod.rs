#![allow(dead_code)]

use chrono::Utc;
use tokio::sync::mpsc;

use dubwave::editor::controller::{Effect, EditorController};
use dubwave::editor::event::{ApiRequest, EditorEvent, Notice, UserCommand};
use dubwave::editor::segment::{Segment, SegmentStatus};
use dubwave::waveform::engine::WaveformOp;

pub fn controller() -> EditorController {
    let (tx, rx) = mpsc::channel(32);
    EditorController::new(rx, tx)
}

pub fn seg(id: &str, status: SegmentStatus) -> Segment {
    seg_at(id, status, 0.0, 1.0)
}

pub fn seg_at(id: &str, status: SegmentStatus, start: f64, end: f64) -> Segment {
    Segment {
        id: id.to_string(),
        project_id: "p1".to_string(),
        start_time: start,
        end_time: end,
        audio_file: None,
        original_transcription: None,
        translated_text: None,
        analysis_json: None,
        tts_voice: None,
        tts_result_file: None,
        status,
        error_message: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn cmd(command: UserCommand) -> EditorEvent {
    EditorEvent::Command(command)
}

pub fn api_requests(effects: &[Effect]) -> Vec<&ApiRequest> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Api(request) => Some(request),
            _ => None,
        })
        .collect()
}

pub fn notices(effects: &[Effect]) -> Vec<&Notice> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Notify(notice) => Some(notice),
            _ => None,
        })
        .collect()
}

pub fn wf_ops(effects: &[Effect]) -> Vec<&WaveformOp> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Waveform(op) => Some(op),
            _ => None,
        })
        .collect()
}

/// Open a project and return the seq of the initial list refresh.
pub fn open(controller: &mut EditorController) -> u64 {
    let effects = controller.step(
        vec![cmd(UserCommand::OpenProject {
            project_id: "p1".to_string(),
            audio_source: "p1.wav".to_string(),
        })],
        std::time::Instant::now(),
    );
    refresh_seq(&effects).expect("open must request a segment list")
}

pub fn refresh_seq(effects: &[Effect]) -> Option<u64> {
    api_requests(effects).iter().find_map(|request| match request {
        ApiRequest::RefreshSegments { seq, .. } => Some(*seq),
        _ => None,
    })
}

pub fn stage_seq(effects: &[Effect]) -> Option<u64> {
    api_requests(effects).iter().find_map(|request| match request {
        ApiRequest::RunStage { seq, .. } => Some(*seq),
        _ => None,
    })
}
