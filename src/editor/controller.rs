use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::services::api::{ApiClient, ApiError};
use crate::waveform::engine::{
    PlaybackState, WaveformBackend, WaveformEngine, WaveformEvent, WaveformOp,
};

use super::autosave::AutosaveBuffer;
use super::event::{
    ApiOrigin, ApiOutcome, ApiPayload, ApiRequest, EditorEvent, MediaOutcome, Notice, UserCommand,
};
use super::media::{MediaHandle, MediaKind, MediaStore};
use super::overlay::DraftOverlay;
use super::pipeline::{PipelineTracker, Stage};
use super::regions::{self, RegionEntry, RegionStore};
use super::segment::{is_valid_voice, Segment, SegmentStatus, TtsOptions, DEFAULT_TTS_VOICE};

/// Work the step function wants done. The async driver executes these; the
/// step itself never awaits.
#[derive(Debug)]
pub enum Effect {
    Api(ApiRequest),
    FetchMedia {
        segment_id: String,
        kind: MediaKind,
        filename: String,
        seq: u64,
    },
    Waveform(WaveformOp),
    Notify(Notice),
}

/// Display row for the segment list UI.
#[derive(Debug, Clone)]
pub struct SegmentView {
    pub id: String,
    pub time_range: String,
    pub status: SegmentStatus,
    pub status_label: &'static str,
    pub translation: Option<String>,
    pub error_message: Option<String>,
    pub is_processing: bool,
    pub has_audio: bool,
    pub has_tts: bool,
}

/// The Sync Controller. Mediates between the region store, the pipeline
/// tracker, and the remote segment list, keeping all three consistent under
/// concurrent async operations.
///
/// The segment list is the single source of truth after any mutation.
/// Responses carry the seq of the request that produced them; per segment
/// id, a response older than the last applied one is discarded, so UI state
/// never regresses.
pub struct EditorController {
    pub receiver: mpsc::Receiver<EditorEvent>,
    tx: mpsc::Sender<EditorEvent>,

    project_id: Option<String>,
    segments: Vec<Segment>,
    engine: WaveformEngine,
    regions: RegionStore,
    pipeline: PipelineTracker,
    overlay: DraftOverlay,
    autosave: AutosaveBuffer,
    media: MediaStore,

    selected: Option<String>,
    last_tts: HashMap<String, TtsOptions>,

    next_seq: u64,
    /// Per segment id: seq of the last applied segment response.
    applied: HashMap<String, u64>,
    /// Per segment id: the stage request currently in flight.
    stage_inflight: HashMap<String, (u64, Stage)>,
    /// Seq of the last applied list refresh.
    list_applied: u64,
}

impl EditorController {
    pub fn new(receiver: mpsc::Receiver<EditorEvent>, tx: mpsc::Sender<EditorEvent>) -> Self {
        Self {
            receiver,
            tx,
            project_id: None,
            segments: Vec::new(),
            engine: WaveformEngine::new(),
            regions: RegionStore::new(),
            pipeline: PipelineTracker::new(),
            overlay: DraftOverlay::new(),
            autosave: AutosaveBuffer::new(),
            media: MediaStore::new(),
            selected: None,
            last_tts: HashMap::new(),
            next_seq: 0,
            applied: HashMap::new(),
            stage_inflight: HashMap::new(),
            list_applied: 0,
        }
    }

    pub fn handle(&self) -> mpsc::Sender<EditorEvent> {
        self.tx.clone()
    }

    // ------------------------------------------------------------------
    // Read surface for the UI layer
    // ------------------------------------------------------------------

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment_views(&self) -> Vec<SegmentView> {
        self.segments
            .iter()
            .map(|segment| SegmentView {
                id: segment.id.clone(),
                time_range: segment.time_range_label(),
                status: segment.status,
                status_label: segment.status.label(),
                translation: self
                    .overlay
                    .effective_translation(segment)
                    .map(str::to_string),
                error_message: segment.error_message.clone(),
                is_processing: self.stage_inflight.contains_key(&segment.id),
                has_audio: self.media.handle(&segment.id, MediaKind::SegmentAudio).is_some(),
                has_tts: self.media.handle(&segment.id, MediaKind::TtsResult).is_some(),
            })
            .collect()
    }

    pub fn playback(&self) -> &PlaybackState {
        self.engine.state()
    }

    pub fn pending_region(&self) -> Option<&RegionEntry> {
        self.regions.pending()
    }

    pub fn regions(&self) -> &RegionStore {
        &self.regions
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn media_handle(&self, segment_id: &str, kind: MediaKind) -> Option<&MediaHandle> {
        self.media.handle(segment_id, kind)
    }

    pub fn is_processing(&self, segment_id: &str) -> bool {
        self.stage_inflight.contains_key(segment_id)
    }

    /// Whether the commit control should be enabled. Validation failures
    /// surface as a disabled control, not a notification.
    pub fn can_commit_region(&self) -> bool {
        self.regions
            .pending()
            .map_or(false, |region| region.end > region.start)
    }

    pub fn can_generate_tts(&self, segment_id: &str) -> bool {
        let Some(segment) = self.segments.iter().find(|s| s.id == segment_id) else {
            return false;
        };
        let has_text = self
            .overlay
            .effective_translation(segment)
            .map_or(false, |text| !text.trim().is_empty());
        has_text
            && PipelineTracker::can_start(segment, Stage::GenerateTts)
            && !self.stage_inflight.contains_key(segment_id)
    }

    // ------------------------------------------------------------------
    // Step
    // ------------------------------------------------------------------

    /// Pure transition step: fold a batch of events into state and return
    /// the effects to execute. MUST NOT await.
    pub fn step(&mut self, events: Vec<EditorEvent>, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        for event in events {
            match event {
                EditorEvent::Command(cmd) => self.on_command(cmd, now, &mut effects),
                EditorEvent::Waveform(ev) => self.on_waveform(ev, &mut effects),
                EditorEvent::Api(outcome) => self.on_api(outcome, now, &mut effects),
                EditorEvent::Media(outcome) => self.on_media(outcome),
            }
        }
        // Flush autosaves that went quiet for the full debounce window.
        for (segment_id, patch) in self.autosave.drain_due(now) {
            if patch.is_empty() {
                continue;
            }
            let seq = self.alloc_seq();
            effects.push(Effect::Api(ApiRequest::UpdateAnalysis {
                segment_id,
                patch,
                seq,
            }));
        }
        effects
    }

    fn alloc_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Route a waveform op through the engine's readiness gate.
    fn push_wf(&mut self, op: WaveformOp, effects: &mut Vec<Effect>) {
        for prepared in self.engine.prepare(op) {
            effects.push(Effect::Waveform(prepared));
        }
    }

    fn rebuild_regions(&mut self, effects: &mut Vec<Effect>) {
        for op in self.regions.rebuild(&self.segments) {
            self.push_wf(op, effects);
        }
    }

    fn sort_segments(&mut self) {
        self.segments.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn on_command(&mut self, cmd: UserCommand, now: Instant, effects: &mut Vec<Effect>) {
        match cmd {
            UserCommand::OpenProject {
                project_id,
                audio_source,
            } => {
                self.project_id = Some(project_id.clone());
                self.push_wf(WaveformOp::Load { source: audio_source }, effects);
                let seq = self.alloc_seq();
                effects.push(Effect::Api(ApiRequest::RefreshSegments { project_id, seq }));
            }
            UserCommand::RefreshSegments => {
                if let Some(project_id) = self.project_id.clone() {
                    let seq = self.alloc_seq();
                    effects.push(Effect::Api(ApiRequest::RefreshSegments { project_id, seq }));
                }
            }
            UserCommand::CreateFromPendingRegion => {
                let Some(project_id) = self.project_id.clone() else {
                    return;
                };
                match self.regions.pending().cloned() {
                    None => effects.push(Effect::Notify(Notice::Error(
                        "No region selected. Drag on the waveform to select a region.".to_string(),
                    ))),
                    Some(region) if region.end <= region.start => {
                        // Rejected locally, never sent to the backend.
                        effects.push(Effect::Notify(Notice::Error(
                            "Region must end after it starts.".to_string(),
                        )));
                    }
                    Some(region) => {
                        let seq = self.alloc_seq();
                        effects.push(Effect::Api(ApiRequest::CreateSegment {
                            project_id,
                            region_id: region.id,
                            start_time: region.start,
                            end_time: region.end,
                            seq,
                        }));
                    }
                }
            }
            UserCommand::DeleteSegment { segment_id } => {
                let seq = self.alloc_seq();
                effects.push(Effect::Api(ApiRequest::DeleteSegment { segment_id, seq }));
            }
            UserCommand::ExtractSegment { segment_id } => {
                if let Some(segment) = self.segments.iter().find(|s| s.id == segment_id).cloned() {
                    self.issue_stage(&segment, Stage::Extract, None, false, effects);
                }
            }
            UserCommand::Retry { segment_id } => {
                let Some(segment) = self.segments.iter().find(|s| s.id == segment_id).cloned()
                else {
                    return;
                };
                match self.pipeline.retry_stage(&segment) {
                    Some(Stage::GenerateTts) => {
                        let options = self.tts_options_for(&segment);
                        self.issue_stage(&segment, Stage::GenerateTts, Some(options), false, effects);
                    }
                    Some(stage) => self.issue_stage(&segment, stage, None, false, effects),
                    None => {}
                }
            }
            UserCommand::EditTranslation { segment_id, text } => {
                self.overlay.edit_translation(&segment_id, text);
            }
            UserCommand::SaveTranslation { segment_id, text } => {
                self.overlay.edit_translation(&segment_id, text.clone());
                let seq = self.alloc_seq();
                effects.push(Effect::Api(ApiRequest::UpdateTranslation {
                    segment_id,
                    text,
                    seq,
                }));
            }
            UserCommand::EditAnalysisField {
                segment_id,
                field,
                value,
            } => {
                self.overlay.edit_analysis(&segment_id, field, value.clone());
                self.autosave.record(&segment_id, field, value, now);
            }
            UserCommand::GenerateTts { segment_id, voice } => {
                let Some(segment) = self.segments.iter().find(|s| s.id == segment_id).cloned()
                else {
                    return;
                };
                let has_text = self
                    .overlay
                    .effective_translation(&segment)
                    .map_or(false, |text| !text.trim().is_empty());
                if !has_text {
                    // Local validation: no network call without text to speak.
                    effects.push(Effect::Notify(Notice::Error(
                        "Translation is required before generating TTS.".to_string(),
                    )));
                    return;
                }
                if !is_valid_voice(&voice) {
                    effects.push(Effect::Notify(Notice::Error(format!(
                        "Unknown TTS voice: {voice}"
                    ))));
                    return;
                }
                let options = TtsOptions::build(
                    &voice,
                    segment.analysis_json.as_ref(),
                    self.overlay.analysis(&segment.id),
                );
                self.last_tts.insert(segment.id.clone(), options.clone());
                self.issue_stage(&segment, Stage::GenerateTts, Some(options), false, effects);
            }
            UserCommand::SelectSegment { segment_id } => {
                if self.segments.iter().any(|s| s.id == segment_id) {
                    self.selected = Some(segment_id);
                }
            }
            UserCommand::SetShowAll(show_all) => {
                for op in self.regions.set_show_all(show_all) {
                    self.push_wf(op, effects);
                }
            }
            UserCommand::HoverSegment(segment_id) => {
                for op in self.regions.set_hovered(segment_id) {
                    self.push_wf(op, effects);
                }
            }
            UserCommand::PlayPause => {
                if let Some(op) = self.engine.play_pause_op() {
                    self.push_wf(op, effects);
                }
            }
            UserCommand::Seek { seconds } => {
                self.push_wf(WaveformOp::Seek { seconds }, effects);
            }
            UserCommand::Zoom { px_per_sec } => {
                self.push_wf(WaveformOp::Zoom { px_per_sec }, effects);
            }
        }
    }

    /// The options a TTS retry should re-issue: whatever was last sent for
    /// the segment, else rebuilt from its stored voice and analysis.
    fn tts_options_for(&self, segment: &Segment) -> TtsOptions {
        if let Some(options) = self.last_tts.get(&segment.id) {
            return options.clone();
        }
        let voice = segment.tts_voice.as_deref().unwrap_or(DEFAULT_TTS_VOICE);
        TtsOptions::build(voice, segment.analysis_json.as_ref(), self.overlay.analysis(&segment.id))
    }

    fn issue_stage(
        &mut self,
        segment: &Segment,
        stage: Stage,
        tts: Option<TtsOptions>,
        auto: bool,
        effects: &mut Vec<Effect>,
    ) {
        if !PipelineTracker::can_start(segment, stage) {
            if !auto {
                effects.push(Effect::Notify(Notice::Error(format!(
                    "Cannot {} a segment in status '{}'.",
                    stage.label(),
                    segment.status.label()
                ))));
            }
            return;
        }
        if self.stage_inflight.contains_key(&segment.id) {
            return;
        }
        let seq = self.alloc_seq();
        self.stage_inflight.insert(segment.id.clone(), (seq, stage));
        debug!(segment_id = %segment.id, stage = stage.label(), seq, auto, "issuing stage request");
        effects.push(Effect::Api(ApiRequest::RunStage {
            segment_id: segment.id.clone(),
            stage,
            tts,
            seq,
        }));
    }

    // ------------------------------------------------------------------
    // Waveform events
    // ------------------------------------------------------------------

    fn on_waveform(&mut self, event: WaveformEvent, effects: &mut Vec<Effect>) {
        self.engine.observe(&event);
        match event {
            WaveformEvent::Ready { .. } => {
                // Regions added before readiness were gated; mirror them now.
                self.rebuild_regions(effects);
            }
            WaveformEvent::RegionCreated { id, start, end }
            | WaveformEvent::RegionUpdated { id, start, end } => {
                // Persisted regions have immutable geometry; only the
                // pending selection tracks drags.
                if !id.starts_with(regions::PERSISTED_PREFIX) {
                    for op in self.regions.set_pending(&id, start, end) {
                        self.push_wf(op, effects);
                    }
                }
            }
            WaveformEvent::RegionClicked { id } => {
                if let Some(segment_id) = regions::segment_id_of(&id) {
                    self.selected = Some(segment_id.to_string());
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Remote outcomes
    // ------------------------------------------------------------------

    fn on_api(&mut self, outcome: ApiOutcome, now: Instant, effects: &mut Vec<Effect>) {
        match outcome.origin {
            ApiOrigin::RefreshSegments { .. } => match outcome.result {
                Ok(ApiPayload::Segments(list)) => {
                    // STALE REJECTION: an older list never overwrites a newer one.
                    if outcome.seq < self.list_applied {
                        info!(seq = outcome.seq, "discarding stale segment list");
                        return;
                    }
                    self.list_applied = outcome.seq;
                    self.apply_segment_list(list, outcome.seq, effects);
                }
                Ok(_) => {}
                Err(err) => effects.push(Effect::Notify(Notice::Error(format!(
                    "Failed to load segments: {}",
                    err.message()
                )))),
            },
            ApiOrigin::CreateSegment {
                project_id,
                region_id,
            } => match outcome.result {
                Ok(ApiPayload::Segment(segment)) => {
                    // Drop the committed pending region; the refresh below
                    // materializes its persisted counterpart. A selection the
                    // user made meanwhile is left alone.
                    if self.regions.pending().map_or(false, |p| p.id == region_id) {
                        for op in self.regions.clear_pending() {
                            self.push_wf(op, effects);
                        }
                    }
                    self.applied.insert(segment.id.clone(), outcome.seq);
                    let inserted = self.integrate_segment(segment, effects);
                    if inserted {
                        self.rebuild_regions(effects);
                    }
                    let seq = self.alloc_seq();
                    effects.push(Effect::Api(ApiRequest::RefreshSegments { project_id, seq }));
                    effects.push(Effect::Notify(Notice::Info("Segment created".to_string())));
                }
                Ok(_) => {}
                Err(err) => {
                    // Pending region stays so the user can retry the commit.
                    effects.push(Effect::Notify(Notice::Error(format!(
                        "Failed to create segment: {}",
                        err.message()
                    ))));
                }
            },
            ApiOrigin::DeleteSegment { segment_id } => match outcome.result {
                Ok(_) => {
                    self.remove_segment(&segment_id, effects);
                    effects.push(Effect::Notify(Notice::Info("Segment deleted".to_string())));
                }
                Err(err) => effects.push(Effect::Notify(Notice::Error(format!(
                    "Failed to delete segment: {}",
                    err.message()
                )))),
            },
            ApiOrigin::Stage { segment_id, stage } => {
                if let Some(&(inflight_seq, _)) = self.stage_inflight.get(&segment_id) {
                    if inflight_seq == outcome.seq {
                        self.stage_inflight.remove(&segment_id);
                    }
                }
                // Resolve the request's guards even when the outcome itself
                // is stale; only segment state is protected from regression.
                let ok = outcome.result.is_ok();
                self.pipeline.stage_resolved(&segment_id, stage, ok);
                if self.is_stale(&segment_id, outcome.seq) {
                    return;
                }
                self.applied.insert(segment_id.clone(), outcome.seq);
                match outcome.result {
                    Ok(ApiPayload::Segment(segment)) => {
                        let inserted = self.integrate_segment(segment, effects);
                        if inserted {
                            self.rebuild_regions(effects);
                        }
                    }
                    Ok(_) => {}
                    Err(err) => self.mark_stage_error(&segment_id, stage, &err, effects),
                }
            }
            ApiOrigin::SaveTranslation { segment_id } => {
                if self.is_stale(&segment_id, outcome.seq) {
                    return;
                }
                match outcome.result {
                    Ok(ApiPayload::Segment(segment)) => {
                        self.applied.insert(segment_id.clone(), outcome.seq);
                        // Saved: the overlay no longer shadows server state.
                        self.overlay.clear_translation(&segment_id);
                        self.integrate_segment(segment, effects);
                        effects
                            .push(Effect::Notify(Notice::Info("Translation saved".to_string())));
                    }
                    Ok(_) => {}
                    Err(err) => effects.push(Effect::Notify(Notice::Error(format!(
                        "Failed to save translation: {}",
                        err.message()
                    )))),
                }
            }
            ApiOrigin::SaveAnalysis { segment_id, patch } => {
                if self.is_stale(&segment_id, outcome.seq) {
                    return;
                }
                match outcome.result {
                    Ok(ApiPayload::Segment(segment)) => {
                        self.applied.insert(segment_id.clone(), outcome.seq);
                        self.overlay.clear_analysis(&segment_id);
                        self.integrate_segment(segment, effects);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        // Re-queue the patch; edits made meanwhile win.
                        self.autosave.restore(&segment_id, patch, now);
                        effects.push(Effect::Notify(Notice::Error(format!(
                            "Failed to save analysis: {}",
                            err.message()
                        ))));
                    }
                }
            }
        }
    }

    fn is_stale(&self, segment_id: &str, seq: u64) -> bool {
        let last = self.applied.get(segment_id).copied().unwrap_or(0);
        if seq < last {
            info!(segment_id, seq, last, "discarding stale segment response");
            true
        } else {
            false
        }
    }

    /// A stage call failed: drive the segment to `error` locally, keeping
    /// the server's message when it sent one.
    fn mark_stage_error(
        &mut self,
        segment_id: &str,
        stage: Stage,
        err: &ApiError,
        effects: &mut Vec<Effect>,
    ) {
        if let Some(segment) = self.segments.iter_mut().find(|s| s.id == segment_id) {
            segment.status = SegmentStatus::Error;
            segment.error_message = Some(match err {
                ApiError::Status { message, .. } => message.clone(),
                ApiError::Network(_) => "Processing request failed".to_string(),
            });
        }
        // Error is an authoritative state: stale draft buffers go away.
        self.overlay.clear(segment_id);
        self.autosave.cancel(segment_id);
        effects.push(Effect::Notify(Notice::Error(format!(
            "Failed to {}: {}",
            stage.label(),
            err.message()
        ))));
    }

    /// Fold one full segment record into local state: draft clearing on
    /// authoritative transitions, derived-audio fetch planning, and the
    /// pipeline auto-advance decision.
    fn integrate_segment(&mut self, incoming: Segment, effects: &mut Vec<Effect>) -> bool {
        let prev_status = self
            .segments
            .iter()
            .find(|s| s.id == incoming.id)
            .map(|s| s.status);
        let transitioned = prev_status != Some(incoming.status);
        if transitioned && incoming.status.clears_drafts() {
            self.overlay.clear(&incoming.id);
            self.autosave.cancel(&incoming.id);
            self.stage_inflight.remove(&incoming.id);
        }

        for kind in [MediaKind::SegmentAudio, MediaKind::TtsResult] {
            if let Some(plan) = self.media.plan(&incoming, kind) {
                let seq = self.alloc_seq();
                self.media.note_issued(&incoming, &plan, seq);
                effects.push(Effect::FetchMedia {
                    segment_id: incoming.id.clone(),
                    kind: plan.kind,
                    filename: plan.filename,
                    seq,
                });
            }
        }

        if let Some(stage) = self.pipeline.observe(&incoming) {
            self.issue_stage(&incoming, stage, None, true, effects);
        }

        let inserted = match self.segments.iter_mut().find(|s| s.id == incoming.id) {
            Some(slot) => {
                *slot = incoming;
                false
            }
            None => {
                self.segments.push(incoming);
                true
            }
        };
        self.sort_segments();
        inserted
    }

    /// Replace local state with a refreshed list, without regressing
    /// segments whose newer per-segment response already applied.
    fn apply_segment_list(&mut self, list: Vec<Segment>, list_seq: u64, effects: &mut Vec<Effect>) {
        let incoming_ids: std::collections::HashSet<&str> =
            list.iter().map(|s| s.id.as_str()).collect();
        let removed: Vec<String> = self
            .segments
            .iter()
            .filter(|s| {
                !incoming_ids.contains(s.id.as_str())
                    && self.applied.get(&s.id).copied().unwrap_or(0) <= list_seq
            })
            .map(|s| s.id.clone())
            .collect();
        for segment_id in removed {
            self.cleanup_segment_state(&segment_id);
            self.segments.retain(|s| s.id != segment_id);
        }

        for incoming in list {
            if self.applied.get(&incoming.id).copied().unwrap_or(0) > list_seq {
                // A newer stage response already reconciled this segment.
                continue;
            }
            self.integrate_segment(incoming, effects);
        }
        self.rebuild_regions(effects);
    }

    fn remove_segment(&mut self, segment_id: &str, effects: &mut Vec<Effect>) {
        self.cleanup_segment_state(segment_id);
        self.segments.retain(|s| s.id != segment_id);
        self.rebuild_regions(effects);
    }

    /// Everything a segment owns besides its list entry and region: media
    /// handles, drafts, debounce timer, pipeline guards, request tracking.
    fn cleanup_segment_state(&mut self, segment_id: &str) {
        self.media.release_segment(segment_id);
        self.overlay.clear(segment_id);
        self.autosave.cancel(segment_id);
        self.pipeline.forget(segment_id);
        self.stage_inflight.remove(segment_id);
        self.applied.remove(segment_id);
        self.last_tts.remove(segment_id);
        if self.selected.as_deref() == Some(segment_id) {
            self.selected = None;
        }
    }

    fn on_media(&mut self, outcome: MediaOutcome) {
        match outcome.result {
            Ok(bytes) => {
                self.media.store(
                    &outcome.segment_id,
                    outcome.kind,
                    outcome.seq,
                    MediaHandle {
                        filename: outcome.filename,
                        bytes,
                    },
                );
            }
            Err(err) => {
                // Non-fatal: absence of playback never blocks the pipeline.
                debug!(segment_id = %outcome.segment_id, error = %err, "media fetch failed");
            }
        }
    }

    // ------------------------------------------------------------------
    // Driver
    // ------------------------------------------------------------------

    /// Async driver loop: drain events on a fixed cadence, step, execute
    /// effects. Remote calls run in spawned tasks and re-enter as events.
    pub async fn run<B: WaveformBackend>(
        &mut self,
        client: ApiClient,
        backend: &mut B,
        cancel: CancellationToken,
        tick: Duration,
    ) {
        info!("editor loop started");
        let mut cadence = interval(tick);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {}
            }
            let mut events = Vec::new();
            while let Ok(event) = self.receiver.try_recv() {
                events.push(event);
            }
            let effects = self.step(events, Instant::now());
            for effect in effects {
                self.execute(effect, &client, backend, &cancel);
            }
        }
        self.teardown();
        info!("editor loop stopped");
    }

    fn execute<B: WaveformBackend>(
        &self,
        effect: Effect,
        client: &ApiClient,
        backend: &mut B,
        cancel: &CancellationToken,
    ) {
        match effect {
            Effect::Waveform(op) => backend.apply(op),
            Effect::Api(request) => {
                let client = client.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let outcome = client.execute(request).await;
                    let _ = tx.send(EditorEvent::Api(outcome)).await;
                });
            }
            Effect::FetchMedia {
                segment_id,
                kind,
                filename,
                seq,
            } => {
                let Some(project_id) = self.project_id.clone() else {
                    return;
                };
                let client = client.clone();
                let tx = self.tx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    let result = client
                        .fetch_media(&project_id, kind.category(), &filename)
                        .await;
                    if cancel.is_cancelled() {
                        // Abandoned context: discard instead of storing.
                        return;
                    }
                    let _ = tx
                        .send(EditorEvent::Media(MediaOutcome {
                            segment_id,
                            kind,
                            filename,
                            seq,
                            result,
                        }))
                        .await;
                });
            }
            Effect::Notify(notice) => match notice {
                Notice::Info(message) => info!("{message}"),
                Notice::Error(message) => warn!("{message}"),
            },
        }
    }

    /// Teardown: cancel debounce timers and release every media handle.
    pub fn teardown(&mut self) {
        self.autosave.cancel_all();
        self.media.release_all();
    }
}
