use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::segment::Segment;

/// The two derived audio artifacts a segment can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    SegmentAudio,
    TtsResult,
}

impl MediaKind {
    /// File-service category the artifact is served under.
    pub fn category(&self) -> &'static str {
        match self {
            Self::SegmentAudio => "segments",
            Self::TtsResult => "output",
        }
    }

    fn file_of<'a>(&self, segment: &'a Segment) -> Option<&'a str> {
        match self {
            Self::SegmentAudio => segment.audio_file.as_deref(),
            Self::TtsResult => segment.tts_result_file.as_deref(),
        }
    }
}

/// A locally playable handle over fetched bytes. Dropping it releases the
/// resource; the store guarantees at most one live handle per slot.
#[derive(Debug)]
pub struct MediaHandle {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
struct Slot {
    filename: String,
    updated_at: Option<DateTime<Utc>>,
    /// Seq of the newest fetch issued for this slot. Latest wins.
    latest_seq: u64,
    handle: Option<MediaHandle>,
}

/// A fetch the controller should issue.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPlan {
    pub kind: MediaKind,
    pub filename: String,
}

/// Byte-handle store keyed by (segment id, artifact kind). Replacing a
/// handle drops the previous one first; arrivals for deleted segments or
/// superseded fetches are discarded instead of stored.
#[derive(Debug, Default)]
pub struct MediaStore {
    slots: HashMap<(String, MediaKind), Slot>,
}

/// Artifacts live under "project/segments/file.wav" paths; handles are
/// keyed by bare filename.
pub fn filename_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a reconciled segment against the slot. Returns a plan when
    /// the artifact is new, renamed, or regenerated under the same name
    /// (newer `updated_at`). A vanished artifact releases the slot.
    pub fn plan(&mut self, segment: &Segment, kind: MediaKind) -> Option<FetchPlan> {
        let key = (segment.id.clone(), kind);
        let Some(path) = kind.file_of(segment) else {
            self.slots.remove(&key);
            return None;
        };
        let filename = filename_of(path).to_string();
        let regenerated = match self.slots.get(&key) {
            None => true,
            Some(slot) => {
                slot.filename != filename
                    || match (segment.updated_at, slot.updated_at) {
                        (Some(incoming), Some(known)) => incoming > known,
                        (Some(_), None) => true,
                        _ => false,
                    }
            }
        };
        if !regenerated {
            return None;
        }
        Some(FetchPlan { kind, filename })
    }

    /// Record that a fetch with `seq` was issued for this slot. The previous
    /// handle stays playable until the replacement arrives.
    pub fn note_issued(&mut self, segment: &Segment, plan: &FetchPlan, seq: u64) {
        let key = (segment.id.clone(), plan.kind);
        let prior_handle = self.slots.remove(&key).and_then(|slot| slot.handle);
        self.slots.insert(
            key,
            Slot {
                filename: plan.filename.clone(),
                updated_at: segment.updated_at,
                latest_seq: seq,
                handle: prior_handle,
            },
        );
    }

    /// Store fetched bytes. Returns false when the arrival is discarded:
    /// the segment was torn down, or a newer fetch for the slot was issued.
    pub fn store(&mut self, segment_id: &str, kind: MediaKind, seq: u64, handle: MediaHandle) -> bool {
        let key = (segment_id.to_string(), kind);
        match self.slots.get_mut(&key) {
            None => {
                debug!(segment_id, "discarding media bytes for torn-down segment");
                false
            }
            Some(slot) if seq < slot.latest_seq => {
                debug!(segment_id, seq, latest = slot.latest_seq, "discarding stale media fetch");
                false
            }
            Some(slot) => {
                // Release the previous handle before storing the new one.
                slot.handle = Some(handle);
                true
            }
        }
    }

    pub fn handle(&self, segment_id: &str, kind: MediaKind) -> Option<&MediaHandle> {
        self.slots
            .get(&(segment_id.to_string(), kind))
            .and_then(|slot| slot.handle.as_ref())
    }

    /// Segment deleted: release every handle it owns.
    pub fn release_segment(&mut self, segment_id: &str) {
        self.slots.retain(|(id, _), _| id != segment_id);
    }

    /// Controller teardown: release everything.
    pub fn release_all(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::segment::SegmentStatus;
    use chrono::{Duration as ChronoDuration, Utc};

    fn seg(id: &str, audio: Option<&str>, updated: Option<DateTime<Utc>>) -> Segment {
        Segment {
            id: id.to_string(),
            project_id: "p1".to_string(),
            start_time: 0.0,
            end_time: 1.0,
            audio_file: audio.map(str::to_string),
            original_transcription: None,
            translated_text: None,
            analysis_json: None,
            tts_voice: None,
            tts_result_file: None,
            status: SegmentStatus::Extracted,
            error_message: None,
            created_at: Utc::now(),
            updated_at: updated,
        }
    }

    #[test]
    fn plans_fetch_once_per_artifact() {
        let mut store = MediaStore::new();
        let s = seg("s1", Some("p1/segments/s1.wav"), None);
        let plan = store.plan(&s, MediaKind::SegmentAudio).unwrap();
        assert_eq!(plan.filename, "s1.wav");
        store.note_issued(&s, &plan, 1);
        // Same artifact observed again: nothing to do.
        assert_eq!(store.plan(&s, MediaKind::SegmentAudio), None);
    }

    #[test]
    fn regeneration_under_same_name_refetches() {
        let mut store = MediaStore::new();
        let t1 = Utc::now();
        let s = seg("s1", Some("p1/segments/s1.wav"), Some(t1));
        let plan = store.plan(&s, MediaKind::SegmentAudio).unwrap();
        store.note_issued(&s, &plan, 1);

        let s2 = seg("s1", Some("p1/segments/s1.wav"), Some(t1 + ChronoDuration::seconds(5)));
        assert!(store.plan(&s2, MediaKind::SegmentAudio).is_some());
    }

    #[test]
    fn latest_fetch_wins() {
        let mut store = MediaStore::new();
        let s = seg("s1", Some("p1/segments/s1.wav"), None);
        let plan = store.plan(&s, MediaKind::SegmentAudio).unwrap();
        store.note_issued(&s, &plan, 1);
        store.note_issued(&s, &plan, 2);

        // The older fetch lands after the newer one was issued: discard.
        assert!(!store.store(
            "s1",
            MediaKind::SegmentAudio,
            1,
            MediaHandle { filename: "s1.wav".into(), bytes: vec![1] }
        ));
        assert!(store.store(
            "s1",
            MediaKind::SegmentAudio,
            2,
            MediaHandle { filename: "s1.wav".into(), bytes: vec![2] }
        ));
        assert_eq!(store.handle("s1", MediaKind::SegmentAudio).unwrap().bytes, vec![2]);
    }

    #[test]
    fn deletion_releases_and_blocks_late_arrivals() {
        let mut store = MediaStore::new();
        let s = seg("s1", Some("p1/segments/s1.wav"), None);
        let plan = store.plan(&s, MediaKind::SegmentAudio).unwrap();
        store.note_issued(&s, &plan, 1);
        store.release_segment("s1");

        assert!(!store.store(
            "s1",
            MediaKind::SegmentAudio,
            1,
            MediaHandle { filename: "s1.wav".into(), bytes: vec![9] }
        ));
        assert!(store.handle("s1", MediaKind::SegmentAudio).is_none());
    }

    #[test]
    fn vanished_artifact_releases_slot() {
        let mut store = MediaStore::new();
        let s = seg("s1", Some("p1/segments/s1.wav"), None);
        let plan = store.plan(&s, MediaKind::SegmentAudio).unwrap();
        store.note_issued(&s, &plan, 1);
        store.store(
            "s1",
            MediaKind::SegmentAudio,
            1,
            MediaHandle { filename: "s1.wav".into(), bytes: vec![1] },
        );

        let gone = seg("s1", None, None);
        assert_eq!(store.plan(&gone, MediaKind::SegmentAudio), None);
        assert!(store.handle("s1", MediaKind::SegmentAudio).is_none());
    }
}
