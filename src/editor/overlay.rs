use std::collections::HashMap;

use super::segment::{AnalysisField, AnalysisPatch, AnalysisValue, Segment};

/// Unsaved local edits shown in place of server state. Drafts are cleared
/// only on successful save or when the server reaches a draft-clearing
/// status for the segment; intermediate refreshes never revert keystrokes.
#[derive(Debug, Default)]
pub struct DraftOverlay {
    translations: HashMap<String, String>,
    analysis: HashMap<String, AnalysisPatch>,
}

impl DraftOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edit_translation(&mut self, segment_id: &str, text: String) {
        self.translations.insert(segment_id.to_string(), text);
    }

    pub fn translation(&self, segment_id: &str) -> Option<&str> {
        self.translations.get(segment_id).map(String::as_str)
    }

    /// The text the user currently sees: draft if present, else server state.
    pub fn effective_translation<'a>(&'a self, segment: &'a Segment) -> Option<&'a str> {
        self.translation(&segment.id)
            .or(segment.translated_text.as_deref())
    }

    pub fn edit_analysis(&mut self, segment_id: &str, field: AnalysisField, value: AnalysisValue) {
        self.analysis
            .entry(segment_id.to_string())
            .or_default()
            .set(field, value);
    }

    pub fn analysis(&self, segment_id: &str) -> Option<&AnalysisPatch> {
        self.analysis.get(segment_id)
    }

    pub fn clear_translation(&mut self, segment_id: &str) {
        self.translations.remove(segment_id);
    }

    pub fn clear_analysis(&mut self, segment_id: &str) {
        self.analysis.remove(segment_id);
    }

    pub fn clear(&mut self, segment_id: &str) {
        self.translations.remove(segment_id);
        self.analysis.remove(segment_id);
    }

    pub fn has_drafts(&self, segment_id: &str) -> bool {
        self.translations.contains_key(segment_id) || self.analysis.contains_key(segment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::segment::SegmentStatus;
    use chrono::Utc;

    fn seg(id: &str, translated: Option<&str>) -> Segment {
        Segment {
            id: id.to_string(),
            project_id: "p1".to_string(),
            start_time: 0.0,
            end_time: 1.0,
            audio_file: None,
            original_transcription: None,
            translated_text: translated.map(str::to_string),
            analysis_json: None,
            tts_voice: None,
            tts_result_file: None,
            status: SegmentStatus::Analyzed,
            error_message: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn draft_shadows_server_text() {
        let mut overlay = DraftOverlay::new();
        let segment = seg("s1", Some("server"));
        assert_eq!(overlay.effective_translation(&segment), Some("server"));
        overlay.edit_translation("s1", "draft".to_string());
        assert_eq!(overlay.effective_translation(&segment), Some("draft"));
        overlay.clear_translation("s1");
        assert_eq!(overlay.effective_translation(&segment), Some("server"));
    }

    #[test]
    fn analysis_edits_accumulate_per_segment() {
        let mut overlay = DraftOverlay::new();
        overlay.edit_analysis("s1", AnalysisField::Tone, AnalysisValue::Text("warm".into()));
        overlay.edit_analysis("s1", AnalysisField::Pace, AnalysisValue::Text("fast".into()));
        let patch = overlay.analysis("s1").unwrap();
        assert_eq!(patch.tone.as_deref(), Some("warm"));
        assert_eq!(patch.pace.as_deref(), Some("fast"));
        assert!(overlay.has_drafts("s1"));
        overlay.clear("s1");
        assert!(!overlay.has_drafts("s1"));
    }
}
