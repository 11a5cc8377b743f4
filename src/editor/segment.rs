use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-segment pipeline status, mirroring the processing service's enum.
/// Forward order: created -> extracting -> extracted -> analyzing ->
/// analyzed -> generating_tts -> completed. `error` is reachable from any
/// in-flight stage and is the only backward transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Created,
    Extracting,
    Extracted,
    Analyzing,
    Analyzed,
    GeneratingTts,
    Completed,
    Error,
}

impl SegmentStatus {
    /// Statuses whose arrival authoritatively supersedes local draft
    /// buffers. Intermediate statuses never clobber unsaved edits.
    pub fn clears_drafts(&self) -> bool {
        matches!(self, Self::Analyzed | Self::Completed | Self::Error)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Extracting => "extracting",
            Self::Extracted => "extracted",
            Self::Analyzing => "analyzing",
            Self::Analyzed => "analyzed",
            Self::GeneratingTts => "generating tts",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// Full segment record as returned by the service. Every stage endpoint
/// returns the whole record so reconciliation is a single replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub project_id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub audio_file: Option<String>,
    pub original_transcription: Option<String>,
    pub translated_text: Option<String>,
    pub analysis_json: Option<AnalysisResult>,
    pub tts_voice: Option<String>,
    pub tts_result_file: Option<String>,
    pub status: SegmentStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Segment {
    pub fn time_range_label(&self) -> String {
        format!(
            "{} - {}",
            format_timestamp(self.start_time),
            format_timestamp(self.end_time)
        )
    }
}

/// Voice delivery analysis produced by the AI stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub translated_text: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub pace: Option<String>,
    #[serde(default)]
    pub intonation: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub tempo: Option<String>,
    #[serde(default)]
    pub emphasis: Vec<String>,
    #[serde(default)]
    pub pause_before: Vec<String>,
}

/// One editable analysis field, as addressed by the command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisField {
    Tone,
    Emotion,
    Style,
    Pace,
    Intonation,
    Voice,
    Tempo,
    Emphasis,
    PauseBefore,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisValue {
    Text(String),
    List(Vec<String>),
}

/// Partial analysis update. Only populated fields are serialized, so a
/// coalesced autosave carries exactly the fields the user touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intonation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emphasis: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_before: Option<Vec<String>>,
}

impl AnalysisPatch {
    pub fn is_empty(&self) -> bool {
        self.tone.is_none()
            && self.emotion.is_none()
            && self.style.is_none()
            && self.pace.is_none()
            && self.intonation.is_none()
            && self.voice.is_none()
            && self.tempo.is_none()
            && self.emphasis.is_none()
            && self.pause_before.is_none()
    }

    /// Set one field. Mismatched value shapes (a list for a text field or
    /// vice versa) are dropped rather than coerced.
    pub fn set(&mut self, field: AnalysisField, value: AnalysisValue) {
        match (field, value) {
            (AnalysisField::Tone, AnalysisValue::Text(v)) => self.tone = Some(v),
            (AnalysisField::Emotion, AnalysisValue::Text(v)) => self.emotion = Some(v),
            (AnalysisField::Style, AnalysisValue::Text(v)) => self.style = Some(v),
            (AnalysisField::Pace, AnalysisValue::Text(v)) => self.pace = Some(v),
            (AnalysisField::Intonation, AnalysisValue::Text(v)) => self.intonation = Some(v),
            (AnalysisField::Voice, AnalysisValue::Text(v)) => self.voice = Some(v),
            (AnalysisField::Tempo, AnalysisValue::Text(v)) => self.tempo = Some(v),
            (AnalysisField::Emphasis, AnalysisValue::List(v)) => self.emphasis = Some(v),
            (AnalysisField::PauseBefore, AnalysisValue::List(v)) => self.pause_before = Some(v),
            _ => {}
        }
    }

    /// Merge a newer patch over this one; newer fields win.
    pub fn merge(&mut self, newer: AnalysisPatch) {
        macro_rules! take {
            ($f:ident) => {
                if newer.$f.is_some() {
                    self.$f = newer.$f;
                }
            };
        }
        take!(tone);
        take!(emotion);
        take!(style);
        take!(pace);
        take!(intonation);
        take!(voice);
        take!(tempo);
        take!(emphasis);
        take!(pause_before);
    }
}

/// Request body for the TTS stage. Delivery fields ride along so the
/// service can render spoken-style instructions; draft edits win over the
/// stored analysis when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TtsOptions {
    pub voice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intonation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emphasis: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_before: Option<Vec<String>>,
}

impl TtsOptions {
    pub fn build(
        voice: &str,
        analysis: Option<&AnalysisResult>,
        draft: Option<&AnalysisPatch>,
    ) -> Self {
        let pick = |d: Option<&String>, a: Option<&String>| d.or(a).cloned();
        let draft = draft.cloned().unwrap_or_default();
        let base = analysis.cloned().unwrap_or_default();
        Self {
            voice: voice.to_string(),
            target_language: None,
            tone: pick(draft.tone.as_ref(), base.tone.as_ref()),
            emotion: pick(draft.emotion.as_ref(), base.emotion.as_ref()),
            style: pick(draft.style.as_ref(), base.style.as_ref()),
            pace: pick(draft.pace.as_ref(), base.pace.as_ref()),
            intonation: pick(draft.intonation.as_ref(), base.intonation.as_ref()),
            tempo: pick(draft.tempo.as_ref(), base.tempo.as_ref()),
            emphasis: draft.emphasis.or(if base.emphasis.is_empty() {
                None
            } else {
                Some(base.emphasis)
            }),
            pause_before: draft.pause_before.or(if base.pause_before.is_empty() {
                None
            } else {
                Some(base.pause_before)
            }),
        }
    }
}

impl TtsOptions {
    /// Render the delivery fields into a spoken-style instruction string
    /// for the synthesis service. None when no field is set.
    pub fn instructions(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        let fields = [
            ("Tone", &self.tone),
            ("Emotion", &self.emotion),
            ("Style", &self.style),
            ("Pace", &self.pace),
            ("Intonation", &self.intonation),
            ("Tempo", &self.tempo),
        ];
        for (label, value) in fields {
            if let Some(v) = value {
                if !v.trim().is_empty() {
                    parts.push(format!("{label}: {v}"));
                }
            }
        }
        if let Some(words) = &self.emphasis {
            if !words.is_empty() {
                parts.push(format!("Emphasize: {}", words.join(", ")));
            }
        }
        if let Some(words) = &self.pause_before {
            if !words.is_empty() {
                parts.push(format!("Pause before: {}", words.join(", ")));
            }
        }
        if let Some(lang) = &self.target_language {
            if !lang.trim().is_empty() {
                parts.push(format!("Speak in {lang}"));
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(". "))
        }
    }
}

/// Built-in service voices. `custom:` prefixed ids are user voices and pass
/// validation unchanged.
pub const TTS_VOICES: &[&str] = &[
    "alloy", "ash", "ballad", "cedar", "coral", "echo", "fable", "marin", "nova", "onyx", "sage",
    "shimmer", "verse",
];

pub const DEFAULT_TTS_VOICE: &str = "alloy";

pub fn is_valid_voice(voice: &str) -> bool {
    voice.starts_with("custom:") || TTS_VOICES.contains(&voice)
}

/// MM:SS.ss, matching the transport display ("02:05.50"). Rounded to
/// centiseconds before splitting so 59.999 carries into the minutes.
pub fn format_timestamp(seconds: f64) -> String {
    let centis = (seconds * 100.0).round() as u64;
    let mins = centis / 6000;
    let secs = (centis % 6000) as f64 / 100.0;
    format!("{:02}:{:05.2}", mins, secs)
}
