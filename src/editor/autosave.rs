use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::segment::{AnalysisField, AnalysisPatch, AnalysisValue};

/// Quiet period after the last field edit before the patch is flushed.
pub const DEBOUNCE: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct PendingSave {
    patch: AnalysisPatch,
    deadline: Instant,
}

/// Debounce buffer for analysis field edits. Rapid edits within the window
/// coalesce into one patch carrying the most recent value of every touched
/// field; each edit pushes the deadline out again.
#[derive(Debug, Default)]
pub struct AutosaveBuffer {
    pending: HashMap<String, PendingSave>,
}

impl AutosaveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        segment_id: &str,
        field: AnalysisField,
        value: AnalysisValue,
        now: Instant,
    ) {
        let entry = self
            .pending
            .entry(segment_id.to_string())
            .or_insert_with(|| PendingSave {
                patch: AnalysisPatch::default(),
                deadline: now + DEBOUNCE,
            });
        entry.patch.set(field, value);
        entry.deadline = now + DEBOUNCE;
    }

    /// Take every patch whose quiet period has elapsed.
    pub fn drain_due(&mut self, now: Instant) -> Vec<(String, AnalysisPatch)> {
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, save)| save.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        due.into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|save| (id, save.patch)))
            .collect()
    }

    /// Put the patch of a failed save back so the next flush retries it.
    /// Edits made while the save was in flight win over restored fields.
    pub fn restore(&mut self, segment_id: &str, patch: AnalysisPatch, now: Instant) {
        match self.pending.get_mut(segment_id) {
            Some(save) => {
                let newer = std::mem::take(&mut save.patch);
                save.patch = patch;
                save.patch.merge(newer);
            }
            None => {
                self.pending.insert(
                    segment_id.to_string(),
                    PendingSave {
                        patch,
                        deadline: now + DEBOUNCE,
                    },
                );
            }
        }
    }

    /// Teardown path: segment deleted or view unmounted.
    pub fn cancel(&mut self, segment_id: &str) {
        self.pending.remove(segment_id);
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_armed(&self, segment_id: &str) -> bool {
        self.pending.contains_key(segment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_within_window_coalesce() {
        let t0 = Instant::now();
        let mut buffer = AutosaveBuffer::new();
        buffer.record("s1", AnalysisField::Tone, AnalysisValue::Text("a".into()), t0);
        buffer.record(
            "s1",
            AnalysisField::Tone,
            AnalysisValue::Text("b".into()),
            t0 + Duration::from_millis(300),
        );
        buffer.record(
            "s1",
            AnalysisField::Pace,
            AnalysisValue::Text("slow".into()),
            t0 + Duration::from_millis(600),
        );

        // Deadline slides with each edit: nothing due 1s after the first edit.
        assert!(buffer.drain_due(t0 + Duration::from_millis(1100)).is_empty());

        let due = buffer.drain_due(t0 + Duration::from_millis(1601));
        assert_eq!(due.len(), 1);
        let (id, patch) = &due[0];
        assert_eq!(id, "s1");
        assert_eq!(patch.tone.as_deref(), Some("b"));
        assert_eq!(patch.pace.as_deref(), Some("slow"));
        assert!(!buffer.is_armed("s1"));
    }

    #[test]
    fn restore_merges_under_newer_edits() {
        let t0 = Instant::now();
        let mut buffer = AutosaveBuffer::new();
        let mut failed = AnalysisPatch::default();
        failed.set(AnalysisField::Tone, AnalysisValue::Text("calm".into()));
        failed.set(AnalysisField::Pace, AnalysisValue::Text("slow".into()));

        // An edit made while the save was in flight wins over the restored field.
        buffer.record("s1", AnalysisField::Tone, AnalysisValue::Text("urgent".into()), t0);
        buffer.restore("s1", failed.clone(), t0);
        let due = buffer.drain_due(t0 + Duration::from_secs(2));
        assert_eq!(due[0].1.tone.as_deref(), Some("urgent"));
        assert_eq!(due[0].1.pace.as_deref(), Some("slow"));

        // With nothing pending, restore re-arms the window as-is.
        buffer.restore("s1", failed, t0 + Duration::from_secs(3));
        assert!(buffer
            .drain_due(t0 + Duration::from_millis(3500))
            .is_empty());
        let due = buffer.drain_due(t0 + Duration::from_millis(4100));
        assert_eq!(due[0].1.tone.as_deref(), Some("calm"));
    }

    #[test]
    fn cancel_discards_pending_save() {
        let t0 = Instant::now();
        let mut buffer = AutosaveBuffer::new();
        buffer.record("s1", AnalysisField::Tone, AnalysisValue::Text("a".into()), t0);
        buffer.cancel("s1");
        assert!(buffer.drain_due(t0 + Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn segments_debounce_independently() {
        let t0 = Instant::now();
        let mut buffer = AutosaveBuffer::new();
        buffer.record("s1", AnalysisField::Tone, AnalysisValue::Text("a".into()), t0);
        buffer.record(
            "s2",
            AnalysisField::Tone,
            AnalysisValue::Text("z".into()),
            t0 + Duration::from_millis(900),
        );
        let due = buffer.drain_due(t0 + Duration::from_millis(1500));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0, "s1");
        assert!(buffer.is_armed("s2"));
    }
}
