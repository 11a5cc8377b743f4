use crate::waveform::engine::{RegionColor, WaveformOp};

use super::segment::Segment;

/// Persisted region ids are namespaced so drag-created pending regions can
/// never collide with them.
pub const PERSISTED_PREFIX: &str = "segment-";

pub fn persisted_region_id(segment_id: &str) -> String {
    format!("{PERSISTED_PREFIX}{segment_id}")
}

pub fn segment_id_of(region_id: &str) -> Option<&str> {
    region_id.strip_prefix(PERSISTED_PREFIX)
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegionKind {
    /// Uncommitted user selection. At most one exists.
    Pending,
    /// Derived from a segment record; immutable geometry.
    Persisted(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionEntry {
    pub id: String,
    pub start: f64,
    pub end: f64,
    pub kind: RegionKind,
    pub color: RegionColor,
}

/// Single writer of region geometry. Persisted regions are regenerated
/// wholesale from the segment list; the pending region lives independently
/// of it. Every mutation returns the waveform ops needed to keep the
/// rendering backend in step.
#[derive(Debug)]
pub struct RegionStore {
    pending: Option<RegionEntry>,
    persisted: Vec<RegionEntry>,
    show_all: bool,
    hovered: Option<String>,
}

impl Default for RegionStore {
    fn default() -> Self {
        Self {
            pending: None,
            persisted: Vec::new(),
            show_all: true,
            hovered: None,
        }
    }
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&RegionEntry> {
        self.pending.as_ref()
    }

    pub fn persisted(&self) -> &[RegionEntry] {
        &self.persisted
    }

    pub fn show_all(&self) -> bool {
        self.show_all
    }

    fn color_for(&self, segment_id: &str) -> RegionColor {
        if self.hovered.as_deref() == Some(segment_id) {
            RegionColor::Highlighted
        } else if self.show_all {
            RegionColor::Visible
        } else {
            RegionColor::Hidden
        }
    }

    /// Track a drag-created or drag-updated selection. A new pending region
    /// evicts the previous one. The backend already owns the region element
    /// (it came from a drag), so only evictions produce ops.
    pub fn set_pending(&mut self, id: &str, start: f64, end: f64) -> Vec<WaveformOp> {
        let mut ops = Vec::new();
        if let Some(prev) = &self.pending {
            if prev.id != id {
                ops.push(WaveformOp::RemoveRegion {
                    id: prev.id.clone(),
                });
            }
        }
        self.pending = Some(RegionEntry {
            id: id.to_string(),
            start,
            end,
            kind: RegionKind::Pending,
            color: RegionColor::Visible,
        });
        ops
    }

    pub fn clear_pending(&mut self) -> Vec<WaveformOp> {
        match self.pending.take() {
            Some(region) => vec![WaveformOp::RemoveRegion { id: region.id }],
            None => Vec::new(),
        }
    }

    /// Regenerate all persisted regions from the segment list. Geometry is
    /// immutable on the waveform: regions are added non-draggable and
    /// non-resizable.
    pub fn rebuild(&mut self, segments: &[Segment]) -> Vec<WaveformOp> {
        let mut ops: Vec<WaveformOp> = self
            .persisted
            .drain(..)
            .map(|region| WaveformOp::RemoveRegion { id: region.id })
            .collect();

        for segment in segments {
            let color = self.color_for(&segment.id);
            let id = persisted_region_id(&segment.id);
            self.persisted.push(RegionEntry {
                id: id.clone(),
                start: segment.start_time,
                end: segment.end_time,
                kind: RegionKind::Persisted(segment.id.clone()),
                color,
            });
            ops.push(WaveformOp::AddRegion {
                id,
                start: segment.start_time,
                end: segment.end_time,
                color,
                draggable: false,
                resizable: false,
            });
        }
        ops
    }

    pub fn set_show_all(&mut self, show_all: bool) -> Vec<WaveformOp> {
        self.show_all = show_all;
        self.recolor()
    }

    /// Hover state comes from the segment list UI; the hovered segment's
    /// region is highlighted regardless of the show-all toggle.
    pub fn set_hovered(&mut self, segment_id: Option<String>) -> Vec<WaveformOp> {
        self.hovered = segment_id;
        self.recolor()
    }

    fn recolor(&mut self) -> Vec<WaveformOp> {
        let mut ops = Vec::new();
        let show_all = self.show_all;
        let hovered = self.hovered.clone();
        for region in &mut self.persisted {
            let RegionKind::Persisted(segment_id) = &region.kind else {
                continue;
            };
            let color = if hovered.as_deref() == Some(segment_id.as_str()) {
                RegionColor::Highlighted
            } else if show_all {
                RegionColor::Visible
            } else {
                RegionColor::Hidden
            };
            if color != region.color {
                region.color = color;
                ops.push(WaveformOp::SetRegionColor {
                    id: region.id.clone(),
                    color,
                });
            }
        }
        ops
    }
}
