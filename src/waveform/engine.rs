/// Zoom bounds in pixels per second.
pub const MIN_ZOOM: f64 = 10.0;
pub const MAX_ZOOM: f64 = 500.0;

/// Region overlay opacity state. Hidden regions stay present at zero
/// opacity so click targets remain stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionColor {
    Hidden,
    Visible,
    Highlighted,
}

impl RegionColor {
    pub fn rgba(&self) -> &'static str {
        match self {
            Self::Hidden => "rgba(59, 130, 246, 0)",
            Self::Visible => "rgba(59, 130, 246, 0.3)",
            Self::Highlighted => "rgba(59, 130, 246, 0.6)",
        }
    }
}

/// Operations a rendering/playback backend must support.
#[derive(Debug, Clone, PartialEq)]
pub enum WaveformOp {
    Load { source: String },
    Play,
    Pause,
    Seek { seconds: f64 },
    Zoom { px_per_sec: f64 },
    AddRegion {
        id: String,
        start: f64,
        end: f64,
        color: RegionColor,
        draggable: bool,
        resizable: bool,
    },
    RemoveRegion { id: String },
    ClearRegions,
    SetRegionColor { id: String, color: RegionColor },
}

/// Events a backend emits back into the editor loop.
#[derive(Debug, Clone, PartialEq)]
pub enum WaveformEvent {
    /// Fires once per successful load. A backend that fails to decode never
    /// reports ready; there is no guaranteed error event.
    Ready { duration: f64 },
    Play,
    Pause,
    TimeUpdate { seconds: f64 },
    /// Drag-select on empty waveform space created a region.
    RegionCreated { id: String, start: f64, end: f64 },
    /// Fires continuously while a region handle is dragged.
    RegionUpdated { id: String, start: f64, end: f64 },
    RegionClicked { id: String },
}

/// The rendering/playback primitive, swappable behind this seam.
pub trait WaveformBackend {
    fn apply(&mut self, op: WaveformOp);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub is_ready: bool,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub zoom_level: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_ready: false,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            zoom_level: 50.0,
        }
    }
}

/// Wraps a backend's op stream: owns the playback state, gates every op
/// except `Load` on readiness, clamps zoom, and makes seek a no-op while
/// duration is unknown. The backend itself never sees an invalid op.
#[derive(Debug, Default)]
pub struct WaveformEngine {
    state: PlaybackState,
    source: Option<String>,
}

impl WaveformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Validate an op against the current state. Returns the ops to forward
    /// to the backend (possibly none, possibly rewritten).
    pub fn prepare(&mut self, op: WaveformOp) -> Vec<WaveformOp> {
        match op {
            WaveformOp::Load { source } => {
                // Idempotent per source: reloading the live session is a no-op.
                if self.state.is_ready && self.source.as_deref() == Some(source.as_str()) {
                    return Vec::new();
                }
                self.source = Some(source.clone());
                self.state = PlaybackState {
                    zoom_level: self.state.zoom_level,
                    ..PlaybackState::default()
                };
                vec![WaveformOp::ClearRegions, WaveformOp::Load { source }]
            }
            WaveformOp::Zoom { px_per_sec } => {
                let clamped = px_per_sec.clamp(MIN_ZOOM, MAX_ZOOM);
                self.state.zoom_level = clamped;
                if self.state.is_ready {
                    vec![WaveformOp::Zoom { px_per_sec: clamped }]
                } else {
                    Vec::new()
                }
            }
            WaveformOp::Seek { seconds } => {
                if self.state.is_ready && self.state.duration > 0.0 {
                    vec![WaveformOp::Seek {
                        seconds: seconds.clamp(0.0, self.state.duration),
                    }]
                } else {
                    Vec::new()
                }
            }
            other => {
                if self.state.is_ready {
                    vec![other]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Fold a backend event into the playback state.
    pub fn observe(&mut self, event: &WaveformEvent) {
        match event {
            WaveformEvent::Ready { duration } => {
                self.state.is_ready = true;
                self.state.duration = *duration;
            }
            WaveformEvent::Play => self.state.is_playing = true,
            WaveformEvent::Pause => self.state.is_playing = false,
            WaveformEvent::TimeUpdate { seconds } => self.state.current_time = *seconds,
            _ => {}
        }
    }

    /// Transport toggle, resolved against the live play state.
    pub fn play_pause_op(&self) -> Option<WaveformOp> {
        if !self.state.is_ready {
            return None;
        }
        Some(if self.state.is_playing {
            WaveformOp::Pause
        } else {
            WaveformOp::Play
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_are_gated_until_ready() {
        let mut engine = WaveformEngine::new();
        assert!(engine.prepare(WaveformOp::Play).is_empty());
        assert!(engine.prepare(WaveformOp::Seek { seconds: 3.0 }).is_empty());
        engine.observe(&WaveformEvent::Ready { duration: 10.0 });
        assert_eq!(engine.prepare(WaveformOp::Play), vec![WaveformOp::Play]);
    }

    #[test]
    fn seek_noop_while_duration_zero() {
        let mut engine = WaveformEngine::new();
        engine.observe(&WaveformEvent::Ready { duration: 0.0 });
        assert!(engine.prepare(WaveformOp::Seek { seconds: 1.0 }).is_empty());
    }

    #[test]
    fn seek_clamps_to_duration() {
        let mut engine = WaveformEngine::new();
        engine.observe(&WaveformEvent::Ready { duration: 10.0 });
        assert_eq!(
            engine.prepare(WaveformOp::Seek { seconds: 99.0 }),
            vec![WaveformOp::Seek { seconds: 10.0 }]
        );
    }

    #[test]
    fn zoom_clamps_and_survives_reload() {
        let mut engine = WaveformEngine::new();
        engine.observe(&WaveformEvent::Ready { duration: 10.0 });
        assert_eq!(
            engine.prepare(WaveformOp::Zoom { px_per_sec: 9000.0 }),
            vec![WaveformOp::Zoom { px_per_sec: MAX_ZOOM }]
        );
        let ops = engine.prepare(WaveformOp::Load {
            source: "a.wav".into(),
        });
        assert_eq!(ops[0], WaveformOp::ClearRegions);
        assert_eq!(engine.state().zoom_level, MAX_ZOOM);
        assert!(!engine.state().is_ready);
    }

    #[test]
    fn reloading_same_ready_source_is_noop() {
        let mut engine = WaveformEngine::new();
        engine.prepare(WaveformOp::Load {
            source: "a.wav".into(),
        });
        engine.observe(&WaveformEvent::Ready { duration: 10.0 });
        assert!(engine
            .prepare(WaveformOp::Load {
                source: "a.wav".into()
            })
            .is_empty());
        // A different source replaces the session.
        assert!(!engine
            .prepare(WaveformOp::Load {
                source: "b.wav".into()
            })
            .is_empty());
    }

    #[test]
    fn play_pause_resolves_against_state() {
        let mut engine = WaveformEngine::new();
        assert_eq!(engine.play_pause_op(), None);
        engine.observe(&WaveformEvent::Ready { duration: 5.0 });
        assert_eq!(engine.play_pause_op(), Some(WaveformOp::Play));
        engine.observe(&WaveformEvent::Play);
        assert_eq!(engine.play_pause_op(), Some(WaveformOp::Pause));
    }
}
