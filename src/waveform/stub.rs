use tracing::debug;

use super::engine::{WaveformBackend, WaveformOp};

/// Backend that records applied ops instead of rendering. Used by the
/// headless binary and by tests asserting on the op stream.
#[derive(Debug, Default)]
pub struct StubWaveform {
    pub applied: Vec<WaveformOp>,
}

impl StubWaveform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region_ids(&self) -> Vec<&str> {
        self.applied
            .iter()
            .filter_map(|op| match op {
                WaveformOp::AddRegion { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl WaveformBackend for StubWaveform {
    fn apply(&mut self, op: WaveformOp) {
        debug!(?op, "waveform op");
        self.applied.push(op);
    }
}
