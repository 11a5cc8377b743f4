mod common;

use std::time::Instant;

use common::*;
use dubwave::editor::controller::{Effect, EditorController};
use dubwave::editor::event::{ApiOrigin, ApiOutcome, ApiPayload, EditorEvent, UserCommand};
use dubwave::editor::segment::SegmentStatus;
use dubwave::waveform::engine::{RegionColor, WaveformBackend, WaveformEvent, WaveformOp};
use dubwave::waveform::stub::StubWaveform;

fn now() -> Instant {
    Instant::now()
}

fn apply(effects: Vec<Effect>, backend: &mut StubWaveform) {
    for effect in effects {
        if let Effect::Waveform(op) = effect {
            backend.apply(op);
        }
    }
}

fn seed(c: &mut EditorController, backend: &mut StubWaveform) {
    let list_seq = open(c);
    apply(
        c.step(
            vec![EditorEvent::Waveform(WaveformEvent::Ready { duration: 60.0 })],
            now(),
        ),
        backend,
    );
    apply(
        c.step(
            vec![EditorEvent::Api(ApiOutcome {
                seq: list_seq,
                origin: ApiOrigin::RefreshSegments {
                    project_id: "p1".to_string(),
                },
                result: Ok(ApiPayload::Segments(vec![
                    seg_at("a", SegmentStatus::Created, 1.0, 2.0),
                    seg_at("b", SegmentStatus::Created, 3.0, 4.0),
                ])),
            })],
            now(),
        ),
        backend,
    );
}

#[test]
fn persisted_regions_are_mirrored_to_the_backend() {
    let mut c = controller();
    let mut backend = StubWaveform::new();
    seed(&mut c, &mut backend);

    assert_eq!(backend.region_ids(), vec!["segment-a", "segment-b"]);
    for op in &backend.applied {
        if let WaveformOp::AddRegion {
            draggable,
            resizable,
            color,
            ..
        } = op
        {
            assert!(!draggable);
            assert!(!resizable);
            assert_eq!(*color, RegionColor::Visible);
        }
    }
}

#[test]
fn show_all_toggle_and_hover_recolor_regions() {
    let mut c = controller();
    let mut backend = StubWaveform::new();
    seed(&mut c, &mut backend);

    let effects = c.step(vec![cmd(UserCommand::SetShowAll(false))], now());
    let recolors: Vec<_> = wf_ops(&effects)
        .into_iter()
        .filter(|op| matches!(op, WaveformOp::SetRegionColor { .. }))
        .collect();
    assert_eq!(recolors.len(), 2);

    let effects = c.step(
        vec![cmd(UserCommand::HoverSegment(Some("b".to_string())))],
        now(),
    );
    assert!(wf_ops(&effects).contains(&&WaveformOp::SetRegionColor {
        id: "segment-b".to_string(),
        color: RegionColor::Highlighted,
    }));

    // Hover off: back to hidden, since show-all is off.
    let effects = c.step(vec![cmd(UserCommand::HoverSegment(None))], now());
    assert!(wf_ops(&effects).contains(&&WaveformOp::SetRegionColor {
        id: "segment-b".to_string(),
        color: RegionColor::Hidden,
    }));
}

#[test]
fn clicking_a_persisted_region_selects_its_segment() {
    let mut c = controller();
    let mut backend = StubWaveform::new();
    seed(&mut c, &mut backend);

    c.step(
        vec![EditorEvent::Waveform(WaveformEvent::RegionClicked {
            id: "segment-b".to_string(),
        })],
        now(),
    );
    assert_eq!(c.selected(), Some("b"));

    // Clicking a non-persisted region changes nothing.
    c.step(
        vec![EditorEvent::Waveform(WaveformEvent::RegionClicked {
            id: "wavesurfer-1".to_string(),
        })],
        now(),
    );
    assert_eq!(c.selected(), Some("b"));

    // The list UI can select too; unknown ids are ignored.
    c.step(
        vec![cmd(UserCommand::SelectSegment {
            segment_id: "a".to_string(),
        })],
        now(),
    );
    assert_eq!(c.selected(), Some("a"));
    c.step(
        vec![cmd(UserCommand::SelectSegment {
            segment_id: "nope".to_string(),
        })],
        now(),
    );
    assert_eq!(c.selected(), Some("a"));
}

#[test]
fn drag_updates_track_the_pending_selection() {
    let mut c = controller();
    let mut backend = StubWaveform::new();
    seed(&mut c, &mut backend);

    c.step(
        vec![EditorEvent::Waveform(WaveformEvent::RegionCreated {
            id: "wavesurfer-1".to_string(),
            start: 10.0,
            end: 12.0,
        })],
        now(),
    );
    c.step(
        vec![EditorEvent::Waveform(WaveformEvent::RegionUpdated {
            id: "wavesurfer-1".to_string(),
            start: 10.0,
            end: 13.5,
        })],
        now(),
    );
    let pending = c.pending_region().expect("drag must leave a pending region");
    assert_eq!(pending.end, 13.5);

    // A drag on a persisted region never becomes the pending selection.
    c.step(
        vec![EditorEvent::Waveform(WaveformEvent::RegionUpdated {
            id: "segment-a".to_string(),
            start: 0.0,
            end: 9.0,
        })],
        now(),
    );
    assert_eq!(c.pending_region().map(|p| p.id.as_str()), Some("wavesurfer-1"));

    // A fresh drag elsewhere replaces the previous selection.
    let effects = c.step(
        vec![EditorEvent::Waveform(WaveformEvent::RegionCreated {
            id: "wavesurfer-2".to_string(),
            start: 20.0,
            end: 21.0,
        })],
        now(),
    );
    assert!(wf_ops(&effects).contains(&&WaveformOp::RemoveRegion {
        id: "wavesurfer-1".to_string()
    }));
    assert_eq!(c.pending_region().map(|p| p.id.as_str()), Some("wavesurfer-2"));
}
