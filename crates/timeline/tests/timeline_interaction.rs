//! Timeline interactions against a live synchronizer.

use proptest::prelude::*;
use vjmix_mixer_model::{ChannelId, LayerKey, MixerStore};
use vjmix_playback::{apply_reports, SimClock, SimulatedBackend, SynchronizerBank};
use vjmix_timeline::{scrub, time_at, HoverPreview, LoopEditor, MarkerEditor};

const FRAME: f64 = 1.0 / 60.0;

fn playing_layer() -> (SimulatedBackend, MixerStore, SynchronizerBank) {
    let backend = SimulatedBackend::new(SimClock::new())
        .with_clip("sim://loop.mp4", 12.0, [0.9, 0.1, 0.6, 1.0]);
    let store = MixerStore::default();
    store.set_layer_source(ChannelId::A, "layer-1", Some("sim://loop.mp4"));
    store.set_layer_playing(ChannelId::A, "layer-1", true);
    let mut bank = SynchronizerBank::default();
    for _ in 0..30 {
        backend.clock().advance(FRAME);
        apply_reports(&store, &bank.reconcile(&store.snapshot(), &backend));
    }
    (backend, store, bank)
}

#[test]
fn hover_preview_leaves_live_playback_alone() {
    let (backend, store, mut bank) = playing_layer();
    let key = LayerKey::new(ChannelId::A, "layer-1");
    let live_before = bank.get(&key).unwrap().position().unwrap();
    let revision = store.revision();

    let mut preview = HoverPreview::new();
    let layer = store.snapshot().layer(ChannelId::A, "layer-1").unwrap().clone();
    preview.hover(&layer, &backend, 90.0, 100.0).unwrap();
    preview.poll();
    preview.poll();
    assert!((preview.thumbnail().unwrap().time - 10.8).abs() < 1e-9);

    assert_eq!(store.revision(), revision);
    let live_after = bank.get(&key).unwrap().position().unwrap();
    assert!((live_after - live_before).abs() < 1e-9);

    backend.clock().advance(FRAME);
    apply_reports(&store, &bank.reconcile(&store.snapshot(), &backend));
    assert!(bank.get(&key).unwrap().position().unwrap() < 1.0);
}

#[test]
fn scrub_moves_the_live_element() {
    let (backend, store, mut bank) = playing_layer();
    scrub(&store, ChannelId::A, "layer-1", 50.0, 100.0).unwrap();
    backend.clock().advance(FRAME);
    apply_reports(&store, &bank.reconcile(&store.snapshot(), &backend));

    let key = LayerKey::new(ChannelId::A, "layer-1");
    let position = bank.get(&key).unwrap().position().unwrap();
    assert!((position - 6.0).abs() < 0.05, "position {position}");
    assert!(store.snapshot().layer(ChannelId::A, "layer-1").unwrap().is_playing);
}

#[test]
fn edited_loop_holds_playback() {
    let (backend, store, mut bank) = playing_layer();
    let editor = LoopEditor::new(ChannelId::A, "layer-1");
    editor.toggle(&store);
    editor.set_range(&store, 2.0, 3.0).unwrap();

    let key = LayerKey::new(ChannelId::A, "layer-1");
    for _ in 0..300 {
        backend.clock().advance(FRAME);
        apply_reports(&store, &bank.reconcile(&store.snapshot(), &backend));
        let position = bank.get(&key).unwrap().position().unwrap();
        assert!((2.0 - 1e-6..=3.0 + 1e-6).contains(&position), "position {position}");
    }
}

#[test]
fn marker_round_trip_restores_length() {
    let (_backend, store, _bank) = playing_layer();
    let before = store.snapshot().layer(ChannelId::A, "layer-1").unwrap().markers.len();

    let mut editor = MarkerEditor::new();
    editor.begin_at(ChannelId::A, "layer-1", 4.25);
    let marker = editor.confirm(&store, "hit").unwrap();

    let snap = store.snapshot();
    let markers = &snap.layer(ChannelId::A, "layer-1").unwrap().markers;
    assert_eq!(markers.iter().filter(|m| m.id == marker.id).count(), 1);
    assert_eq!(markers.last().map(|m| (m.time, m.label.as_str())), Some((4.25, "hit")));

    store.remove_layer_marker(ChannelId::A, "layer-1", &marker.id);
    let after = store.snapshot().layer(ChannelId::A, "layer-1").unwrap().markers.len();
    assert_eq!(after, before);
}

proptest! {
    #[test]
    fn time_at_stays_on_the_clip(offset in -500.0f64..1500.0, width in 1.0f64..1000.0, duration in 0.1f64..600.0) {
        let time = time_at(offset, width, duration).unwrap();
        prop_assert!((0.0..=duration).contains(&time));
    }

    #[test]
    fn time_at_is_monotonic(a in 0.0f64..800.0, b in 0.0f64..800.0, duration in 0.1f64..600.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(time_at(lo, 800.0, duration).unwrap() <= time_at(hi, 800.0, duration).unwrap());
    }
}
