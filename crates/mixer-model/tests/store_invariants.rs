use proptest::prelude::*;

use vjmix_mixer_model::{BlendMode, ChannelId, Marker, MixerStore};

#[derive(Debug, Clone)]
enum Op {
    Opacity(f32),
    Volume(f32),
    Speed(f64),
    Time(f64),
    Duration(f64),
    Loop(f64, f64),
    ToggleLoop,
    Blend(usize),
    Fader(f32),
    AddMarker(u8, f64),
    RemoveMarker(u8),
    Source(Option<u8>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-1.0f32..2.0).prop_map(Op::Opacity),
        (-1.0f32..2.0).prop_map(Op::Volume),
        (-1.0f64..10.0).prop_map(Op::Speed),
        (-5.0f64..100.0).prop_map(Op::Time),
        (0.0f64..60.0).prop_map(Op::Duration),
        ((-5.0f64..80.0), (-5.0f64..80.0)).prop_map(|(a, b)| Op::Loop(a, b)),
        Just(Op::ToggleLoop),
        (0usize..7).prop_map(Op::Blend),
        (-1.0f32..2.0).prop_map(Op::Fader),
        (any::<u8>(), 0.0f64..60.0).prop_map(|(id, t)| Op::AddMarker(id % 8, t)),
        any::<u8>().prop_map(|id| Op::RemoveMarker(id % 8)),
        proptest::option::of(any::<u8>()).prop_map(Op::Source),
    ]
}

fn apply(store: &MixerStore, channel: ChannelId, layer: &str, op: &Op) {
    match op {
        Op::Opacity(v) => {
            store.set_layer_opacity(channel, layer, *v);
        }
        Op::Volume(v) => {
            store.set_layer_volume(channel, layer, *v);
        }
        Op::Speed(v) => {
            store.set_layer_speed(channel, layer, *v);
        }
        Op::Time(v) => {
            store.set_layer_time(channel, layer, *v);
        }
        Op::Duration(v) => {
            store.set_layer_duration(channel, layer, *v);
        }
        Op::Loop(a, b) => {
            store.set_layer_loop(channel, layer, *a, *b);
        }
        Op::ToggleLoop => {
            store.toggle_layer_loop(channel, layer);
        }
        Op::Blend(i) => {
            store.set_layer_blend_mode(channel, layer, BlendMode::ALL[*i]);
        }
        Op::Fader(v) => {
            store.set_master_fader(*v);
        }
        Op::AddMarker(id, t) => {
            store.add_layer_marker(
                channel,
                layer,
                Marker {
                    id: format!("m{id}"),
                    time: *t,
                    label: "cue".to_string(),
                    color: None,
                },
            );
        }
        Op::RemoveMarker(id) => {
            store.remove_layer_marker(channel, layer, &format!("m{id}"));
        }
        Op::Source(src) => {
            let url = src.map(|n| format!("sim://clip-{n}"));
            store.set_layer_source(channel, layer, url.as_deref());
        }
    }
}

proptest! {
    #[test]
    fn mutations_preserve_value_ranges(ops in proptest::collection::vec((any::<bool>(), 1usize..=3, op()), 1..64)) {
        let store = MixerStore::default();
        for (on_b, index, op) in &ops {
            let channel = if *on_b { ChannelId::B } else { ChannelId::A };
            apply(&store, channel, &format!("layer-{index}"), op);
        }

        let snapshot = store.snapshot();
        prop_assert!((0.0..=1.0).contains(&snapshot.master_fader));
        for (_, layer) in snapshot.layers() {
            prop_assert!((0.0..=1.0).contains(&layer.opacity));
            prop_assert!((0.0..=1.0).contains(&layer.volume));
            prop_assert!((0.25..=4.0).contains(&layer.playback_speed));
            prop_assert!(layer.current_time >= 0.0);
            prop_assert!(layer.loop_in <= layer.loop_out || layer.loop_out == 0.0);
            if layer.duration > 0.0 {
                prop_assert!(layer.loop_out <= layer.duration);
                prop_assert!(layer.current_time <= layer.duration);
                prop_assert!(layer.loop_in < layer.loop_out);
                prop_assert_eq!(layer.is_looping, layer.active_loop().is_some());
            }
            let mut ids: Vec<_> = layer.markers.iter().map(|m| m.id.as_str()).collect();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), layer.markers.len());
        }
    }

    #[test]
    fn repeating_a_mutation_is_a_no_op(op in op(), index in 1usize..=3) {
        let store = MixerStore::default();
        let layer = format!("layer-{index}");
        store.set_layer_duration(ChannelId::A, &layer, 30.0);
        if matches!(op, Op::ToggleLoop) {
            return Ok(());
        }
        apply(&store, ChannelId::A, &layer, &op);
        let once = store.snapshot();
        let revision = store.revision();
        apply(&store, ChannelId::A, &layer, &op);
        prop_assert_eq!(&*store.snapshot(), &*once);
        prop_assert_eq!(store.revision(), revision);
    }
}
