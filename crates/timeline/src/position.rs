//! Pointer position to timeline time.
//!
//! A timeline widget spans the whole clip: offset 0 is the start, offset
//! `width` is the end. Offsets are in whatever unit the widget measures
//! (pixels, normally).

use vjmix_mixer_model::{ChannelId, Layer, MixerStore};

/// Time under a pointer at `offset` along a timeline `width` wide.
///
/// Returns `None` while the timeline is inactive: unknown (zero) duration or
/// a widget with no width.
pub fn time_at(offset: f64, width: f64, duration: f64) -> Option<f64> {
    if !(duration > 0.0) || !(width > 0.0) || !offset.is_finite() || !duration.is_finite() {
        return None;
    }
    Some((offset / width).clamp(0.0, 1.0) * duration)
}

/// Fraction of the timeline covered by `time`, for drawing playheads,
/// loop handles and markers.
pub fn fraction_of(time: f64, duration: f64) -> f64 {
    if duration > 0.0 && time.is_finite() {
        (time / duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Jump a layer's playhead to the pointer position.
///
/// Scrubbing only moves the declared time; the play flag is left alone.
/// Returns the new time, or `None` when the layer is unknown or its timeline
/// is inactive.
pub fn scrub(
    store: &MixerStore,
    channel: ChannelId,
    layer_id: &str,
    offset: f64,
    width: f64,
) -> Option<f64> {
    let state = store.snapshot();
    let layer = state.layer(channel, layer_id)?;
    let time = time_at(offset, width, layer.duration)?;
    store.set_layer_time(channel, layer_id, time);
    tracing::debug!(%channel, layer = layer_id, time, "scrubbed");
    Some(time)
}

/// Playhead fraction of a layer.
pub fn progress(layer: &Layer) -> f64 {
    fraction_of(layer.current_time, layer.duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_at_maps_linearly() {
        assert_eq!(time_at(0.0, 200.0, 10.0), Some(0.0));
        assert_eq!(time_at(50.0, 200.0, 10.0), Some(2.5));
        assert_eq!(time_at(200.0, 200.0, 10.0), Some(10.0));
    }

    #[test]
    fn test_time_at_clamps_outside_widget() {
        assert_eq!(time_at(-30.0, 200.0, 10.0), Some(0.0));
        assert_eq!(time_at(260.0, 200.0, 10.0), Some(10.0));
    }

    #[test]
    fn test_inactive_timeline() {
        assert_eq!(time_at(50.0, 200.0, 0.0), None);
        assert_eq!(time_at(50.0, 0.0, 10.0), None);
        assert_eq!(time_at(f64::NAN, 200.0, 10.0), None);
    }

    #[test]
    fn test_scrub_keeps_play_state() {
        let store = MixerStore::default();
        store.set_layer_source(ChannelId::A, "layer-1", Some("sim://clip"));
        store.set_layer_duration(ChannelId::A, "layer-1", 8.0);
        store.set_layer_playing(ChannelId::A, "layer-1", true);

        assert_eq!(scrub(&store, ChannelId::A, "layer-1", 75.0, 100.0), Some(6.0));
        let snap = store.snapshot();
        let layer = snap.layer(ChannelId::A, "layer-1").unwrap();
        assert_eq!(layer.current_time, 6.0);
        assert!(layer.is_playing);
        assert!((progress(layer) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_scrub_without_duration_is_ignored() {
        let store = MixerStore::default();
        let before = store.revision();
        assert_eq!(scrub(&store, ChannelId::B, "layer-2", 10.0, 100.0), None);
        assert_eq!(scrub(&store, ChannelId::B, "layer-9", 10.0, 100.0), None);
        assert_eq!(store.revision(), before);
    }
}
