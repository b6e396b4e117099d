//! Marker creation, removal and navigation.
//!
//! Creating a marker takes two steps: a double-click picks the time and
//! opens a label prompt, then confirming the label appends the marker.
//! Markers keep insertion order; they are not sorted by time.

use vjmix_mixer_model::{ChannelId, Marker, MixerStore};

use crate::position::time_at;

/// A marker waiting for its label.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMarker {
    pub channel: ChannelId,
    pub layer_id: String,
    pub time: f64,
}

/// Hands out marker ids from wall-clock milliseconds, strictly increasing
/// even when two markers land in the same millisecond.
#[derive(Debug, Default)]
pub struct MarkerIds {
    last: i64,
}

impl MarkerIds {
    pub fn next_at(&mut self, now_ms: i64) -> String {
        let id = now_ms.max(self.last + 1);
        self.last = id;
        id.to_string()
    }
}

/// Drives the two-step marker prompt.
#[derive(Debug, Default)]
pub struct MarkerEditor {
    ids: MarkerIds,
    pending: Option<PendingMarker>,
}

impl MarkerEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingMarker> {
        self.pending.as_ref()
    }

    /// Start a marker at the pointer position. Returns the candidate time,
    /// or `None` when the layer is unknown or its timeline is inactive.
    pub fn begin(
        &mut self,
        store: &MixerStore,
        channel: ChannelId,
        layer_id: &str,
        offset: f64,
        width: f64,
    ) -> Option<f64> {
        let state = store.snapshot();
        let layer = state.layer(channel, layer_id)?;
        let time = time_at(offset, width, layer.duration)?;
        self.begin_at(channel, layer_id, time);
        Some(time)
    }

    /// Start a marker at an explicit time. Replaces any pending marker.
    pub fn begin_at(&mut self, channel: ChannelId, layer_id: &str, time: f64) {
        self.pending = Some(PendingMarker {
            channel,
            layer_id: layer_id.to_string(),
            time,
        });
    }

    /// Confirm the pending marker with `label`.
    ///
    /// The label is trimmed; a blank label cancels. Returns the marker that
    /// was added.
    pub fn confirm(&mut self, store: &MixerStore, label: &str) -> Option<Marker> {
        self.confirm_at(store, label, chrono::Utc::now().timestamp_millis())
    }

    /// [`confirm`](Self::confirm) with the id clock supplied. An id already
    /// taken on the layer is skipped.
    pub fn confirm_at(&mut self, store: &MixerStore, label: &str, now_ms: i64) -> Option<Marker> {
        let pending = self.pending.take()?;
        let label = label.trim();
        if label.is_empty() {
            tracing::debug!(layer = %pending.layer_id, "blank marker label; cancelled");
            return None;
        }

        let state = store.snapshot();
        let Some(layer) = state.layer(pending.channel, &pending.layer_id) else {
            tracing::debug!(layer = %pending.layer_id, "unknown layer; marker dropped");
            return None;
        };
        let mut id = self.ids.next_at(now_ms);
        while layer.marker(&id).is_some() {
            id = self.ids.next_at(now_ms);
        }

        let marker = Marker {
            id,
            time: pending.time,
            label: label.to_string(),
            color: Some(pending.channel.marker_color().to_string()),
        };
        if !store.add_layer_marker(pending.channel, &pending.layer_id, marker.clone()) {
            tracing::debug!(layer = %pending.layer_id, id = %marker.id, "marker not added");
            return None;
        }
        tracing::info!(
            channel = %pending.channel,
            layer = %pending.layer_id,
            time = marker.time,
            label = %marker.label,
            "marker added"
        );
        Some(marker)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

pub fn remove_marker(store: &MixerStore, channel: ChannelId, layer_id: &str, marker_id: &str) -> bool {
    store.remove_layer_marker(channel, layer_id, marker_id)
}

/// Move the playhead to a marker. Returns the marker time when it exists.
pub fn jump_to_marker(
    store: &MixerStore,
    channel: ChannelId,
    layer_id: &str,
    marker_id: &str,
) -> Option<f64> {
    let state = store.snapshot();
    let time = state.layer(channel, layer_id)?.marker(marker_id)?.time;
    store.set_layer_time(channel, layer_id, time);
    Some(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_clip() -> MixerStore {
        let store = MixerStore::default();
        store.set_layer_source(ChannelId::B, "layer-1", Some("sim://clip"));
        store.set_layer_duration(ChannelId::B, "layer-1", 20.0);
        store
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut ids = MarkerIds::default();
        assert_eq!(ids.next_at(1000), "1000");
        assert_eq!(ids.next_at(1000), "1001");
        assert_eq!(ids.next_at(999), "1002");
        assert_eq!(ids.next_at(5000), "5000");
    }

    #[test]
    fn test_marker_round_trip() {
        let store = store_with_clip();
        let mut editor = MarkerEditor::new();

        assert_eq!(editor.begin(&store, ChannelId::B, "layer-1", 25.0, 100.0), Some(5.0));
        let marker = editor.confirm(&store, "  drop  ").unwrap();
        assert!(editor.pending().is_none());
        assert_eq!(marker.label, "drop");
        assert_eq!(marker.color.as_deref(), Some("#ff00ff"));

        let snap = store.snapshot();
        let markers = &snap.layer(ChannelId::B, "layer-1").unwrap().markers;
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].time, 5.0);

        assert!(remove_marker(&store, ChannelId::B, "layer-1", &marker.id));
        assert!(store.snapshot().layer(ChannelId::B, "layer-1").unwrap().markers.is_empty());
    }

    #[test]
    fn test_blank_label_cancels() {
        let store = store_with_clip();
        let mut editor = MarkerEditor::new();
        editor.begin_at(ChannelId::B, "layer-1", 3.0);
        assert!(editor.confirm(&store, "   ").is_none());
        assert!(editor.pending().is_none());
        assert!(store.snapshot().layer(ChannelId::B, "layer-1").unwrap().markers.is_empty());
    }

    #[test]
    fn test_insertion_order_kept() {
        let store = store_with_clip();
        let mut editor = MarkerEditor::new();
        for (time, label) in [(12.0, "late"), (2.0, "early")] {
            editor.begin_at(ChannelId::B, "layer-1", time);
            editor.confirm(&store, label).unwrap();
        }
        let snap = store.snapshot();
        let labels: Vec<_> = snap
            .layer(ChannelId::B, "layer-1")
            .unwrap()
            .markers
            .iter()
            .map(|m| m.label.as_str())
            .collect();
        assert_eq!(labels, ["late", "early"]);
    }

    #[test]
    fn test_channel_a_color_and_jump() {
        let store = MixerStore::default();
        store.set_layer_duration(ChannelId::A, "layer-3", 30.0);
        let mut editor = MarkerEditor::new();
        editor.begin_at(ChannelId::A, "layer-3", 17.5);
        let marker = editor.confirm(&store, "chorus").unwrap();
        assert_eq!(marker.color.as_deref(), Some("#00ffff"));

        assert_eq!(jump_to_marker(&store, ChannelId::A, "layer-3", &marker.id), Some(17.5));
        assert_eq!(
            store.snapshot().layer(ChannelId::A, "layer-3").unwrap().current_time,
            17.5
        );
        assert_eq!(jump_to_marker(&store, ChannelId::A, "layer-3", "nope"), None);
    }

    #[test]
    fn test_editors_in_same_millisecond_get_distinct_ids() {
        let store = store_with_clip();
        let mut first = MarkerEditor::new();
        let mut second = MarkerEditor::new();
        first.begin_at(ChannelId::B, "layer-1", 4.0);
        second.begin_at(ChannelId::B, "layer-1", 9.0);

        let a = first.confirm_at(&store, "intro", 1_000).unwrap();
        let b = second.confirm_at(&store, "break", 1_000).unwrap();
        assert_eq!(a.id, "1000");
        assert_eq!(b.id, "1001");
        assert_eq!(store.snapshot().layer(ChannelId::B, "layer-1").unwrap().markers.len(), 2);
    }

    #[test]
    fn test_unknown_layer_adds_nothing() {
        let store = MixerStore::default();
        let mut editor = MarkerEditor::new();
        editor.begin_at(ChannelId::A, "layer-7", 1.0);
        assert!(editor.confirm(&store, "ghost").is_none());
    }
}
