//! Pure playback state machine and reconcile planning.
//!
//! Nothing here touches a media element; the synchronizer feeds observations
//! in and applies the returned plan.

use serde::{Deserialize, Serialize};

use vjmix_common::SyncConfig;
use vjmix_mixer_model::Layer;

use crate::media::MediaEvent;

/// Position differences below this are treated as equal.
pub const TIME_EPSILON: f64 = 1e-6;

/// Lifecycle of one layer's media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Empty,
    Loading,
    ReadyPaused,
    ReadyPlaying,
}

impl PlaybackState {
    pub fn is_ready(self) -> bool {
        matches!(self, PlaybackState::ReadyPaused | PlaybackState::ReadyPlaying)
    }
}

/// Inputs to [`transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    SourceAssigned,
    SourceCleared,
    /// The synchronizer paused the element itself.
    Paused,
    Media(MediaEvent),
}

/// Result of one state transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub next: PlaybackState,
    /// Duration to record in the store.
    pub duration: Option<f64>,
    /// A play request was refused.
    pub play_rejected: bool,
    /// The clip ran to its end.
    pub ended: bool,
}

impl Transition {
    fn to(next: PlaybackState) -> Self {
        Self {
            next,
            duration: None,
            play_rejected: false,
            ended: false,
        }
    }
}

pub fn transition(state: PlaybackState, event: &SyncEvent) -> Transition {
    use PlaybackState::*;

    match event {
        SyncEvent::SourceAssigned => Transition::to(Loading),
        SyncEvent::SourceCleared => Transition::to(Empty),
        SyncEvent::Paused if state == ReadyPlaying => Transition::to(ReadyPaused),
        SyncEvent::Paused => Transition::to(state),
        SyncEvent::Media(media) => match (state, media) {
            (Empty, _) => Transition::to(Empty),
            (Loading, MediaEvent::MetadataLoaded { duration }) => Transition {
                duration: Some(*duration),
                ..Transition::to(ReadyPaused)
            },
            (_, MediaEvent::MetadataLoaded { duration }) => Transition {
                duration: Some(*duration),
                ..Transition::to(state)
            },
            (Loading, _) => Transition::to(Loading),
            (_, MediaEvent::Playing) => Transition::to(ReadyPlaying),
            (_, MediaEvent::PlayRejected { .. }) => Transition {
                play_rejected: true,
                ..Transition::to(ReadyPaused)
            },
            (_, MediaEvent::Ended) => Transition {
                ended: true,
                ..Transition::to(ReadyPaused)
            },
            (_, MediaEvent::Seeked | MediaEvent::LoadFailed { .. }) => Transition::to(state),
        },
    }
}

/// What the store declares for a layer, reduced to what playback needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Declared {
    pub time: f64,
    pub playing: bool,
    pub speed: f64,
    pub volume: f32,
    pub loop_window: Option<(f64, f64)>,
}

impl Declared {
    pub fn from_layer(layer: &Layer) -> Self {
        Self {
            time: layer.current_time,
            playing: layer.is_playing,
            speed: layer.playback_speed,
            volume: layer.effective_volume(),
            loop_window: layer.active_loop(),
        }
    }
}

/// Everything [`plan_reconcile`] looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileInput {
    pub state: PlaybackState,
    pub declared: Declared,
    /// The declared time was changed by someone other than this synchronizer
    /// since the previous pass (or this is the first pass after loading).
    pub declared_time_changed: bool,
    pub actual_time: f64,
    pub media_paused: bool,
    /// A play request was refused and the intent has not toggled since.
    pub play_latched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayCommand {
    Play,
    Pause,
}

/// Side effects for one reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilePlan {
    pub seek_to: Option<f64>,
    pub rate: f64,
    pub volume: f32,
    pub command: Option<PlayCommand>,
    /// Position to write back to the store.
    pub write_back: Option<f64>,
    /// Position after the plan is applied.
    pub position: f64,
    /// The loop window moved the position.
    pub looped: bool,
}

/// Plan one reconcile pass. Returns `None` until the media is ready.
pub fn plan_reconcile(input: &ReconcileInput, config: &SyncConfig) -> Option<ReconcilePlan> {
    if !input.state.is_ready() {
        return None;
    }
    let declared = &input.declared;

    let mut position = input.actual_time;
    let mut seek_to = None;

    if input.declared_time_changed
        && (position - declared.time).abs() > config.seek_threshold_secs
    {
        seek_to = Some(declared.time);
        position = declared.time;
    }

    let mut looped = false;
    if let Some((loop_in, loop_out)) = declared.loop_window {
        if position >= loop_out || position < loop_in {
            seek_to = Some(loop_in);
            position = loop_in;
            looped = true;
        }
    }

    let command = if declared.playing {
        (input.media_paused && !input.play_latched).then_some(PlayCommand::Play)
    } else {
        (!input.media_paused || input.state == PlaybackState::ReadyPlaying)
            .then_some(PlayCommand::Pause)
    };

    let drift = (position - declared.time).abs();
    let playing_now = input.state == PlaybackState::ReadyPlaying && !input.media_paused;
    let write_back = if looped && drift > TIME_EPSILON {
        Some(position)
    } else if command == Some(PlayCommand::Pause) && drift > TIME_EPSILON {
        Some(position)
    } else if playing_now && drift > config.write_back_threshold_secs {
        Some(position)
    } else {
        None
    };

    Some(ReconcilePlan {
        seek_to,
        rate: declared.speed,
        volume: declared.volume,
        command,
        write_back,
        position,
        looped,
    })
}
