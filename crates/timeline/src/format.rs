//! Display helpers for timeline labels.

/// Playback speeds offered by the speed selector.
pub const SPEED_PRESETS: [f64; 6] = [0.25, 0.5, 1.0, 1.5, 2.0, 4.0];

/// Format seconds as `m:ss`, truncating fractions.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// `current / duration` as shown next to the transport buttons.
pub fn format_position(current: f64, duration: f64) -> String {
    format!("{} / {}", format_time(current), format_time(duration))
}

/// Label for a speed multiplier (`0.25x`, `1x`, `1.5x`).
pub fn speed_label(speed: f64) -> String {
    format!("{speed}x")
}

/// The preset closest to `speed`.
pub fn nearest_speed_preset(speed: f64) -> f64 {
    SPEED_PRESETS
        .into_iter()
        .min_by(|a, b| (a - speed).abs().total_cmp(&(b - speed).abs()))
        .unwrap_or(1.0)
}
