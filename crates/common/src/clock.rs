//! Frame timing utilities.
//!
//! The mixer is driven by one tick per display frame. This module provides:
//! - A monotonic frame clock anchored at engine start
//! - Fixed-rate gating for consumers slower than the display (capture at 30 fps)
//! - FPS measurement over one-second windows

use std::collections::VecDeque;
use std::time::Instant;

/// Monotonic clock anchored to the moment the engine started.
#[derive(Debug, Clone)]
pub struct FrameClock {
    epoch: Instant,
    epoch_wall: String,
}

impl FrameClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Nanoseconds since the clock started.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Seconds since the clock started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at start (RFC 3339).
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }

    pub fn secs_to_ns(secs: f64) -> u64 {
        (secs.max(0.0) * 1_000_000_000.0) as u64
    }
}

/// Gates a fixed-rate consumer driven from a faster (or irregular) tick.
#[derive(Debug, Clone)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given rate in Hz.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Returns true (and records the tick) when a full interval has elapsed
    /// since the last accepted tick. The first call always fires.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            Some(last) if current_ns < last.saturating_add(self.target_interval_ns) => false,
            _ => {
                self.last_tick_ns = Some(current_ns);
                true
            }
        }
    }

    /// Forget the last tick so the next call fires immediately.
    pub fn reset(&mut self) {
        self.last_tick_ns = None;
    }

    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

/// Coarse rendering health derived from the average FPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl PerformanceStatus {
    pub fn from_fps(fps: u32) -> Self {
        if fps >= 55 {
            PerformanceStatus::Excellent
        } else if fps >= 45 {
            PerformanceStatus::Good
        } else if fps >= 30 {
            PerformanceStatus::Fair
        } else {
            PerformanceStatus::Poor
        }
    }
}

/// Counts frames and reports a rounded FPS once per window of at least one second.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window_start_ns: Option<u64>,
    frames: u32,
    history: VecDeque<u32>,
}

impl FpsMeter {
    const WINDOW_NS: u64 = 1_000_000_000;
    const HISTORY_LEN: usize = 10;

    pub fn new() -> Self {
        Self {
            window_start_ns: None,
            frames: 0,
            history: VecDeque::with_capacity(Self::HISTORY_LEN),
        }
    }

    /// Record one rendered frame. Returns the measured FPS when a window closes.
    ///
    /// The first frame only opens the window; frames are counted after it.
    pub fn frame(&mut self, now_ns: u64) -> Option<u32> {
        let Some(start) = self.window_start_ns else {
            self.window_start_ns = Some(now_ns);
            return None;
        };
        self.frames += 1;

        let elapsed = now_ns.saturating_sub(start);
        if elapsed < Self::WINDOW_NS {
            return None;
        }

        let fps = ((self.frames as f64 * 1e9) / elapsed as f64).round() as u32;
        if self.history.len() == Self::HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(fps);
        self.frames = 0;
        self.window_start_ns = Some(now_ns);
        Some(fps)
    }

    /// Rounded mean over the last ten measurements.
    pub fn average(&self) -> Option<u32> {
        if self.history.is_empty() {
            return None;
        }
        let sum: u32 = self.history.iter().sum();
        Some((sum as f64 / self.history.len() as f64).round() as u32)
    }

    pub fn status(&self) -> Option<PerformanceStatus> {
        self.average().map(PerformanceStatus::from_fps)
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}
