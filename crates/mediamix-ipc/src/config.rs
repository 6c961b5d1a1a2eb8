//! Mixer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{MediaSyncMode, SessionPreset};

/// Configuration for a mixer instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Capture session preset.
    pub session_preset: SessionPreset,

    /// Whether the session should combine several inputs.
    pub multi_source_enabled: bool,

    /// Audio/video admission policy.
    pub sync_mode: MediaSyncMode,

    /// What the platform is able to do.
    pub capabilities: Capabilities,

    /// Synchronization gate tuning.
    pub gate: GateConfig,

    /// Playback pacing.
    pub playback: PlaybackConfig,
}

/// Runtime platform capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// The camera stays usable while the app is in the background. When
    /// false, capture units are detached on backgrounding.
    pub multitasking_camera_access: bool,

    /// Multi-source sessions can be created.
    pub multi_source_session: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            multitasking_camera_access: false,
            multi_source_session: true,
        }
    }
}

/// Synchronization gate tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Latch a video timestamp of exactly zero as the sync anchor. When
    /// false, a zero timestamp is indistinguishable from "no anchor yet".
    pub latch_zero_timestamp: bool,
}

/// Playback link pacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Display refresh rate in Hz; one frame at most is released per tick.
    pub frame_rate: f64,

    /// Maximum number of queued frames before the oldest is dropped.
    pub capacity: usize,
}

impl PlaybackConfig {
    /// Interval between pacing ticks.
    pub fn frame_interval(&self) -> Duration {
        let rate = if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            self.frame_rate
        } else {
            60.0
        };
        Duration::from_secs_f64(1.0 / rate)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            capacity: 120,
        }
    }
}
