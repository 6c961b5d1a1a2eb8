//! CLI argument parsing using clap

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use mediamix_ipc::{MediaSyncMode, MixerConfig, SessionPreset};

/// mediamix-sim - drive the mixer with simulated capture sources
///
/// Captures synthetic audio and video through the sync gate into the
/// passthrough encoder, optionally injects session faults, then plays the
/// encoded packets back through the pacing link.
#[derive(Parser, Debug)]
#[command(name = "mediamix-sim")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON mixer configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Session preset (e.g. Hd1280x720, Vga640x480)
    #[arg(long, value_parser = parse_preset)]
    pub preset: Option<SessionPreset>,

    /// Sync mode (Passthrough or VideoGated)
    #[arg(long, value_parser = parse_sync_mode)]
    pub sync_mode: Option<MediaSyncMode>,

    /// Use a multi-source capture session
    #[arg(long)]
    pub multi_source: bool,

    /// Latch a zero video timestamp as the sync anchor
    #[arg(long)]
    pub latch_zero: bool,

    /// Capture duration in milliseconds
    #[arg(short, long, default_value = "2000")]
    pub duration: u64,

    /// Delay before the camera delivers its first frame, in milliseconds
    #[arg(long, default_value = "200")]
    pub video_delay: u64,

    /// Camera frame rate
    #[arg(long, default_value = "30")]
    pub fps: u32,

    /// Session faults to inject halfway through capture (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    pub inject: Vec<Fault>,

    /// Play the encoded packets back after capture
    #[arg(long)]
    pub playback: bool,
}

/// Session faults the harness can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Fault {
    /// The camera's active format no longer fits the preset
    Format,
    /// Media services were reset and the session died
    MediaReset,
    /// Another client took the camera, then released it
    Interrupt,
    /// The app went to the background and came back
    Background,
}

impl Args {
    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut MixerConfig) {
        if let Some(preset) = self.preset {
            config.session_preset = preset;
        }
        if let Some(mode) = self.sync_mode {
            config.sync_mode = mode;
        }
        if self.multi_source {
            config.multi_source_enabled = true;
        }
        if self.latch_zero {
            config.gate.latch_zero_timestamp = true;
        }
    }
}

fn parse_preset(s: &str) -> Result<SessionPreset, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|e| e.to_string())
}

fn parse_sync_mode(s: &str) -> Result<MediaSyncMode, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|e| e.to_string())
}
