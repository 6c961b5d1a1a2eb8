//! Common media types.

use std::cmp::Ordering;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Kind of media carried by a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    /// Audio samples (PCM or compressed).
    Audio,

    /// Video frames.
    Video,
}

impl MediaType {
    /// Returns a lowercase name for logging.
    pub fn name(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// A rational presentation timestamp (`value / timescale` seconds).
///
/// Two timestamps compare equal when they denote the same instant, even if
/// their timescales differ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MediaTime {
    value: i64,
    timescale: u32,
}

impl MediaTime {
    /// Zero seconds.
    pub const ZERO: Self = Self {
        value: 0,
        timescale: 1,
    };

    /// Create a timestamp of `value / timescale` seconds.
    ///
    /// A zero timescale is treated as one.
    pub const fn new(value: i64, timescale: u32) -> Self {
        let timescale = if timescale == 0 { 1 } else { timescale };
        Self { value, timescale }
    }

    /// Create a timestamp from milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self::new(millis, 1_000)
    }

    /// Create a timestamp from a duration, at nanosecond resolution.
    pub fn from_duration(duration: Duration) -> Self {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        Self::new(nanos, 1_000_000_000)
    }

    /// Raw numerator.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Units per second.
    pub fn timescale(&self) -> u32 {
        self.timescale
    }

    /// The timestamp in seconds.
    pub fn seconds(&self) -> f64 {
        self.value as f64 / self.timescale.max(1) as f64
    }

    /// Returns true if this timestamp is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Signed difference `self - other` in seconds.
    pub fn seconds_since(&self, other: MediaTime) -> f64 {
        self.seconds() - other.seconds()
    }

    fn cross(&self, other: &Self) -> (i128, i128) {
        (
            self.value as i128 * other.timescale.max(1) as i128,
            other.value as i128 * self.timescale.max(1) as i128,
        )
    }
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = self.cross(other);
        a == b
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = self.cross(other);
        a.cmp(&b)
    }
}

/// An opaque timestamped media unit.
///
/// The mixer only ever looks at `media_type` and `pts`; the payload is
/// carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Audio or video.
    pub media_type: MediaType,

    /// Presentation timestamp.
    pub pts: MediaTime,

    /// Payload bytes.
    pub data: Bytes,
}

impl Sample {
    /// Create a new sample.
    pub fn new(media_type: MediaType, pts: MediaTime, data: Bytes) -> Self {
        Self {
            media_type,
            pts,
            data,
        }
    }

    /// Create an audio sample.
    pub fn audio(pts: MediaTime, data: Bytes) -> Self {
        Self::new(MediaType::Audio, pts, data)
    }

    /// Create a video sample.
    pub fn video(pts: MediaTime, data: Bytes) -> Self {
        Self::new(MediaType::Video, pts, data)
    }
}

/// Capture session quality preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPreset {
    /// Low quality, platform-chosen resolution.
    Low,

    /// Medium quality, platform-chosen resolution.
    Medium,

    /// High quality, platform-chosen resolution.
    High,

    /// Full-resolution photo output.
    Photo,

    /// 352x288.
    Cif352x288,

    /// 640x480.
    Vga640x480,

    /// 960x540 I-frame only.
    Iframe960x540,

    /// 1280x720.
    #[default]
    Hd1280x720,

    /// 1920x1080.
    Hd1920x1080,

    /// 3840x2160.
    Hd4k3840x2160,

    /// Device active format drives the resolution.
    InputPriority,
}

impl SessionPreset {
    /// Fixed output dimensions, if this preset has them.
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Self::Cif352x288 => Some((352, 288)),
            Self::Vga640x480 => Some((640, 480)),
            Self::Iframe960x540 => Some((960, 540)),
            Self::Hd1280x720 => Some((1280, 720)),
            Self::Hd1920x1080 => Some((1920, 1080)),
            Self::Hd4k3840x2160 => Some((3840, 2160)),
            Self::Low | Self::Medium | Self::High | Self::Photo | Self::InputPriority => None,
        }
    }
}

/// How the mixer orders audio against video before encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSyncMode {
    /// Every sample is admitted immediately.
    #[default]
    Passthrough,

    /// Audio is held back until the first video frame has been seen, and
    /// audio older than that frame is dropped.
    VideoGated,
}

/// Why the capture session was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionReason {
    /// The camera cannot be used while the app is in the background.
    VideoDeviceNotAvailableInBackground,

    /// Another client took the audio device.
    AudioDeviceInUseByAnotherClient,

    /// Another client took the video device.
    VideoDeviceInUseByAnotherClient,

    /// The camera cannot be shared between several foreground apps.
    VideoDeviceNotAvailableWithMultipleForegroundApps,

    /// The system shut the camera down under thermal or power pressure.
    VideoDeviceNotAvailableDueToSystemPressure,

    /// A reason code this crate does not know about.
    Unknown(i64),
}

impl InterruptionReason {
    /// Map a platform reason code.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::VideoDeviceNotAvailableInBackground,
            2 => Self::AudioDeviceInUseByAnotherClient,
            3 => Self::VideoDeviceInUseByAnotherClient,
            4 => Self::VideoDeviceNotAvailableWithMultipleForegroundApps,
            5 => Self::VideoDeviceNotAvailableDueToSystemPressure,
            other => Self::Unknown(other),
        }
    }

    /// The platform reason code.
    pub fn code(self) -> i64 {
        match self {
            Self::VideoDeviceNotAvailableInBackground => 1,
            Self::AudioDeviceInUseByAnotherClient => 2,
            Self::VideoDeviceInUseByAnotherClient => 3,
            Self::VideoDeviceNotAvailableWithMultipleForegroundApps => 4,
            Self::VideoDeviceNotAvailableDueToSystemPressure => 5,
            Self::Unknown(code) => code,
        }
    }
}

/// Mixer counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixerMetrics {
    /// Audio samples forwarded to the audio codec unit.
    pub audio_admitted: u64,

    /// Audio samples rejected by the gate.
    pub audio_dropped: u64,

    /// Video samples forwarded to the video codec unit.
    pub video_admitted: u64,

    /// Video samples rejected by the gate.
    pub video_dropped: u64,

    /// Frames released by the playback link.
    pub frames_dequeued: u64,

    /// Frames discarded because the playback queue was full.
    pub frames_dropped: u64,

    /// Times the playback link ran dry.
    pub underruns: u64,

    /// Session faults recovered locally.
    pub recoveries: u64,
}
