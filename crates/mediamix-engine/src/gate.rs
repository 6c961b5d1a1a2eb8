//! Audio/video synchronization gate.

use tracing::{debug, trace};

use mediamix_ipc::{GateConfig, MediaSyncMode, MediaTime, MediaType, Sample};

/// Decides whether a captured sample may proceed to its codec unit.
///
/// In [`MediaSyncMode::VideoGated`] the first video timestamp becomes the
/// sync anchor, and audio is admitted only at or after it. The anchor holds
/// until [`reset`](Self::reset); it is not cleared by switching modes or by
/// starting a new encode without stopping the previous one.
#[derive(Debug)]
pub struct SyncGate {
    mode: MediaSyncMode,
    latch_zero: bool,
    video_anchor: Option<MediaTime>,
    audio_anchor: Option<MediaTime>,
}

impl SyncGate {
    /// Create a gate with no anchor.
    pub fn new(mode: MediaSyncMode, config: GateConfig) -> Self {
        Self {
            mode,
            latch_zero: config.latch_zero_timestamp,
            video_anchor: None,
            audio_anchor: None,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> MediaSyncMode {
        self.mode
    }

    /// Change mode. The anchor is kept.
    pub fn set_mode(&mut self, mode: MediaSyncMode) {
        if self.mode != mode {
            debug!(?mode, "Sync mode changed");
            self.mode = mode;
        }
    }

    /// Admission decision for one sample.
    pub fn admit(&mut self, sample: &Sample, media_type: MediaType) -> bool {
        if self.mode == MediaSyncMode::Passthrough {
            return true;
        }

        match media_type {
            MediaType::Video => {
                if self.video_anchor.is_none() && (self.latch_zero || !sample.pts.is_zero()) {
                    debug!(anchor = sample.pts.seconds(), "Video sync anchor latched");
                    self.video_anchor = Some(sample.pts);
                }
                true
            }
            MediaType::Audio => {
                let admitted = self
                    .video_anchor
                    .is_some_and(|anchor| anchor.seconds() <= sample.pts.seconds());

                if admitted && self.audio_anchor.is_none() {
                    self.audio_anchor = Some(sample.pts);
                } else if !admitted {
                    trace!(pts = sample.pts.seconds(), "Audio held back by sync gate");
                }
                admitted
            }
        }
    }

    /// Forget both anchors.
    pub fn reset(&mut self) {
        self.video_anchor = None;
        self.audio_anchor = None;
    }

    /// The latched video anchor.
    pub fn video_anchor(&self) -> Option<MediaTime> {
        self.video_anchor
    }

    /// Timestamp of the first audio sample admitted after the anchor.
    pub fn audio_anchor(&self) -> Option<MediaTime> {
        self.audio_anchor
    }

    /// Seconds between the video anchor and the first admitted audio sample.
    pub fn av_offset(&self) -> Option<f64> {
        Some(self.audio_anchor?.seconds_since(self.video_anchor?))
    }
}

impl Default for SyncGate {
    fn default() -> Self {
        Self::new(MediaSyncMode::default(), GateConfig::default())
    }
}
