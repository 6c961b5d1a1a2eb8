//! Mixer counters.

use std::sync::atomic::{AtomicU64, Ordering};

use mediamix_ipc::{MediaType, MixerMetrics};

/// Collects mixer counters from the capture, playback, and fault paths.
#[derive(Default)]
pub struct MetricsCollector {
    audio_admitted: AtomicU64,
    audio_dropped: AtomicU64,
    video_admitted: AtomicU64,
    video_dropped: AtomicU64,
    frames_dequeued: AtomicU64,
    frames_dropped: AtomicU64,
    underruns: AtomicU64,
    recoveries: AtomicU64,
}

impl MetricsCollector {
    /// Create a zeroed collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one gate decision.
    pub fn record_admission(&self, media_type: MediaType, admitted: bool) {
        let counter = match (media_type, admitted) {
            (MediaType::Audio, true) => &self.audio_admitted,
            (MediaType::Audio, false) => &self.audio_dropped,
            (MediaType::Video, true) => &self.video_admitted,
            (MediaType::Video, false) => &self.video_dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame released by the playback link.
    pub fn record_dequeue(&self) {
        self.frames_dequeued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame evicted from a full playback queue.
    pub fn record_frame_drop(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the playback link running dry.
    pub fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a locally recovered session fault.
    pub fn record_recovery(&self) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters.
    pub fn snapshot(&self) -> MixerMetrics {
        MixerMetrics {
            audio_admitted: self.audio_admitted.load(Ordering::Relaxed),
            audio_dropped: self.audio_dropped.load(Ordering::Relaxed),
            video_admitted: self.video_admitted.load(Ordering::Relaxed),
            video_dropped: self.video_dropped.load(Ordering::Relaxed),
            frames_dequeued: self.frames_dequeued.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            recoveries: self.recoveries.load(Ordering::Relaxed),
        }
    }
}
