//! Frame pacing state.

use std::collections::VecDeque;
use std::time::Duration;

use mediamix_ipc::{MediaTime, Sample};

/// Outcome of one pacing tick.
#[derive(Debug, Default)]
pub struct Tick {
    /// The frame released on this tick.
    pub sample: Option<Sample>,

    /// New buffering state, if it changed on this tick.
    pub buffering_changed: Option<bool>,
}

/// Queue plus presentation clock.
///
/// The clock is anchored on the first frame released after a start or an
/// underrun: a frame is due once its timestamp offset from the anchor frame
/// is no larger than the wall time elapsed since the anchor was taken.
pub struct PacingState {
    queue: VecDeque<Sample>,
    capacity: usize,
    origin: Option<(MediaTime, Duration)>,
    is_buffering: bool,
}

impl PacingState {
    /// Create an empty state holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            origin: None,
            is_buffering: false,
        }
    }

    /// Queue a frame, dropping the oldest when full.
    ///
    /// Returns false if a frame was dropped to make room.
    pub fn enqueue(&mut self, sample: Sample) -> bool {
        let dropped = self.queue.len() >= self.capacity && self.queue.pop_front().is_some();
        self.queue.push_back(sample);
        !dropped
    }

    /// Advance the clock to `now` (time since the pacing loop started).
    pub fn tick(&mut self, now: Duration) -> Tick {
        let Some(front) = self.queue.front() else {
            self.origin = None;
            return Tick {
                sample: None,
                buffering_changed: self.set_buffering(true),
            };
        };

        let (origin_pts, origin_at) = *self.origin.get_or_insert((front.pts, now));
        let offset = front.pts.seconds_since(origin_pts);
        let elapsed = now.saturating_sub(origin_at).as_secs_f64();
        if offset > elapsed {
            return Tick::default();
        }

        Tick {
            sample: self.queue.pop_front(),
            buffering_changed: self.set_buffering(false),
        }
    }

    /// Drop all frames and forget the clock.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.origin = None;
        self.is_buffering = false;
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether the last tick found the queue empty.
    pub fn is_buffering(&self) -> bool {
        self.is_buffering
    }

    fn set_buffering(&mut self, buffering: bool) -> Option<bool> {
        if self.is_buffering == buffering {
            return None;
        }
        self.is_buffering = buffering;
        Some(buffering)
    }
}
