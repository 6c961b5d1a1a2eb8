//! Threaded playback link.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace};

use mediamix_ipc::{PlaybackConfig, Sample};

use crate::pacing::PacingState;
use crate::{LinkHandler, LinkResult, PlaybackLink};

type SharedHandler = Arc<RwLock<Option<Arc<dyn LinkHandler>>>>;

struct PacingThread {
    should_stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Paces decoded frames on a dedicated thread at the display rate.
pub struct MediaLink {
    interval: Duration,
    state: Arc<Mutex<PacingState>>,
    handler: SharedHandler,
    thread: Mutex<Option<PacingThread>>,
}

impl MediaLink {
    /// Create a stopped link.
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            interval: config.frame_interval(),
            state: Arc::new(Mutex::new(PacingState::new(config.capacity))),
            handler: Arc::new(RwLock::new(None)),
            thread: Mutex::new(None),
        }
    }

    /// Number of frames waiting.
    pub fn queued(&self) -> usize {
        self.state.lock().len()
    }

    /// Whether the last tick found nothing to show.
    pub fn is_buffering(&self) -> bool {
        self.state.lock().is_buffering()
    }
}

impl Default for MediaLink {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

impl PlaybackLink for MediaLink {
    fn set_handler(&self, handler: Option<Arc<dyn LinkHandler>>) {
        *self.handler.write() = handler;
    }

    #[instrument(name = "link_start", skip(self))]
    fn start_running(&self) -> LinkResult<()> {
        let mut thread = self.thread.lock();
        if thread.is_some() {
            return Ok(());
        }

        info!(interval_us = self.interval.as_micros() as u64, "Starting playback link");

        let should_stop = Arc::new(AtomicBool::new(false));
        let state = Arc::clone(&self.state);
        let handler = Arc::clone(&self.handler);
        let stop = Arc::clone(&should_stop);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("mediamix-link".into())
            .spawn(move || pacing_thread(state, handler, stop, interval))?;

        *thread = Some(PacingThread {
            should_stop,
            handle,
        });
        Ok(())
    }

    #[instrument(name = "link_stop", skip(self))]
    fn stop_running(&self) {
        let Some(pacing) = self.thread.lock().take() else {
            return;
        };

        info!("Stopping playback link");
        pacing.should_stop.store(true, Ordering::SeqCst);

        // A handler may stop the link from the pacing thread itself.
        if pacing.handle.thread().id() != thread::current().id() {
            let _ = pacing.handle.join();
        }

        self.state.lock().clear();
        info!("Playback link stopped");
    }

    fn is_running(&self) -> bool {
        self.thread.lock().is_some()
    }

    fn enqueue(&self, sample: Sample) -> bool {
        let kept_all = self.state.lock().enqueue(sample);
        if !kept_all {
            trace!("Playback queue full, dropped oldest frame");
        }
        kept_all
    }
}

impl Drop for MediaLink {
    fn drop(&mut self) {
        self.stop_running();
    }
}

fn pacing_thread(
    state: Arc<Mutex<PacingState>>,
    handler: SharedHandler,
    should_stop: Arc<AtomicBool>,
    interval: Duration,
) {
    debug!("Pacing thread started");

    let start_time = Instant::now();
    let mut next_tick = start_time;

    while !should_stop.load(Ordering::SeqCst) {
        let tick = state.lock().tick(start_time.elapsed());

        if tick.sample.is_some() || tick.buffering_changed.is_some() {
            let handler = handler.read().clone();
            if let Some(handler) = handler {
                if let Some(is_buffering) = tick.buffering_changed {
                    handler.on_buffering_changed(is_buffering);
                }
                if let Some(sample) = tick.sample {
                    handler.on_dequeue(sample);
                }
            }
        }

        next_tick += interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            // Fell behind; don't burst to catch up.
            next_tick = now;
        }
    }

    debug!("Pacing thread exiting");
}
