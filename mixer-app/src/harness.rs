//! Synthetic capture sources and fault injection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, info, warn};

use mediamix_capture::sim::SimSessionFactory;
use mediamix_capture::{RuntimeErrorCode, SessionEvent};
use mediamix_engine::Mixer;
use mediamix_ipc::{InterruptionReason, MediaTime, MediaType, Sample};

use crate::args::Fault;

/// Audio is delivered in 20 ms buffers.
const AUDIO_BUFFER: Duration = Duration::from_millis(20);

/// 20 ms of 48 kHz stereo 16-bit PCM.
const AUDIO_BUFFER_BYTES: usize = 48_000 / 50 * 2 * 2;

/// One simulated capture source feeding the mixer from its own thread.
pub struct SourceThread {
    should_stop: Arc<AtomicBool>,
    handle: JoinHandle<u64>,
}

impl SourceThread {
    /// Spawn a source that delivers one sample every `interval`, starting
    /// `delay` after `origin`. Timestamps are wall time since `origin`.
    pub fn spawn(
        mixer: Arc<Mixer>,
        media_type: MediaType,
        origin: Instant,
        delay: Duration,
        interval: Duration,
        payload: Bytes,
    ) -> std::io::Result<Self> {
        let should_stop = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&should_stop);

        let handle = thread::Builder::new()
            .name(format!("sim-{}", media_type.name()))
            .spawn(move || {
                let mut delivered = 0u64;
                let mut next = origin + delay;

                while !stop.load(Ordering::SeqCst) {
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    }

                    let pts = MediaTime::from_duration(next.saturating_duration_since(origin));
                    let sample = Sample::new(media_type, pts, payload.clone());
                    if mixer.append_sample(sample) {
                        delivered += 1;
                    }
                    next += interval;
                }

                delivered
            })?;

        Ok(Self {
            should_stop,
            handle,
        })
    }

    /// Stop the source and return how many samples passed the gate.
    pub fn stop(self) -> u64 {
        self.should_stop.store(true, Ordering::SeqCst);
        self.handle.join().unwrap_or_else(|_| {
            warn!("Capture source thread panicked");
            0
        })
    }
}

/// Start the microphone and camera sources.
pub fn spawn_sources(
    mixer: &Arc<Mixer>,
    video_delay: Duration,
    fps: u32,
) -> std::io::Result<(SourceThread, SourceThread)> {
    let origin = Instant::now();
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));

    let audio = SourceThread::spawn(
        Arc::clone(mixer),
        MediaType::Audio,
        origin,
        Duration::ZERO,
        AUDIO_BUFFER,
        Bytes::from(vec![0u8; AUDIO_BUFFER_BYTES]),
    )?;
    let video = SourceThread::spawn(
        Arc::clone(mixer),
        MediaType::Video,
        origin,
        video_delay,
        frame_interval,
        Bytes::from_static(b"sim-frame"),
    )?;

    Ok((audio, video))
}

/// Deliver a fault to the current sim session's observer.
pub fn inject(factory: &SimSessionFactory, fault: Fault) {
    let Some(session) = factory.current() else {
        warn!("No session to inject into");
        return;
    };

    info!(?fault, "Injecting fault");
    let delivered = match fault {
        Fault::Format => session.emit(SessionEvent::RuntimeError(
            RuntimeErrorCode::UnsupportedDeviceActiveFormat,
        )),
        Fault::MediaReset => {
            session.tear_down();
            session.emit(SessionEvent::RuntimeError(
                RuntimeErrorCode::MediaServicesWereReset,
            ))
        }
        Fault::Interrupt => {
            let reason = InterruptionReason::VideoDeviceInUseByAnotherClient;
            session.emit(SessionEvent::WasInterrupted(reason))
                && session.emit(SessionEvent::InterruptionEnded(reason))
        }
        Fault::Background => {
            session.emit(SessionEvent::DidEnterBackground)
                && session.emit(SessionEvent::WillEnterForeground)
        }
    };

    if !delivered {
        debug!(?fault, "Session has no observer, fault dropped");
    }
}
