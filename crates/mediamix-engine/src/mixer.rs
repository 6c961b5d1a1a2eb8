//! Mixer façade over the gate, the session controller, the codec units, and
//! the playback link.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use bytes::Bytes;
use crossbeam_channel::Sender;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, trace, warn};

use mediamix_capture::{CaptureSession, CaptureUnit, SessionFactory};
use mediamix_codec::{
    CodecResult, CodecUnit, DecodedOutput, EncodedPacket, PassthroughCodec, RenderTarget,
};
use mediamix_ipc::{
    MediaSyncMode, MediaTime, MediaType, MixerConfig, MixerEvent, MixerMetrics, Sample,
    SessionPreset,
};
use mediamix_link::{LinkHandler, MediaLink, PlaybackLink};

use crate::gate::SyncGate;
use crate::metrics::MetricsCollector;
use crate::session::{ControllerSettings, SessionController};
use crate::MixerResult;

/// A codec unit shared by the caller and the link thread.
///
/// Decode output is delivered while the unit is borrowed, so a
/// `stop_decoding` issued from inside that output is deferred until the
/// current `input_buffer` call returns.
struct SharedCodec {
    media_type: MediaType,
    unit: Mutex<Box<dyn CodecUnit>>,
    feeding: Mutex<Option<ThreadId>>,
    stop_pending: AtomicBool,
}

impl SharedCodec {
    fn new(unit: Box<dyn CodecUnit>) -> Arc<Self> {
        Arc::new(Self {
            media_type: unit.media_type(),
            unit: Mutex::new(unit),
            feeding: Mutex::new(None),
            stop_pending: AtomicBool::new(false),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn CodecUnit>> {
        self.unit.lock()
    }

    fn input_buffer(&self, sample: Sample) -> CodecResult<()> {
        let mut unit = self.unit.lock();
        *self.feeding.lock() = Some(thread::current().id());
        let result = unit.input_buffer(sample);
        *self.feeding.lock() = None;

        if self.stop_pending.swap(false, Ordering::SeqCst) {
            unit.stop_decoding();
        }
        result
    }

    fn stop_decoding(&self) {
        if *self.feeding.lock() == Some(thread::current().id()) {
            debug!(
                media = self.media_type.name(),
                "Stop requested from decode output, deferring"
            );
            self.stop_pending.store(true, Ordering::SeqCst);
            return;
        }
        self.unit.lock().stop_decoding();
    }
}

/// The collaborators a mixer is assembled from.
pub struct MixerParts {
    pub audio_capture: Arc<dyn CaptureUnit>,
    pub video_capture: Arc<dyn CaptureUnit>,
    pub audio_codec: Box<dyn CodecUnit>,
    pub video_codec: Box<dyn CodecUnit>,
    pub link: Arc<dyn PlaybackLink>,
}

/// Routes capture output through the sync gate to the codec units, and
/// decoded output through the playback link back to the application.
pub struct Mixer {
    controller: SessionController,
    gate: Mutex<SyncGate>,
    audio_codec: Arc<SharedCodec>,
    video_codec: Arc<SharedCodec>,
    link: Arc<dyn PlaybackLink>,
    event_tx: Sender<MixerEvent>,
    metrics: Arc<MetricsCollector>,
    buffering: Arc<AtomicBool>,
}

impl Mixer {
    /// Create a mixer. The capture session is created and both capture units
    /// are attached, but nothing is started.
    pub fn new(
        config: &MixerConfig,
        factory: Arc<dyn SessionFactory>,
        parts: MixerParts,
        event_tx: Sender<MixerEvent>,
    ) -> MixerResult<Self> {
        let metrics = Arc::new(MetricsCollector::new());
        let controller = SessionController::new(
            factory,
            parts.audio_capture,
            parts.video_capture,
            ControllerSettings {
                preset: config.session_preset,
                multi_source: config.multi_source_enabled,
                capabilities: config.capabilities,
            },
            event_tx.clone(),
            Arc::clone(&metrics),
        )?;

        let audio_codec = SharedCodec::new(parts.audio_codec);
        let video_codec = SharedCodec::new(parts.video_codec);
        let buffering = Arc::new(AtomicBool::new(false));

        parts.link.set_handler(Some(Arc::new(LinkBridge {
            video_codec: Arc::clone(&video_codec),
            metrics: Arc::clone(&metrics),
            buffering: Arc::clone(&buffering),
            event_tx: event_tx.clone(),
        })));

        debug!(sync_mode = ?config.sync_mode, "Mixer created");

        Ok(Self {
            controller,
            gate: Mutex::new(SyncGate::new(config.sync_mode, config.gate)),
            audio_codec,
            video_codec,
            link: parts.link,
            event_tx,
            metrics,
            buffering,
        })
    }

    /// Create a mixer with passthrough codec units and a threaded
    /// [`MediaLink`] paced by `config.playback`.
    pub fn with_passthrough(
        config: &MixerConfig,
        factory: Arc<dyn SessionFactory>,
        audio_capture: Arc<dyn CaptureUnit>,
        video_capture: Arc<dyn CaptureUnit>,
        event_tx: Sender<MixerEvent>,
    ) -> MixerResult<Self> {
        let parts = MixerParts {
            audio_capture,
            video_capture,
            audio_codec: Box::new(PassthroughCodec::new(MediaType::Audio)),
            video_codec: Box::new(PassthroughCodec::new(MediaType::Video)),
            link: Arc::new(MediaLink::new(config.playback)),
        };
        Self::new(config, factory, parts, event_tx)
    }

    // Session lifecycle

    /// Start the capture session.
    pub fn start_running(&self) {
        self.controller.start_running();
    }

    /// Stop the capture session.
    pub fn stop_running(&self) {
        self.controller.stop_running();
    }

    /// Last observed running state of the capture session.
    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn session_preset(&self) -> SessionPreset {
        self.controller.session_preset()
    }

    pub fn set_session_preset(&self, preset: SessionPreset) {
        self.controller.set_session_preset(preset);
    }

    pub fn is_multi_source_enabled(&self) -> bool {
        self.controller.is_multi_source_enabled()
    }

    /// Swap the capture session for one of the requested kind.
    pub fn set_multi_source_enabled(&self, enabled: bool) -> MixerResult<()> {
        self.controller.set_multi_source_enabled(enabled)
    }

    /// The current capture session.
    pub fn session(&self) -> Arc<dyn CaptureSession> {
        self.controller.session()
    }

    // Synchronization

    pub fn sync_mode(&self) -> MediaSyncMode {
        self.gate.lock().mode()
    }

    /// Change the admission policy. A latched anchor is kept.
    pub fn set_sync_mode(&self, mode: MediaSyncMode) {
        self.gate.lock().set_mode(mode);
    }

    /// Whether a captured sample may go on to its codec unit.
    pub fn use_sample_buffer(&self, sample: &Sample, media_type: MediaType) -> bool {
        let admitted = self.gate.lock().admit(sample, media_type);
        self.metrics.record_admission(media_type, admitted);
        admitted
    }

    /// Gate a captured sample and hand it to its codec unit.
    ///
    /// Returns true if the sample passed the gate.
    pub fn append_sample(&self, sample: Sample) -> bool {
        let media_type = sample.media_type;
        if !self.use_sample_buffer(&sample, media_type) {
            return false;
        }

        if let Err(e) = self.codec(media_type).input_buffer(sample) {
            trace!(media = media_type.name(), "Sample not consumed: {}", e);
        }
        true
    }

    /// The latched video sync anchor.
    pub fn video_anchor(&self) -> Option<MediaTime> {
        self.gate.lock().video_anchor()
    }

    /// Seconds between the video anchor and the first admitted audio sample.
    pub fn av_offset(&self) -> Option<f64> {
        self.gate.lock().av_offset()
    }

    // Encoding

    /// Start encoding on both codec units into `sink`.
    ///
    /// The sync anchor is left as is; call [`stop_encoding`](Self::stop_encoding)
    /// first to start a fresh encode.
    #[instrument(name = "mixer_start_encoding", skip_all)]
    pub fn start_encoding(&self, sink: Sender<EncodedPacket>) {
        info!("Starting encoding");
        self.audio_codec.lock().start_encoding(sink.clone());
        self.video_codec.lock().start_encoding(sink);
    }

    /// Clear the sync anchors, then stop both codec units.
    #[instrument(name = "mixer_stop_encoding", skip_all)]
    pub fn stop_encoding(&self) {
        self.gate.lock().reset();
        self.audio_codec.lock().stop_encoding();
        self.video_codec.lock().stop_encoding();
        info!("Encoding stopped");
    }

    // Decoding

    /// Start the playback link, then decoding on both codec units.
    ///
    /// Of the mixer's own calls, only [`stop_decoding`](Self::stop_decoding)
    /// may be made from inside `output`'s callbacks.
    #[instrument(name = "mixer_start_decoding", skip_all)]
    pub fn start_decoding(&self, output: Arc<dyn DecodedOutput>) -> MixerResult<()> {
        info!("Starting decoding");
        self.link.start_running()?;
        self.audio_codec.lock().start_decoding(Arc::clone(&output));
        self.video_codec.lock().start_decoding(output);
        Ok(())
    }

    /// Stop the playback link, then decoding on both codec units.
    ///
    /// May be called from a decode output callback. The unit delivering
    /// that output stops once it has finished with the current sample.
    #[instrument(name = "mixer_stop_decoding", skip_all)]
    pub fn stop_decoding(&self) {
        // The link thread feeds the video unit; it must be gone first.
        self.link.stop_running();
        self.audio_codec.stop_decoding();
        self.video_codec.stop_decoding();
        self.buffering.store(false, Ordering::SeqCst);
        info!("Decoding stopped");
    }

    /// Hand a received sample to playback. Video is paced through the link;
    /// audio goes straight to the audio unit.
    pub fn enqueue_for_playback(&self, sample: Sample) {
        match sample.media_type {
            MediaType::Video => {
                if !self.link.enqueue(sample) {
                    self.metrics.record_frame_drop();
                }
            }
            MediaType::Audio => {
                if let Err(e) = self.audio_codec.input_buffer(sample) {
                    trace!("Audio sample not consumed: {}", e);
                }
            }
        }
    }

    /// Whether the playback link is currently starved.
    pub fn is_buffering(&self) -> bool {
        self.buffering.load(Ordering::SeqCst)
    }

    /// A decode output that reports frames as [`MixerEvent`]s.
    pub fn event_output(&self) -> Arc<dyn DecodedOutput> {
        Arc::new(EventOutput {
            event_tx: self.event_tx.clone(),
        })
    }

    // Rendering

    pub fn drawable(&self) -> Option<Arc<dyn RenderTarget>> {
        self.video_codec.lock().render_target()
    }

    pub fn set_drawable(&self, target: Option<Arc<dyn RenderTarget>>) {
        self.video_codec.lock().set_render_target(target);
    }

    /// Snapshot of the mixer counters.
    pub fn metrics(&self) -> MixerMetrics {
        self.metrics.snapshot()
    }

    fn codec(&self, media_type: MediaType) -> &Arc<SharedCodec> {
        match media_type {
            MediaType::Audio => &self.audio_codec,
            MediaType::Video => &self.video_codec,
        }
    }
}

impl Drop for Mixer {
    fn drop(&mut self) {
        self.link.stop_running();
        self.link.set_handler(None);
    }
}

/// Link callbacks back into the mixer.
struct LinkBridge {
    video_codec: Arc<SharedCodec>,
    metrics: Arc<MetricsCollector>,
    buffering: Arc<AtomicBool>,
    event_tx: Sender<MixerEvent>,
}

impl LinkHandler for LinkBridge {
    fn on_dequeue(&self, sample: Sample) {
        self.metrics.record_dequeue();
        if let Err(e) = self.video_codec.input_buffer(sample) {
            trace!("Dequeued frame not consumed: {}", e);
        }
    }

    fn on_buffering_changed(&self, is_buffering: bool) {
        self.buffering.store(is_buffering, Ordering::SeqCst);
        if is_buffering {
            self.metrics.record_underrun();
            debug!("Playback buffering");
        } else {
            debug!("Playback resumed");
        }

        if let Err(e) = self
            .event_tx
            .try_send(MixerEvent::BufferingChanged { is_buffering })
        {
            warn!("Failed to send event: {}", e);
        }
    }
}

struct EventOutput {
    event_tx: Sender<MixerEvent>,
}

impl EventOutput {
    fn send(&self, event: MixerEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            trace!("Dropping decoded output: {}", e);
        }
    }
}

impl DecodedOutput for EventOutput {
    fn on_audio_output(&self, data: Bytes, pts: MediaTime) {
        self.send(MixerEvent::AudioOutput { data, pts });
    }

    fn on_video_output(&self, sample: Sample) {
        self.send(MixerEvent::VideoOutput(sample));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crossbeam_channel::Receiver;
    use mediamix_capture::sim::{SimCaptureUnit, SimDevice, SimSessionFactory};
    use mediamix_capture::DeviceFormat;
    use mediamix_codec::CodecError;
    use mediamix_ipc::{Capabilities, PlaybackConfig};

    type Log = Arc<Mutex<Vec<String>>>;

    struct RecordingLink {
        log: Log,
        running: AtomicBool,
    }

    impl PlaybackLink for RecordingLink {
        fn set_handler(&self, _handler: Option<Arc<dyn LinkHandler>>) {}

        fn start_running(&self) -> mediamix_link::LinkResult<()> {
            self.log.lock().push("link.start".into());
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop_running(&self) {
            if self.running.swap(false, Ordering::SeqCst) {
                self.log.lock().push("link.stop".into());
            }
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn enqueue(&self, _sample: Sample) -> bool {
            true
        }
    }

    struct RecordingCodec {
        media_type: MediaType,
        log: Log,
    }

    impl RecordingCodec {
        fn record(&self, what: &str) {
            self.log
                .lock()
                .push(format!("{}.{}", self.media_type.name(), what));
        }
    }

    impl CodecUnit for RecordingCodec {
        fn media_type(&self) -> MediaType {
            self.media_type
        }

        fn start_encoding(&mut self, _sink: Sender<EncodedPacket>) {
            self.record("start_encoding");
        }

        fn stop_encoding(&mut self) {
            self.record("stop_encoding");
        }

        fn start_decoding(&mut self, _output: Arc<dyn DecodedOutput>) {
            self.record("start_decoding");
        }

        fn stop_decoding(&mut self) {
            self.record("stop_decoding");
        }

        fn input_buffer(&mut self, _sample: Sample) -> CodecResult<()> {
            Ok(())
        }
    }

    struct CountingTarget(Mutex<Vec<MediaTime>>);

    impl RenderTarget for CountingTarget {
        fn render(&self, sample: &Sample) {
            self.0.lock().push(sample.pts);
        }
    }

    fn capture_units() -> (Arc<dyn CaptureUnit>, Arc<dyn CaptureUnit>) {
        let device = Arc::new(SimDevice::new(
            "camera",
            vec![DeviceFormat::new(1280, 720, 30, true)],
        ));
        (
            Arc::new(SimCaptureUnit::microphone()),
            Arc::new(SimCaptureUnit::camera(device)),
        )
    }

    fn recording_mixer() -> (Mixer, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let (audio_capture, video_capture) = capture_units();
        let parts = MixerParts {
            audio_capture,
            video_capture,
            audio_codec: Box::new(RecordingCodec {
                media_type: MediaType::Audio,
                log: Arc::clone(&log),
            }),
            video_codec: Box::new(RecordingCodec {
                media_type: MediaType::Video,
                log: Arc::clone(&log),
            }),
            link: Arc::new(RecordingLink {
                log: Arc::clone(&log),
                running: AtomicBool::new(false),
            }),
        };
        let (event_tx, _event_rx) = crossbeam_channel::unbounded();
        let mixer = Mixer::new(
            &MixerConfig::default(),
            Arc::new(SimSessionFactory::new()),
            parts,
            event_tx,
        )
        .unwrap();
        (mixer, log)
    }

    fn passthrough_mixer(sync_mode: MediaSyncMode) -> (Mixer, Receiver<MixerEvent>) {
        mixer_with_playback(
            sync_mode,
            PlaybackConfig {
                frame_rate: 200.0,
                capacity: 16,
            },
        )
    }

    fn mixer_with_playback(
        sync_mode: MediaSyncMode,
        playback: PlaybackConfig,
    ) -> (Mixer, Receiver<MixerEvent>) {
        let config = MixerConfig {
            sync_mode,
            playback,
            ..MixerConfig::default()
        };
        let (audio_capture, video_capture) = capture_units();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let mixer = Mixer::with_passthrough(
            &config,
            Arc::new(SimSessionFactory::new()),
            audio_capture,
            video_capture,
            event_tx,
        )
        .unwrap();
        (mixer, event_rx)
    }

    fn audio(ms: i64) -> Sample {
        Sample::audio(MediaTime::from_millis(ms), Bytes::from_static(b"pcm"))
    }

    fn video(ms: i64) -> Sample {
        Sample::video(MediaTime::from_millis(ms), Bytes::from_static(b"frame"))
    }

    #[test]
    fn test_stop_decoding_stops_link_first() {
        let (mixer, log) = recording_mixer();
        mixer.start_decoding(mixer.event_output()).unwrap();
        mixer.stop_decoding();

        assert_eq!(
            *log.lock(),
            vec![
                "link.start",
                "audio.start_decoding",
                "video.start_decoding",
                "link.stop",
                "audio.stop_decoding",
                "video.stop_decoding",
            ]
        );
    }

    #[test]
    fn test_start_encoding_reaches_both_units() {
        let (mixer, log) = recording_mixer();
        let (tx, _rx) = mediamix_codec::packet_channel();
        mixer.start_encoding(tx);
        mixer.stop_encoding();

        assert_eq!(
            *log.lock(),
            vec![
                "audio.start_encoding",
                "video.start_encoding",
                "audio.stop_encoding",
                "video.stop_encoding",
            ]
        );
    }

    #[test]
    fn test_gated_encode_drops_early_audio() {
        let (mixer, _events) = passthrough_mixer(MediaSyncMode::VideoGated);
        let (tx, rx) = mediamix_codec::packet_channel();
        mixer.start_encoding(tx);

        assert!(!mixer.append_sample(audio(900)));
        assert!(mixer.append_sample(video(1_000)));
        assert!(!mixer.append_sample(audio(990)));
        assert!(mixer.append_sample(audio(1_010)));

        let packets: Vec<_> = rx.try_iter().collect();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].media_type, MediaType::Video);
        assert!(packets[0].is_keyframe);
        assert_eq!(packets[1].pts, MediaTime::from_millis(1_010));

        let metrics = mixer.metrics();
        assert_eq!(metrics.audio_dropped, 2);
        assert_eq!(metrics.audio_admitted, 1);
        assert_eq!(metrics.video_admitted, 1);
    }

    #[test]
    fn test_stop_encoding_resets_anchor() {
        let (mixer, _events) = passthrough_mixer(MediaSyncMode::VideoGated);
        let (tx, _rx) = mediamix_codec::packet_channel();
        mixer.start_encoding(tx.clone());
        mixer.append_sample(video(500));
        mixer.append_sample(audio(600));
        assert!(mixer.av_offset().is_some());

        mixer.stop_encoding();
        mixer.stop_encoding();
        assert!(mixer.video_anchor().is_none());
        assert!(mixer.av_offset().is_none());

        mixer.start_encoding(tx);
        assert!(!mixer.use_sample_buffer(&audio(600), MediaType::Audio));
    }

    #[test]
    fn test_restart_without_stop_keeps_anchor() {
        let (mixer, _events) = passthrough_mixer(MediaSyncMode::VideoGated);
        let (tx, _rx) = mediamix_codec::packet_channel();
        mixer.start_encoding(tx.clone());
        mixer.append_sample(video(500));
        mixer.start_encoding(tx);

        assert_eq!(mixer.video_anchor(), Some(MediaTime::from_millis(500)));
    }

    #[test]
    fn test_passthrough_mode_admits_all() {
        let (mixer, _events) = passthrough_mixer(MediaSyncMode::Passthrough);
        assert!(mixer.use_sample_buffer(&audio(0), MediaType::Audio));
        assert!(mixer.use_sample_buffer(&video(0), MediaType::Video));

        mixer.set_sync_mode(MediaSyncMode::VideoGated);
        assert_eq!(mixer.sync_mode(), MediaSyncMode::VideoGated);
        assert!(!mixer.use_sample_buffer(&audio(0), MediaType::Audio));
    }

    #[test]
    fn test_decode_path_reports_frames() {
        let (mixer, events) = passthrough_mixer(MediaSyncMode::Passthrough);
        let target = Arc::new(CountingTarget(Mutex::new(Vec::new())));
        mixer.set_drawable(Some(target.clone()));
        assert!(mixer.drawable().is_some());

        mixer.start_decoding(mixer.event_output()).unwrap();
        mixer.enqueue_for_playback(audio(0));
        mixer.enqueue_for_playback(video(0));

        let mut saw_audio = false;
        let mut saw_video = false;
        while !(saw_audio && saw_video) {
            match events.recv_timeout(Duration::from_secs(2)).unwrap() {
                MixerEvent::AudioOutput { pts, .. } => {
                    assert_eq!(pts, MediaTime::ZERO);
                    saw_audio = true;
                }
                MixerEvent::VideoOutput(sample) => {
                    assert_eq!(sample.pts, MediaTime::ZERO);
                    saw_video = true;
                }
                _ => {}
            }
        }

        mixer.stop_decoding();
        assert_eq!(*target.0.lock(), vec![MediaTime::ZERO]);
        assert!(mixer.metrics().frames_dequeued >= 1);
    }

    #[test]
    fn test_empty_link_reports_buffering() {
        let (mixer, events) = passthrough_mixer(MediaSyncMode::Passthrough);
        mixer.start_decoding(mixer.event_output()).unwrap();

        loop {
            if let MixerEvent::BufferingChanged { is_buffering } =
                events.recv_timeout(Duration::from_secs(2)).unwrap()
            {
                assert!(is_buffering);
                break;
            }
        }
        assert!(mixer.is_buffering());
        assert!(mixer.metrics().underruns >= 1);

        mixer.stop_decoding();
        assert!(!mixer.is_buffering());
    }

    #[test]
    fn test_session_lifecycle_through_mixer() {
        let (mixer, events) = passthrough_mixer(MediaSyncMode::Passthrough);
        mixer.start_running();
        assert!(mixer.is_running());
        assert!(mixer.session().is_running());

        mixer.set_session_preset(SessionPreset::Vga640x480);
        mixer.set_multi_source_enabled(true).unwrap();
        assert!(mixer.is_multi_source_enabled());
        assert!(!mixer.is_running());
        assert_eq!(mixer.session().preset(), SessionPreset::Vga640x480);

        let running: Vec<bool> = events
            .try_iter()
            .filter_map(|e| match e {
                MixerEvent::RunningChanged { is_running } => Some(is_running),
                _ => None,
            })
            .collect();
        assert_eq!(running, vec![true, false]);
    }

    #[test]
    fn test_multi_source_requires_capability() {
        let config = MixerConfig {
            multi_source_enabled: true,
            capabilities: Capabilities {
                multitasking_camera_access: false,
                multi_source_session: false,
            },
            ..MixerConfig::default()
        };
        let (audio_capture, video_capture) = capture_units();
        let (event_tx, _event_rx) = crossbeam_channel::unbounded();
        let result = Mixer::with_passthrough(
            &config,
            Arc::new(SimSessionFactory::new()),
            audio_capture,
            video_capture,
            event_tx,
        );
        assert!(matches!(result, Err(crate::MixerError::MultiSourceUnsupported)));
    }

    /// Stops decoding from inside its own callback.
    struct StoppingOutput {
        mixer: Mutex<Option<std::sync::Weak<Mixer>>>,
        stopped: Sender<MediaType>,
    }

    impl StoppingOutput {
        fn new(stopped: Sender<MediaType>) -> Arc<Self> {
            Arc::new(Self {
                mixer: Mutex::new(None),
                stopped,
            })
        }

        fn attach(&self, mixer: &Arc<Mixer>) {
            *self.mixer.lock() = Some(Arc::downgrade(mixer));
        }

        fn stop(&self, media_type: MediaType) {
            let mixer = self.mixer.lock().as_ref().and_then(|m| m.upgrade());
            if let Some(mixer) = mixer {
                mixer.stop_decoding();
                let _ = self.stopped.send(media_type);
            }
        }
    }

    impl DecodedOutput for StoppingOutput {
        fn on_audio_output(&self, _data: Bytes, _pts: MediaTime) {
            self.stop(MediaType::Audio);
        }

        fn on_video_output(&self, _sample: Sample) {
            self.stop(MediaType::Video);
        }
    }

    #[test]
    fn test_stop_decoding_from_video_output() {
        let (mixer, _events) = passthrough_mixer(MediaSyncMode::Passthrough);
        let mixer = Arc::new(mixer);
        let (tx, rx) = crossbeam_channel::unbounded();
        let output = StoppingOutput::new(tx);
        output.attach(&mixer);

        mixer.start_decoding(output.clone()).unwrap();
        mixer.enqueue_for_playback(video(0));

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            MediaType::Video
        );
        assert!(!mixer.link.is_running());

        // Waits out the pacing thread's feed, after which the deferred stop
        // has been applied.
        assert!(matches!(
            mixer.video_codec.lock().input_buffer(video(1)),
            Err(CodecError::NotRunning)
        ));

        mixer.enqueue_for_playback(audio(0));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_decoding_from_audio_output() {
        let (mixer, _events) = passthrough_mixer(MediaSyncMode::Passthrough);
        let mixer = Arc::new(mixer);
        let (tx, rx) = crossbeam_channel::unbounded();
        let output = StoppingOutput::new(tx);
        output.attach(&mixer);

        mixer.start_decoding(output.clone()).unwrap();
        mixer.enqueue_for_playback(audio(0));

        assert_eq!(rx.try_recv().unwrap(), MediaType::Audio);
        assert!(!mixer.link.is_running());
        assert!(matches!(
            mixer.audio_codec.lock().input_buffer(audio(1)),
            Err(CodecError::NotRunning)
        ));

        // Decoding can be started again afterwards.
        mixer.start_decoding(output.clone()).unwrap();
        mixer.enqueue_for_playback(audio(2));
        assert_eq!(rx.try_recv().unwrap(), MediaType::Audio);
    }

    #[test]
    fn test_full_playback_queue_counts_drops() {
        let (mixer, _events) = mixer_with_playback(
            MediaSyncMode::Passthrough,
            PlaybackConfig {
                frame_rate: 30.0,
                capacity: 2,
            },
        );

        for ms in [0, 33, 66] {
            mixer.enqueue_for_playback(video(ms));
        }

        assert_eq!(mixer.metrics().frames_dropped, 1);
    }

    #[test]
    fn test_concurrent_stop_encoding_keeps_gate_consistent() {
        const THREADS: usize = 4;
        const OPS: i64 = 500;

        let (mixer, _events) = passthrough_mixer(MediaSyncMode::VideoGated);
        let (tx, rx) = mediamix_codec::packet_channel();
        mixer.start_encoding(tx);

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let mixer = &mixer;
                s.spawn(move || {
                    for i in 0..OPS {
                        match t {
                            0 => {
                                mixer.append_sample(video(1 + i * 2));
                            }
                            1 => {
                                mixer.append_sample(audio(i * 2));
                            }
                            2 => {
                                mixer.append_sample(audio(i * 2 + 1));
                            }
                            _ => mixer.stop_encoding(),
                        }
                        if let Some(offset) = mixer.av_offset() {
                            assert!(offset >= 0.0, "audio admitted before anchor");
                        }
                    }
                });
            }
        });
        drop(rx);

        let metrics = mixer.metrics();
        assert_eq!(metrics.video_admitted + metrics.video_dropped, OPS as u64);
        assert_eq!(metrics.audio_admitted + metrics.audio_dropped, 2 * OPS as u64);
        assert_eq!(metrics.video_dropped, 0);
    }
}
