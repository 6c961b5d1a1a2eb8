//! Capture session lifecycle and fault recovery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use mediamix_capture::{
    find_video_format, CaptureSession, CaptureUnit, RuntimeErrorCode, SessionConfig,
    SessionEvent, SessionFactory, SessionObserver,
};
use mediamix_ipc::{Capabilities, MixerEvent, SessionPreset};

use crate::error::MixerError;
use crate::metrics::MetricsCollector;
use crate::MixerResult;

/// The session currently owned by the controller.
struct SessionSlot {
    session: Arc<dyn CaptureSession>,
    /// Bumped on every swap so events from a replaced session are ignored.
    generation: u64,
    preset: SessionPreset,
    multi_source: bool,
    detached_for_background: bool,
}

struct ControllerShared {
    factory: Arc<dyn SessionFactory>,
    audio: Arc<dyn CaptureUnit>,
    video: Arc<dyn CaptureUnit>,
    capabilities: Capabilities,
    running: AtomicBool,
    slot: Mutex<SessionSlot>,
    event_tx: Sender<MixerEvent>,
    metrics: Arc<MetricsCollector>,
}

/// Forwards events from one session instance back to the controller.
struct FaultObserver {
    controller: Weak<ControllerShared>,
    generation: u64,
}

impl SessionObserver for FaultObserver {
    fn on_session_event(&self, event: SessionEvent) {
        if let Some(controller) = self.controller.upgrade() {
            controller.handle_event(self.generation, event);
        }
    }
}

/// Owns the capture session and keeps the running flag in step with it.
///
/// Start, stop, session swaps, preset changes, and fault recovery all run
/// under one lock, so the flag only ever holds a state the session was
/// actually observed in.
pub struct SessionController {
    shared: Arc<ControllerShared>,
}

/// Settings the controller is created with.
pub struct ControllerSettings {
    /// Initial preset.
    pub preset: SessionPreset,

    /// Start with a multi-source session.
    pub multi_source: bool,

    /// Platform capability flags.
    pub capabilities: Capabilities,
}

impl SessionController {
    /// Create the first session and attach both capture units to it.
    #[instrument(name = "session_controller_new", skip_all)]
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        audio: Arc<dyn CaptureUnit>,
        video: Arc<dyn CaptureUnit>,
        settings: ControllerSettings,
        event_tx: Sender<MixerEvent>,
        metrics: Arc<MetricsCollector>,
    ) -> MixerResult<Self> {
        if settings.multi_source && !settings.capabilities.multi_source_session {
            return Err(MixerError::MultiSourceUnsupported);
        }

        let session = factory.create_session(&SessionConfig {
            multi_source: settings.multi_source,
        })?;
        apply_preset(session.as_ref(), settings.preset);
        audio.attach_session(&session);
        video.attach_session(&session);

        debug!(preset = ?settings.preset, multi_source = settings.multi_source, "Session created");

        let shared = ControllerShared {
            factory,
            audio,
            video,
            capabilities: settings.capabilities,
            running: AtomicBool::new(false),
            slot: Mutex::new(SessionSlot {
                session,
                generation: 0,
                preset: settings.preset,
                multi_source: settings.multi_source,
                detached_for_background: false,
            }),
            event_tx,
            metrics,
        };

        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// Last observed running state of the session.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Start the session. The running flag afterwards reflects whether it
    /// actually started.
    #[instrument(name = "session_start", skip(self))]
    pub fn start_running(&self) {
        let slot = self.shared.slot.lock();
        if self.is_running() {
            debug!("Session already running, ignoring start");
            return;
        }

        info!("Starting capture session");
        slot.session
            .set_observer(Some(self.shared.observer(slot.generation)));
        slot.session.start_running();

        if self.shared.sync_running(slot.session.as_ref()) {
            info!("Capture session running");
        } else {
            warn!(inputs = slot.session.input_count(), "Capture session did not start");
            slot.session.set_observer(None);
        }
    }

    /// Stop the session.
    #[instrument(name = "session_stop", skip(self))]
    pub fn stop_running(&self) {
        let mut slot = self.shared.slot.lock();
        if !self.is_running() {
            debug!("Session not running, ignoring stop");
            return;
        }

        info!("Stopping capture session");
        slot.session.set_observer(None);
        slot.session.stop_running();

        // Leave the session startable even if we were stopped while
        // backgrounded; no foreground event will reach us now.
        if slot.detached_for_background {
            self.shared.attach_units(&slot.session);
            slot.detached_for_background = false;
        }

        self.shared.sync_running(slot.session.as_ref());
        info!("Capture session stopped");
    }

    /// The configured preset.
    pub fn session_preset(&self) -> SessionPreset {
        self.shared.slot.lock().preset
    }

    /// Change the preset. It is remembered even if the current session
    /// rejects it, and reapplied to future sessions.
    #[instrument(name = "session_set_preset", skip(self))]
    pub fn set_session_preset(&self, preset: SessionPreset) {
        let mut slot = self.shared.slot.lock();
        if slot.preset == preset {
            return;
        }
        slot.preset = preset;
        apply_preset(slot.session.as_ref(), preset);
    }

    /// Whether the current session is a multi-source session.
    pub fn is_multi_source_enabled(&self) -> bool {
        self.shared.slot.lock().multi_source
    }

    /// Replace the session with one of the requested kind.
    ///
    /// The old session is stopped if running and both capture units move to
    /// the new one. The new session is not started.
    #[instrument(name = "session_swap", skip(self))]
    pub fn set_multi_source_enabled(&self, enabled: bool) -> MixerResult<()> {
        if enabled && !self.shared.capabilities.multi_source_session {
            return Err(MixerError::MultiSourceUnsupported);
        }

        let mut slot = self.shared.slot.lock();
        if slot.multi_source == enabled {
            return Ok(());
        }

        let session = self.shared.factory.create_session(&SessionConfig {
            multi_source: enabled,
        })?;
        let old = std::mem::replace(&mut slot.session, session);

        old.set_observer(None);
        if old.is_running() {
            old.stop_running();
        }
        self.shared.audio.detach_session(&old);
        self.shared.video.detach_session(&old);

        slot.generation += 1;
        slot.multi_source = enabled;
        slot.detached_for_background = false;

        apply_preset(slot.session.as_ref(), slot.preset);
        self.shared.attach_units(&slot.session);
        self.shared.sync_running(slot.session.as_ref());

        info!(multi_source = enabled, "Capture session replaced");
        Ok(())
    }

    /// The current session handle.
    pub fn session(&self) -> Arc<dyn CaptureSession> {
        Arc::clone(&self.shared.slot.lock().session)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let slot = self.shared.slot.lock();
        slot.session.set_observer(None);
        if self.shared.running.swap(false, Ordering::SeqCst) {
            slot.session.stop_running();
        }
    }
}

impl ControllerShared {
    fn observer(self: &Arc<Self>, generation: u64) -> Arc<dyn SessionObserver> {
        Arc::new(FaultObserver {
            controller: Arc::downgrade(self),
            generation,
        })
    }

    /// Copy the session's real state into the flag. Returns the new state.
    fn sync_running(&self, session: &dyn CaptureSession) -> bool {
        let now = session.is_running();
        let previous = self.running.swap(now, Ordering::SeqCst);
        if previous != now {
            debug!(is_running = now, "Running state changed");
            self.send_event(MixerEvent::RunningChanged { is_running: now });
        }
        now
    }

    fn attach_units(&self, session: &Arc<dyn CaptureSession>) {
        self.audio.attach_session(session);
        self.video.attach_session(session);
    }

    fn detach_units(&self, session: &Arc<dyn CaptureSession>) {
        self.audio.detach_session(session);
        self.video.detach_session(session);
    }

    fn handle_event(&self, generation: u64, event: SessionEvent) {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            trace!(?event, "Ignoring event from a replaced session");
            return;
        }

        match event {
            SessionEvent::RuntimeError(code) => {
                warn!(code = code.code(), ?code, "Capture session runtime error");
                if !self.running.load(Ordering::SeqCst) {
                    debug!("Session stopped, skipping recovery");
                    return;
                }
                let recovered = match code {
                    RuntimeErrorCode::UnsupportedDeviceActiveFormat => {
                        self.recover_active_format(&slot)
                    }
                    RuntimeErrorCode::MediaServicesWereReset => self.recover_media_services(&slot),
                    RuntimeErrorCode::Other(_) => false,
                };
                if recovered {
                    self.metrics.record_recovery();
                }
            }
            SessionEvent::WasInterrupted(reason) => {
                info!(?reason, "Capture session interrupted");
                self.send_event(MixerEvent::SessionInterrupted { reason });
            }
            SessionEvent::InterruptionEnded(reason) => {
                info!(?reason, "Capture session interruption ended");
                self.send_event(MixerEvent::SessionInterruptionEnded { reason });
            }
            SessionEvent::DidEnterBackground => {
                if self.capabilities.multitasking_camera_access
                    || !self.running.load(Ordering::SeqCst)
                    || slot.detached_for_background
                {
                    return;
                }
                info!("Entering background, detaching capture units");
                self.detach_units(&slot.session);
                slot.detached_for_background = true;
            }
            SessionEvent::WillEnterForeground => {
                if self.capabilities.multitasking_camera_access || !slot.detached_for_background {
                    return;
                }
                info!("Returning to foreground, reattaching capture units");
                self.attach_units(&slot.session);
                slot.detached_for_background = false;
            }
        }
    }

    /// Switch the camera to a format that fits the preset and restart.
    fn recover_active_format(&self, slot: &SessionSlot) -> bool {
        let Some(device) = self.video.device() else {
            warn!("Video unit has no device, cannot reformat");
            return false;
        };
        let Some((width, height)) = slot.preset.dimensions() else {
            warn!(preset = ?slot.preset, "Preset has no fixed size, cannot pick a format");
            return false;
        };
        let multi_source = slot.session.is_multi_source();
        let Some(format) = find_video_format(&device.formats(), width, height, multi_source) else {
            warn!(width, height, multi_source, "No device format fits the preset");
            return false;
        };
        if device.active_format() == Some(format) {
            warn!(width, height, "Device already uses the matching format");
            return false;
        }

        if let Err(e) = device.lock_for_configuration() {
            warn!("Cannot lock {} for configuration: {}", device.name(), e);
            return false;
        }
        let applied = device.set_active_format(format);
        device.unlock_for_configuration();
        if let Err(e) = applied {
            warn!("Failed to apply device format: {}", e);
            return false;
        }

        info!(
            width = format.width,
            height = format.height,
            "Device reformatted, restarting session"
        );
        slot.session.start_running();
        self.sync_running(slot.session.as_ref());
        true
    }

    /// Restart a session the system tore down while we meant it to run.
    fn recover_media_services(&self, slot: &SessionSlot) -> bool {
        if slot.session.is_running() {
            return false;
        }
        info!("Media services reset, restarting session");
        slot.session.start_running();
        self.sync_running(slot.session.as_ref())
    }

    fn send_event(&self, event: MixerEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

/// Apply `preset` inside a configuration bracket if the session takes it.
fn apply_preset(session: &dyn CaptureSession, preset: SessionPreset) {
    if !session.can_set_preset(preset) {
        debug!(?preset, "Session rejects preset, keeping {:?}", session.preset());
        return;
    }
    session.begin_configuration();
    session.set_preset(preset);
    session.commit_configuration();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Receiver;
    use mediamix_capture::sim::{SimCaptureUnit, SimDevice, SimSession, SimSessionFactory};
    use mediamix_capture::{CaptureDevice, DeviceFormat};
    use mediamix_ipc::InterruptionReason;

    struct Fixture {
        controller: SessionController,
        factory: Arc<SimSessionFactory>,
        device: Arc<SimDevice>,
        mic: Arc<SimCaptureUnit>,
        camera: Arc<SimCaptureUnit>,
        events: Receiver<MixerEvent>,
    }

    impl Fixture {
        fn session(&self) -> Arc<SimSession> {
            self.factory.current().unwrap()
        }

        fn events(&self) -> Vec<MixerEvent> {
            self.events.try_iter().collect()
        }
    }

    const HD: DeviceFormat = DeviceFormat {
        width: 1280,
        height: 720,
        max_frame_rate: 30,
        multi_source_supported: false,
    };

    const VGA: DeviceFormat = DeviceFormat {
        width: 640,
        height: 480,
        max_frame_rate: 30,
        multi_source_supported: true,
    };

    fn fixture_with(
        factory: SimSessionFactory,
        formats: Vec<DeviceFormat>,
        capabilities: Capabilities,
    ) -> Fixture {
        let factory = Arc::new(factory);
        let device = Arc::new(SimDevice::new("camera", formats));
        let mic = Arc::new(SimCaptureUnit::microphone());
        let camera = Arc::new(SimCaptureUnit::camera(Arc::clone(&device)));
        let (event_tx, events) = crossbeam_channel::unbounded();

        let controller = SessionController::new(
            factory.clone(),
            mic.clone(),
            camera.clone(),
            ControllerSettings {
                preset: SessionPreset::Hd1280x720,
                multi_source: false,
                capabilities,
            },
            event_tx,
            Arc::new(MetricsCollector::new()),
        )
        .unwrap();

        Fixture {
            controller,
            factory,
            device,
            mic,
            camera,
            events,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(SimSessionFactory::new(), vec![VGA, HD], Capabilities::default())
    }

    #[test]
    fn test_new_session_has_preset_and_inputs() {
        let f = fixture();
        let session = f.session();
        assert_eq!(session.preset(), SessionPreset::Hd1280x720);
        assert_eq!(session.input_count(), 2);
        assert!(!f.controller.is_running());
    }

    #[test]
    fn test_start_reflects_real_state() {
        let f = fixture();
        f.mic.detach_session(&f.controller.session());
        f.camera.detach_session(&f.controller.session());

        f.controller.start_running();
        assert!(!f.controller.is_running());
        assert_eq!(f.session().start_calls(), 1);
        assert!(!f.session().has_observer());
        assert!(f.events().is_empty());
    }

    #[test]
    fn test_start_twice_starts_once() {
        let f = fixture();
        f.controller.start_running();
        f.controller.start_running();

        assert!(f.controller.is_running());
        assert_eq!(f.session().start_calls(), 1);
        assert!(f.session().has_observer());
        assert!(matches!(
            f.events().as_slice(),
            [MixerEvent::RunningChanged { is_running: true }]
        ));
    }

    #[test]
    fn test_stop_when_stopped_does_nothing() {
        let f = fixture();
        f.controller.stop_running();
        assert_eq!(f.session().stop_calls(), 0);

        f.controller.start_running();
        f.controller.stop_running();
        f.controller.stop_running();
        assert_eq!(f.session().stop_calls(), 1);
        assert!(!f.controller.is_running());
        assert!(!f.session().has_observer());
    }

    #[test]
    fn test_format_fault_reformats_and_restarts_once() {
        let f = fixture();
        f.controller.start_running();
        assert_eq!(f.device.active_format(), Some(VGA));

        f.session().emit(SessionEvent::RuntimeError(
            RuntimeErrorCode::UnsupportedDeviceActiveFormat,
        ));

        assert_eq!(f.device.active_format(), Some(HD));
        assert_eq!(f.device.format_changes(), 1);
        assert!(!f.device.is_locked());
        assert_eq!(f.session().start_calls(), 2);
        assert!(f.controller.is_running());
    }

    #[test]
    fn test_format_fault_without_match_does_nothing() {
        let f = fixture_with(SimSessionFactory::new(), vec![VGA], Capabilities::default());
        f.controller.start_running();

        f.session().emit(SessionEvent::RuntimeError(
            RuntimeErrorCode::UnsupportedDeviceActiveFormat,
        ));

        assert_eq!(f.device.format_changes(), 0);
        assert_eq!(f.session().start_calls(), 1);
        assert!(f.controller.is_running());
    }

    #[test]
    fn test_format_fault_on_current_format_does_nothing() {
        let f = fixture();
        f.device.force_active_format(Some(HD));
        f.controller.start_running();

        f.session().emit(SessionEvent::RuntimeError(
            RuntimeErrorCode::UnsupportedDeviceActiveFormat,
        ));
        assert_eq!(f.session().start_calls(), 1);
    }

    #[test]
    fn test_format_fault_with_refused_lock() {
        let f = fixture();
        f.device.set_refuse_lock(true);
        f.controller.start_running();

        f.session().emit(SessionEvent::RuntimeError(
            RuntimeErrorCode::UnsupportedDeviceActiveFormat,
        ));
        assert_eq!(f.device.active_format(), Some(VGA));
        assert_eq!(f.session().start_calls(), 1);
    }

    #[test]
    fn test_media_services_reset_restarts() {
        let f = fixture();
        f.controller.start_running();
        f.session().tear_down();

        f.session().emit(SessionEvent::RuntimeError(
            RuntimeErrorCode::MediaServicesWereReset,
        ));
        assert_eq!(f.session().start_calls(), 2);
        assert!(f.session().is_running());
        assert!(f.controller.is_running());
    }

    #[test]
    fn test_media_services_reset_on_live_session_is_ignored() {
        let f = fixture();
        f.controller.start_running();
        f.session().emit(SessionEvent::RuntimeError(
            RuntimeErrorCode::MediaServicesWereReset,
        ));
        assert_eq!(f.session().start_calls(), 1);
    }

    #[test]
    fn test_events_after_stop_are_ignored() {
        let f = fixture();
        f.controller.start_running();
        let observer = f.shared_observer();
        f.controller.stop_running();

        observer.on_session_event(SessionEvent::RuntimeError(
            RuntimeErrorCode::MediaServicesWereReset,
        ));
        observer.on_session_event(SessionEvent::DidEnterBackground);
        assert_eq!(f.session().start_calls(), 1);
        assert_eq!(f.session().input_count(), 2);
        assert!(!f.controller.is_running());
    }

    #[test]
    fn test_interruptions_are_forwarded() {
        let f = fixture();
        f.controller.start_running();
        f.events();

        let reason = InterruptionReason::VideoDeviceInUseByAnotherClient;
        f.session().emit(SessionEvent::WasInterrupted(reason));
        f.session().emit(SessionEvent::InterruptionEnded(reason));

        let events = f.events();
        assert!(matches!(
            events.as_slice(),
            [
                MixerEvent::SessionInterrupted { reason: a },
                MixerEvent::SessionInterruptionEnded { reason: b },
            ] if *a == reason && *b == reason
        ));
        assert!(f.controller.is_running());
    }

    #[test]
    fn test_background_detaches_without_stopping() {
        let f = fixture();
        f.controller.start_running();

        f.session().emit(SessionEvent::DidEnterBackground);
        assert_eq!(f.session().input_count(), 0);
        assert_eq!(f.session().stop_calls(), 0);

        f.session().emit(SessionEvent::WillEnterForeground);
        assert_eq!(f.session().input_count(), 2);
        assert!(f.controller.is_running());
    }

    #[test]
    fn test_background_ignored_with_multitasking_access() {
        let f = fixture_with(
            SimSessionFactory::new(),
            vec![VGA, HD],
            Capabilities {
                multitasking_camera_access: true,
                multi_source_session: true,
            },
        );
        f.controller.start_running();
        f.session().emit(SessionEvent::DidEnterBackground);
        assert_eq!(f.session().input_count(), 2);
    }

    #[test]
    fn test_stop_while_backgrounded_reattaches() {
        let f = fixture();
        f.controller.start_running();
        f.session().emit(SessionEvent::DidEnterBackground);
        f.controller.stop_running();

        assert_eq!(f.session().input_count(), 2);
        f.controller.start_running();
        assert!(f.controller.is_running());
    }

    #[test]
    fn test_swap_preserves_preset() {
        let f = fixture();
        f.controller.set_session_preset(SessionPreset::Hd1920x1080);
        f.controller.set_multi_source_enabled(true).unwrap();

        let sessions = f.factory.sessions();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[1].is_multi_source());
        assert_eq!(sessions[1].preset(), SessionPreset::Hd1920x1080);
        assert!(f.controller.is_multi_source_enabled());
    }

    #[test]
    fn test_swap_skips_incompatible_preset() {
        let f = fixture_with(
            SimSessionFactory::new().with_multi_source_presets(vec![SessionPreset::InputPriority]),
            vec![VGA, HD],
            Capabilities::default(),
        );
        f.controller.set_multi_source_enabled(true).unwrap();

        assert_ne!(f.session().preset(), SessionPreset::Hd1280x720);
        assert_eq!(f.controller.session_preset(), SessionPreset::Hd1280x720);
    }

    #[test]
    fn test_swap_stops_old_session_and_moves_units() {
        let f = fixture();
        f.controller.start_running();
        f.controller.set_multi_source_enabled(true).unwrap();

        let sessions = f.factory.sessions();
        let (old, new) = (&sessions[0], &sessions[1]);
        assert_eq!(old.stop_calls(), 1);
        assert!(!old.has_observer());
        assert_eq!(old.input_count(), 0);
        assert_eq!(new.input_count(), 2);
        assert!(!f.controller.is_running());

        // Events from the replaced session are stale.
        old.set_observer(Some(f.shared_observer_for(0)));
        old.tear_down();
        old.emit(SessionEvent::RuntimeError(RuntimeErrorCode::MediaServicesWereReset));
        assert_eq!(old.start_calls(), 1);
    }

    #[test]
    fn test_swap_attaches_audio_then_video() {
        let f = fixture();
        f.controller.set_multi_source_enabled(true).unwrap();

        let sessions = f.factory.sessions();
        assert!(sessions[0].inputs().is_empty());
        assert_eq!(
            sessions[1].inputs(),
            vec![f.mic.input_name(), f.camera.input_name()]
        );
    }

    #[test]
    fn test_concurrent_lifecycle_keeps_flag_in_step() {
        const THREADS: usize = 4;
        const OPS: usize = 500;

        let f = fixture();
        let check = |f: &Fixture| {
            let slot = f.controller.shared.slot.lock();
            assert_eq!(f.controller.is_running(), slot.session.is_running());
        };

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let f = &f;
                s.spawn(move || {
                    for i in 0..OPS {
                        let session = f.factory.current().unwrap();
                        match (t + i) % 6 {
                            0 => f.controller.start_running(),
                            1 => f.controller.stop_running(),
                            2 => f.controller.set_multi_source_enabled(i % 2 == 0).unwrap(),
                            3 => {
                                session.emit(SessionEvent::RuntimeError(
                                    RuntimeErrorCode::UnsupportedDeviceActiveFormat,
                                ));
                            }
                            4 => {
                                session.emit(SessionEvent::DidEnterBackground);
                                session.emit(SessionEvent::WillEnterForeground);
                            }
                            _ => {
                                session.emit(SessionEvent::WasInterrupted(
                                    InterruptionReason::AudioDeviceInUseByAnotherClient,
                                ));
                            }
                        }
                        check(f);
                    }
                });
            }
        });

        check(&f);
    }

    #[test]
    fn test_swap_to_same_mode_is_noop() {
        let f = fixture();
        f.controller.set_multi_source_enabled(false).unwrap();
        assert_eq!(f.factory.sessions().len(), 1);
    }

    #[test]
    fn test_swap_without_capability() {
        let f = fixture_with(
            SimSessionFactory::new(),
            vec![VGA, HD],
            Capabilities {
                multitasking_camera_access: false,
                multi_source_session: false,
            },
        );
        assert!(matches!(
            f.controller.set_multi_source_enabled(true),
            Err(MixerError::MultiSourceUnsupported)
        ));
        assert_eq!(f.factory.sessions().len(), 1);
    }

    #[test]
    fn test_preset_change_uses_configuration_bracket() {
        let f = fixture();
        let commits = f.session().commits();
        f.controller.set_session_preset(SessionPreset::Vga640x480);

        assert_eq!(f.session().preset(), SessionPreset::Vga640x480);
        assert_eq!(f.session().commits(), commits + 1);
        assert!(!f.session().is_configuring());

        f.controller.set_session_preset(SessionPreset::Vga640x480);
        assert_eq!(f.session().commits(), commits + 1);
    }

    #[test]
    fn test_drop_stops_session() {
        let f = fixture();
        f.controller.start_running();
        let session = f.session();
        drop(f);

        assert!(!session.is_running());
        assert!(!session.has_observer());
    }

    impl Fixture {
        fn shared_observer(&self) -> Arc<dyn SessionObserver> {
            let generation = self.controller.shared.slot.lock().generation;
            self.shared_observer_for(generation)
        }

        fn shared_observer_for(&self, generation: u64) -> Arc<dyn SessionObserver> {
            self.controller.shared.observer(generation)
        }
    }
}
