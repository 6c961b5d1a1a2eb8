//! Simulated capture session and factory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use mediamix_ipc::SessionPreset;

use crate::error::CaptureError;
use crate::session::{
    CaptureSession, SessionConfig, SessionEvent, SessionFactory, SessionObserver,
};
use crate::CaptureResult;

struct SimSessionState {
    running: bool,
    preset: SessionPreset,
    inputs: Vec<String>,
    config_depth: u32,
    observer: Option<Arc<dyn SessionObserver>>,
}

/// A simulated capture session.
pub struct SimSession {
    multi_source: bool,
    supported_presets: Option<Vec<SessionPreset>>,
    state: Mutex<SimSessionState>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    commits: AtomicUsize,
}

impl SimSession {
    /// Create a session accepting every preset.
    pub fn new(multi_source: bool) -> Self {
        Self::with_presets(multi_source, None)
    }

    /// Create a session that only accepts the given presets, or every preset
    /// when `None`.
    pub fn with_presets(multi_source: bool, supported_presets: Option<Vec<SessionPreset>>) -> Self {
        Self {
            multi_source,
            supported_presets,
            state: Mutex::new(SimSessionState {
                running: false,
                preset: SessionPreset::High,
                inputs: Vec::new(),
                config_depth: 0,
                observer: None,
            }),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        }
    }

    /// Deliver an event to the registered observer, if any.
    ///
    /// Returns false when no observer is registered.
    pub fn emit(&self, event: SessionEvent) -> bool {
        let observer = self.state.lock().observer.clone();
        match observer {
            Some(observer) => {
                trace!(?event, "Delivering session event");
                observer.on_session_event(event);
                true
            }
            None => false,
        }
    }

    /// Stop the session behind the caller's back, the way a media services
    /// reset does.
    pub fn tear_down(&self) {
        self.state.lock().running = false;
    }

    /// Whether an observer is registered.
    pub fn has_observer(&self) -> bool {
        self.state.lock().observer.is_some()
    }

    /// Names of attached inputs.
    pub fn inputs(&self) -> Vec<String> {
        self.state.lock().inputs.clone()
    }

    /// Number of `start_running` calls.
    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    /// Number of `stop_running` calls.
    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Number of closed configuration brackets.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Whether a configuration bracket is open.
    pub fn is_configuring(&self) -> bool {
        self.state.lock().config_depth > 0
    }
}

impl CaptureSession for SimSession {
    fn is_running(&self) -> bool {
        self.state.lock().running
    }

    fn start_running(&self) {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.running = !state.inputs.is_empty();
        debug!(running = state.running, inputs = state.inputs.len(), "Sim session start");
    }

    fn stop_running(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().running = false;
        debug!("Sim session stop");
    }

    fn begin_configuration(&self) {
        self.state.lock().config_depth += 1;
    }

    fn commit_configuration(&self) {
        let mut state = self.state.lock();
        state.config_depth = state.config_depth.saturating_sub(1);
        self.commits.fetch_add(1, Ordering::SeqCst);
    }

    fn can_set_preset(&self, preset: SessionPreset) -> bool {
        self.supported_presets
            .as_ref()
            .map_or(true, |presets| presets.contains(&preset))
    }

    fn preset(&self) -> SessionPreset {
        self.state.lock().preset
    }

    fn set_preset(&self, preset: SessionPreset) {
        self.state.lock().preset = preset;
    }

    fn is_multi_source(&self) -> bool {
        self.multi_source
    }

    fn add_input(&self, input: &str) -> bool {
        let mut state = self.state.lock();
        if state.inputs.iter().any(|i| i == input) {
            return false;
        }
        state.inputs.push(input.to_string());
        true
    }

    fn remove_input(&self, input: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.inputs.len();
        state.inputs.retain(|i| i != input);
        state.inputs.len() != before
    }

    fn input_count(&self) -> usize {
        self.state.lock().inputs.len()
    }

    fn set_observer(&self, observer: Option<Arc<dyn SessionObserver>>) {
        self.state.lock().observer = observer;
    }
}

/// Creates [`SimSession`]s and remembers them.
pub struct SimSessionFactory {
    multi_source_supported: bool,
    multi_source_presets: Option<Vec<SessionPreset>>,
    sessions: Mutex<Vec<Arc<SimSession>>>,
}

impl SimSessionFactory {
    /// A factory that can create single and multi-source sessions.
    pub fn new() -> Self {
        Self {
            multi_source_supported: true,
            multi_source_presets: None,
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// A factory that fails to create multi-source sessions.
    pub fn single_source_only() -> Self {
        Self {
            multi_source_supported: false,
            ..Self::new()
        }
    }

    /// Restrict the presets that multi-source sessions accept.
    pub fn with_multi_source_presets(mut self, presets: Vec<SessionPreset>) -> Self {
        self.multi_source_presets = Some(presets);
        self
    }

    /// Every session created so far, oldest first.
    pub fn sessions(&self) -> Vec<Arc<SimSession>> {
        self.sessions.lock().clone()
    }

    /// The most recently created session.
    pub fn current(&self) -> Option<Arc<SimSession>> {
        self.sessions.lock().last().cloned()
    }
}

impl Default for SimSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFactory for SimSessionFactory {
    fn create_session(&self, config: &SessionConfig) -> CaptureResult<Arc<dyn CaptureSession>> {
        if config.multi_source && !self.multi_source_supported {
            return Err(CaptureError::MultiSourceUnsupported);
        }

        let presets = if config.multi_source {
            self.multi_source_presets.clone()
        } else {
            None
        };
        let session = Arc::new(SimSession::with_presets(config.multi_source, presets));
        self.sessions.lock().push(Arc::clone(&session));

        debug!(multi_source = config.multi_source, "Created sim session");
        Ok(session)
    }
}
