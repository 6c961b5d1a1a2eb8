//! Simulated capture unit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use mediamix_ipc::MediaType;

use crate::device::CaptureDevice;
use crate::session::CaptureSession;
use crate::CaptureUnit;

use super::device::SimDevice;

/// A capture unit that registers one named input on the session.
pub struct SimCaptureUnit {
    media_type: MediaType,
    input: String,
    device: Option<Arc<SimDevice>>,
    attaches: AtomicUsize,
    detaches: AtomicUsize,
}

impl SimCaptureUnit {
    /// A microphone unit.
    pub fn microphone() -> Self {
        Self::new(MediaType::Audio, "microphone", None)
    }

    /// A camera unit backed by `device`.
    pub fn camera(device: Arc<SimDevice>) -> Self {
        Self::new(MediaType::Video, "camera", Some(device))
    }

    fn new(media_type: MediaType, input: &str, device: Option<Arc<SimDevice>>) -> Self {
        Self {
            media_type,
            input: input.to_string(),
            device,
            attaches: AtomicUsize::new(0),
            detaches: AtomicUsize::new(0),
        }
    }

    /// Input name registered on sessions.
    pub fn input_name(&self) -> &str {
        &self.input
    }

    /// Number of `attach_session` calls.
    pub fn attaches(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    /// Number of `detach_session` calls.
    pub fn detaches(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

impl CaptureUnit for SimCaptureUnit {
    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn attach_session(&self, session: &Arc<dyn CaptureSession>) {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        session.begin_configuration();
        let added = session.add_input(&self.input);
        session.commit_configuration();
        trace!(input = %self.input, added, "Attached to session");
    }

    fn detach_session(&self, session: &Arc<dyn CaptureSession>) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        session.begin_configuration();
        let removed = session.remove_input(&self.input);
        session.commit_configuration();
        trace!(input = %self.input, removed, "Detached from session");
    }

    fn device(&self) -> Option<Arc<dyn CaptureDevice>> {
        self.device
            .as_ref()
            .map(|device| Arc::clone(device) as Arc<dyn CaptureDevice>)
    }
}
