//! In-process capture backend.
//!
//! Behaves like a platform session closely enough to exercise the mixer:
//! sessions refuse to run without inputs, presets can be restricted, and
//! events are delivered to the registered observer on the caller's thread.
//! Every type keeps call counters so callers can check side effects.

mod device;
mod session;
mod unit;

pub use device::SimDevice;
pub use session::{SimSession, SimSessionFactory};
pub use unit::SimCaptureUnit;
