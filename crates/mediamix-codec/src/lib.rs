//! Codec unit contract.
//!
//! A codec unit sits behind the synchronization gate on the outbound path
//! and behind the playback link on the inbound path. Concrete encoders and
//! decoders live outside this workspace; [`PassthroughCodec`] forwards raw
//! samples unchanged.

mod error;
mod passthrough;

pub use error::CodecError;
pub use passthrough::PassthroughCodec;

use std::sync::Arc;

use bytes::Bytes;
use crossbeam_channel::Sender;

use mediamix_ipc::{MediaTime, MediaType, Sample};

/// Channel capacity for encoded packets.
pub const ENCODED_CHANNEL_CAPACITY: usize = 64;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Creates a bounded encoded packet channel.
pub fn packet_channel() -> (Sender<EncodedPacket>, crossbeam_channel::Receiver<EncodedPacket>) {
    crossbeam_channel::bounded(ENCODED_CHANNEL_CAPACITY)
}

/// An encoded audio or video packet.
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    /// Audio or video.
    pub media_type: MediaType,

    /// Encoded payload.
    pub data: Bytes,

    /// Presentation timestamp.
    pub pts: MediaTime,

    /// Whether the packet can be decoded on its own.
    pub is_keyframe: bool,
}

/// Where decoded media goes.
pub trait DecodedOutput: Send + Sync {
    /// Decoded audio ready to play.
    fn on_audio_output(&self, data: Bytes, pts: MediaTime);

    /// A decoded video frame that was presented.
    fn on_video_output(&self, sample: Sample);
}

/// A surface that draws video frames.
pub trait RenderTarget: Send + Sync {
    /// Draw one frame.
    fn render(&self, sample: &Sample);
}

/// An audio or video codec unit.
pub trait CodecUnit: Send {
    /// The kind of samples this unit handles.
    fn media_type(&self) -> MediaType;

    /// Begin encoding; packets are sent to `sink`.
    fn start_encoding(&mut self, sink: Sender<EncodedPacket>);

    /// Stop encoding. No-op when not encoding.
    fn stop_encoding(&mut self);

    /// Begin decoding; output goes to `output`.
    fn start_decoding(&mut self, output: Arc<dyn DecodedOutput>);

    /// Stop decoding. No-op when not decoding.
    fn stop_decoding(&mut self);

    /// Feed one sample to the active mode.
    fn input_buffer(&mut self, sample: Sample) -> CodecResult<()>;

    /// Assign the render target. Units that never draw ignore it.
    fn set_render_target(&mut self, _target: Option<Arc<dyn RenderTarget>>) {}

    /// The current render target.
    fn render_target(&self) -> Option<Arc<dyn RenderTarget>> {
        None
    }
}
