//! Passthrough codec that forwards raw samples.

use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, info, instrument, trace};

use mediamix_ipc::{MediaType, Sample};

use crate::error::CodecError;
use crate::{CodecResult, CodecUnit, DecodedOutput, EncodedPacket, RenderTarget};

enum Mode {
    Idle,
    Encoding(Sender<EncodedPacket>),
    Decoding(Arc<dyn DecodedOutput>),
}

/// A codec unit that does no compression.
///
/// Encoding wraps each sample into an [`EncodedPacket`]; every video packet
/// is a keyframe. Decoding hands audio to the output and draws video on
/// the render target before reporting it. Starting one mode replaces the
/// other.
pub struct PassthroughCodec {
    media_type: MediaType,
    mode: Mode,
    render_target: Option<Arc<dyn RenderTarget>>,
    sequence: u64,
}

impl PassthroughCodec {
    /// Create a unit for one media type.
    pub fn new(media_type: MediaType) -> Self {
        Self {
            media_type,
            mode: Mode::Idle,
            render_target: None,
            sequence: 0,
        }
    }

    /// Returns true while encoding.
    pub fn is_encoding(&self) -> bool {
        matches!(self.mode, Mode::Encoding(_))
    }

    /// Returns true while decoding.
    pub fn is_decoding(&self) -> bool {
        matches!(self.mode, Mode::Decoding(_))
    }

    fn encode(&mut self, sink: &Sender<EncodedPacket>, sample: Sample) -> CodecResult<()> {
        let packet = EncodedPacket {
            media_type: sample.media_type,
            is_keyframe: sample.media_type == MediaType::Video,
            pts: sample.pts,
            data: sample.data,
        };

        match sink.try_send(packet) {
            Ok(()) => {
                self.sequence += 1;
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                trace!(media = self.media_type.name(), "Packet channel full, dropping packet");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(CodecError::ChannelDisconnected),
        }
    }

    fn decode(&self, output: &Arc<dyn DecodedOutput>, sample: Sample) {
        match sample.media_type {
            MediaType::Audio => output.on_audio_output(sample.data, sample.pts),
            MediaType::Video => {
                if let Some(target) = &self.render_target {
                    target.render(&sample);
                }
                output.on_video_output(sample);
            }
        }
    }
}

impl CodecUnit for PassthroughCodec {
    fn media_type(&self) -> MediaType {
        self.media_type
    }

    #[instrument(name = "codec_start_encoding", skip_all, fields(media = self.media_type.name()))]
    fn start_encoding(&mut self, sink: Sender<EncodedPacket>) {
        info!("Starting encoding");
        self.sequence = 0;
        self.mode = Mode::Encoding(sink);
    }

    #[instrument(name = "codec_stop_encoding", skip_all, fields(media = self.media_type.name()))]
    fn stop_encoding(&mut self) {
        if self.is_encoding() {
            info!(packets = self.sequence, "Stopping encoding");
            self.mode = Mode::Idle;
        }
    }

    #[instrument(name = "codec_start_decoding", skip_all, fields(media = self.media_type.name()))]
    fn start_decoding(&mut self, output: Arc<dyn DecodedOutput>) {
        info!("Starting decoding");
        self.mode = Mode::Decoding(output);
    }

    #[instrument(name = "codec_stop_decoding", skip_all, fields(media = self.media_type.name()))]
    fn stop_decoding(&mut self) {
        if self.is_decoding() {
            info!("Stopping decoding");
            self.mode = Mode::Idle;
        }
    }

    fn input_buffer(&mut self, sample: Sample) -> CodecResult<()> {
        if sample.media_type != self.media_type {
            return Err(CodecError::MediaTypeMismatch {
                expected: self.media_type,
                actual: sample.media_type,
            });
        }

        match &self.mode {
            Mode::Idle => Err(CodecError::NotRunning),
            Mode::Encoding(sink) => {
                let sink = sink.clone();
                self.encode(&sink, sample)
            }
            Mode::Decoding(output) => {
                self.decode(output, sample);
                Ok(())
            }
        }
    }

    fn set_render_target(&mut self, target: Option<Arc<dyn RenderTarget>>) {
        debug!(attached = target.is_some(), "Render target changed");
        self.render_target = target;
    }

    fn render_target(&self) -> Option<Arc<dyn RenderTarget>> {
        self.render_target.clone()
    }
}
