//! Audio Collaborators
//!
//! The LC3 decoder and the platform PCM sink are external to this crate. The
//! streaming worker only relies on the narrow contracts below: decode one
//! frame into a PCM buffer, write PCM, recover the sink after a failed write.
//! Both are closed by dropping them.

use crate::lc3::CodecConfiguration;

/// Decoder failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Decoder cannot be set up for the configuration
    Unsupported,
    /// Frame could not be decoded
    InvalidFrame,
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "Decoder does not support configuration"),
            Self::InvalidFrame => write!(f, "Invalid LC3 frame"),
        }
    }
}

/// PCM sink failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// Sink device could not be opened
    OpenFailed,
    /// Playback buffer ran dry (transient)
    Underrun,
    /// Sink is suspended (transient)
    Suspended,
    /// Sink device went away
    Disconnected,
}

impl core::fmt::Display for SinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OpenFailed => write!(f, "Audio sink could not be opened"),
            Self::Underrun => write!(f, "Audio sink underrun"),
            Self::Suspended => write!(f, "Audio sink suspended"),
            Self::Disconnected => write!(f, "Audio sink disconnected"),
        }
    }
}

/// LC3 frame decoder bound to one codec configuration
pub trait FrameDecoder: Send + 'static {
    /// Decode `frame` into `pcm`
    ///
    /// `pcm` holds exactly one frame of interleaved samples for the
    /// configuration the decoder was opened with.
    ///
    /// # Errors
    /// Returns error if the frame cannot be decoded
    fn decode(&mut self, frame: &[u8], pcm: &mut [i16]) -> Result<(), DecodeError>;
}

/// Interleaved signed 16-bit PCM playback sink
pub trait PcmSink: Send + 'static {
    /// Write interleaved samples, returning the number of frames played
    ///
    /// # Errors
    /// Returns error if the sink rejected the write (typically an underrun)
    fn write(&mut self, pcm: &[i16]) -> Result<usize, SinkError>;

    /// Re-prepare the sink after a failed write
    ///
    /// # Errors
    /// Returns error if the sink cannot be recovered
    fn recover(&mut self) -> Result<(), SinkError>;
}

/// Factory for the per-session decoder and sink
pub trait AudioBackend {
    /// Decoder type
    type Decoder: FrameDecoder;
    /// Sink type
    type Sink: PcmSink;

    /// Set up a decoder for the configuration
    ///
    /// # Errors
    /// Returns error if the codec cannot handle the configuration
    fn open_decoder(&mut self, config: &CodecConfiguration) -> Result<Self::Decoder, DecodeError>;

    /// Open the playback sink with the configuration's rate and channels
    ///
    /// # Errors
    /// Returns error if the sink cannot be opened
    fn open_sink(&mut self, config: &CodecConfiguration) -> Result<Self::Sink, SinkError>;
}
