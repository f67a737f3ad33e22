//! LC3 Codec Profile and Configuration
//!
//! This module describes the LC3 profile the endpoint advertises and the
//! per-session configuration derived from it. The codec's decode algorithm
//! itself is an external collaborator (see [`crate::audio::FrameDecoder`]);
//! only its framing contract matters here.
//!
//! ## Contents
//!
//! - **Profile**: sampling frequency, frame duration, channel count and
//!   octets per frame advertised at registration time
//! - **Configuration**: the immutable values a stream session is bound to,
//!   validated against the worker's fixed buffer capacities
//! - **LTV records**: minimal encoding of PAC capabilities and
//!   codec-specific configuration as exchanged with `BlueZ`
//!
//! ## Usage
//!
//! ```rust
//! use leaudio_sink::lc3::CodecProfile;
//!
//! let config = CodecProfile::default().configuration().unwrap();
//! assert_eq!(config.samples_per_frame(), 480);
//! assert_eq!(config.frame_bytes(), 120);
//! ```

pub mod codec;
pub mod ltv;

pub use codec::*;
pub use ltv::*;

/// LC3 profile, configuration and LTV errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lc3Error {
    /// Sampling frequency code or rate not supported by LC3
    UnsupportedSamplingFrequency(u8),
    /// Frame duration code not supported by LC3
    UnsupportedFrameDuration(u8),
    /// Channel count is zero or above what the endpoint renders
    InvalidChannelCount(u8),
    /// Octets per frame outside the LC3 range
    InvalidOctetsPerFrame(u16),
    /// Frame does not fit the worker's scratch buffers
    FrameTooLarge(usize),
    /// LTV record is truncated or has a zero length
    MalformedLtv,
    /// Encoded records exceed the LTV buffer capacity
    BufferFull,
    /// Configuration disagrees with the endpoint profile
    ProfileMismatch,
}

impl core::fmt::Display for Lc3Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedSamplingFrequency(code) => {
                write!(f, "Unsupported LC3 sampling frequency 0x{code:02x}")
            }
            Self::UnsupportedFrameDuration(code) => {
                write!(f, "Unsupported LC3 frame duration 0x{code:02x}")
            }
            Self::InvalidChannelCount(count) => write!(f, "Invalid channel count {count}"),
            Self::InvalidOctetsPerFrame(octets) => {
                write!(f, "Invalid LC3 octets per frame {octets}")
            }
            Self::FrameTooLarge(size) => {
                write!(f, "LC3 frame of {size} exceeds stream buffer capacity")
            }
            Self::MalformedLtv => write!(f, "Malformed LTV record"),
            Self::BufferFull => write!(f, "LTV buffer full"),
            Self::ProfileMismatch => write!(f, "Configuration does not match endpoint profile"),
        }
    }
}
