//! LC3 Profile, Capabilities and Session Configuration
//!
//! Sampling frequencies and frame durations use the Bluetooth assigned
//! numbers for LC3 codec-specific configuration, and the matching bitfields
//! for Published Audio Capabilities.

use super::Lc3Error;
use crate::constants::{
    DEFAULT_CHANNEL_COUNT, DEFAULT_OCTETS_PER_FRAME, MAX_FRAME_BYTES, MAX_LC3_OCTETS_PER_FRAME,
    MAX_PCM_SAMPLES, MIN_LC3_OCTETS_PER_FRAME,
};
use core::time::Duration;

/// Sampling frequencies the endpoint can be configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplingFrequency {
    /// 8000 Hz
    Hz8000,
    /// 16000 Hz
    Hz16000,
    /// 24000 Hz
    Hz24000,
    /// 32000 Hz
    Hz32000,
    /// 48000 Hz
    Hz48000,
}

impl SamplingFrequency {
    /// Sampling rate in Hz
    #[must_use]
    pub const fn hz(self) -> u32 {
        match self {
            Self::Hz8000 => 8_000,
            Self::Hz16000 => 16_000,
            Self::Hz24000 => 24_000,
            Self::Hz32000 => 32_000,
            Self::Hz48000 => 48_000,
        }
    }

    /// Codec-specific configuration value
    #[must_use]
    pub const fn config_code(self) -> u8 {
        match self {
            Self::Hz8000 => 0x01,
            Self::Hz16000 => 0x03,
            Self::Hz24000 => 0x05,
            Self::Hz32000 => 0x06,
            Self::Hz48000 => 0x08,
        }
    }

    /// Parse a codec-specific configuration value
    ///
    /// # Errors
    /// Returns error if the code is unknown or not handled by the endpoint
    pub const fn from_config_code(code: u8) -> Result<Self, Lc3Error> {
        match code {
            0x01 => Ok(Self::Hz8000),
            0x03 => Ok(Self::Hz16000),
            0x05 => Ok(Self::Hz24000),
            0x06 => Ok(Self::Hz32000),
            0x08 => Ok(Self::Hz48000),
            _ => Err(Lc3Error::UnsupportedSamplingFrequency(code)),
        }
    }

    /// Bit in the PAC supported sampling frequencies field
    #[must_use]
    pub const fn capability_bit(self) -> u16 {
        match self {
            Self::Hz8000 => SupportedSamplingFrequencies::HZ_8000,
            Self::Hz16000 => SupportedSamplingFrequencies::HZ_16000,
            Self::Hz24000 => SupportedSamplingFrequencies::HZ_24000,
            Self::Hz32000 => SupportedSamplingFrequencies::HZ_32000,
            Self::Hz48000 => SupportedSamplingFrequencies::HZ_48000,
        }
    }
}

/// LC3 frame durations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameDuration {
    /// 7.5 ms frames
    Ms7_5,
    /// 10 ms frames
    Ms10,
}

impl FrameDuration {
    /// Frame duration in microseconds
    #[must_use]
    pub const fn micros(self) -> u32 {
        match self {
            Self::Ms7_5 => 7_500,
            Self::Ms10 => 10_000,
        }
    }

    /// Codec-specific configuration value
    #[must_use]
    pub const fn config_code(self) -> u8 {
        match self {
            Self::Ms7_5 => 0x00,
            Self::Ms10 => 0x01,
        }
    }

    /// Parse a codec-specific configuration value
    ///
    /// # Errors
    /// Returns error if the code is unknown
    pub const fn from_config_code(code: u8) -> Result<Self, Lc3Error> {
        match code {
            0x00 => Ok(Self::Ms7_5),
            0x01 => Ok(Self::Ms10),
            _ => Err(Lc3Error::UnsupportedFrameDuration(code)),
        }
    }

    /// Bit in the PAC supported frame durations field
    #[must_use]
    pub const fn capability_bit(self) -> u8 {
        match self {
            Self::Ms7_5 => SupportedFrameDurations::MS_7_5,
            Self::Ms10 => SupportedFrameDurations::MS_10,
        }
    }
}

/// PAC Supported Sampling Frequencies (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SupportedSamplingFrequencies(pub u16);

impl SupportedSamplingFrequencies {
    /// 8000 Hz
    pub const HZ_8000: u16 = 0x0001;
    /// 16000 Hz
    pub const HZ_16000: u16 = 0x0004;
    /// 24000 Hz
    pub const HZ_24000: u16 = 0x0010;
    /// 32000 Hz
    pub const HZ_32000: u16 = 0x0020;
    /// 48000 Hz
    pub const HZ_48000: u16 = 0x0080;

    /// Check if frequency is supported
    #[must_use]
    pub const fn supports(&self, frequency: SamplingFrequency) -> bool {
        (self.0 & frequency.capability_bit()) != 0
    }
}

/// PAC Supported Frame Durations (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SupportedFrameDurations(pub u8);

impl SupportedFrameDurations {
    /// 7.5 ms
    pub const MS_7_5: u8 = 0x01;
    /// 10 ms
    pub const MS_10: u8 = 0x02;

    /// Check if duration is supported
    #[must_use]
    pub const fn supports(&self, duration: FrameDuration) -> bool {
        (self.0 & duration.capability_bit()) != 0
    }
}

/// PAC Supported Audio Channel Counts (bitfield, bit n = n + 1 channels)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SupportedChannelCounts(pub u8);

impl SupportedChannelCounts {
    /// Bitfield with only `count` channels set
    #[must_use]
    pub const fn only(count: u8) -> Self {
        if count == 0 || count > 8 {
            Self(0)
        } else {
            Self(1 << (count - 1))
        }
    }

    /// Check if channel count is supported
    #[must_use]
    pub const fn supports(&self, count: u8) -> bool {
        count != 0 && count <= 8 && (self.0 & (1 << (count - 1))) != 0
    }
}

/// LC3 profile advertised by the endpoint
///
/// The profile is fixed at registration time. Every stream session derives
/// its [`CodecConfiguration`] from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CodecProfile {
    /// Sampling frequency
    pub sampling_frequency: SamplingFrequency,
    /// Frame duration
    pub frame_duration: FrameDuration,
    /// Number of audio channels rendered
    pub channels: u8,
    /// Octets per LC3 frame, per channel
    pub octets_per_frame: u16,
}

impl CodecProfile {
    /// Mono 48 kHz profile with 10 ms frames
    #[must_use]
    pub const fn mono_48khz_10ms() -> Self {
        Self {
            sampling_frequency: SamplingFrequency::Hz48000,
            frame_duration: FrameDuration::Ms10,
            channels: DEFAULT_CHANNEL_COUNT,
            octets_per_frame: DEFAULT_OCTETS_PER_FRAME,
        }
    }

    /// Derive the session configuration for this profile
    ///
    /// # Errors
    /// Returns error if the profile is outside the LC3 ranges or a frame would
    /// not fit the streaming worker's buffers
    pub fn configuration(&self) -> Result<CodecConfiguration, Lc3Error> {
        if self.channels == 0 || self.channels > 2 {
            return Err(Lc3Error::InvalidChannelCount(self.channels));
        }
        if self.octets_per_frame < MIN_LC3_OCTETS_PER_FRAME
            || self.octets_per_frame > MAX_LC3_OCTETS_PER_FRAME
        {
            return Err(Lc3Error::InvalidOctetsPerFrame(self.octets_per_frame));
        }

        let channels = usize::from(self.channels);
        let frame_bytes = usize::from(self.octets_per_frame) * channels;
        if frame_bytes > MAX_FRAME_BYTES {
            return Err(Lc3Error::FrameTooLarge(frame_bytes));
        }

        // Every supported rate divides evenly into both frame durations
        let samples_per_frame = (u64::from(self.sampling_frequency.hz())
            * u64::from(self.frame_duration.micros())
            / 1_000_000) as usize;
        if samples_per_frame * channels > MAX_PCM_SAMPLES {
            return Err(Lc3Error::FrameTooLarge(samples_per_frame * channels));
        }

        Ok(CodecConfiguration {
            sample_rate_hz: self.sampling_frequency.hz(),
            frame_duration: self.frame_duration,
            channels: self.channels,
            frame_bytes,
            samples_per_frame,
        })
    }
}

impl Default for CodecProfile {
    fn default() -> Self {
        Self::mono_48khz_10ms()
    }
}

/// Immutable codec configuration a stream session is bound to
///
/// Only obtainable through [`CodecProfile::configuration`], so the frame and
/// PCM sizes are always within the worker's buffer capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CodecConfiguration {
    sample_rate_hz: u32,
    frame_duration: FrameDuration,
    channels: u8,
    frame_bytes: usize,
    samples_per_frame: usize,
}

impl CodecConfiguration {
    /// Sampling rate in Hz
    #[must_use]
    pub const fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Frame duration
    #[must_use]
    pub const fn frame_duration(&self) -> FrameDuration {
        self.frame_duration
    }

    /// Number of channels
    #[must_use]
    pub const fn channels(&self) -> u8 {
        self.channels
    }

    /// Bytes of one encoded frame across all channels
    #[must_use]
    pub const fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Decoded samples per frame, per channel
    #[must_use]
    pub const fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /// Interleaved PCM samples per frame across all channels
    #[must_use]
    pub const fn pcm_samples_per_frame(&self) -> usize {
        self.samples_per_frame * self.channels as usize
    }

    /// Wall-clock duration of one frame
    #[must_use]
    pub const fn frame_period(&self) -> Duration {
        Duration::from_micros(self.frame_duration.micros() as u64)
    }
}

/// LC3 Published Audio Capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Lc3Capabilities {
    /// Supported sampling frequencies
    pub sampling_frequencies: SupportedSamplingFrequencies,
    /// Supported frame durations
    pub frame_durations: SupportedFrameDurations,
    /// Supported channel counts
    pub channel_counts: SupportedChannelCounts,
    /// Minimum octets per frame
    pub min_octets_per_frame: u16,
    /// Maximum octets per frame
    pub max_octets_per_frame: u16,
    /// Maximum codec frames per SDU
    pub max_frames_per_sdu: u8,
}

impl Lc3Capabilities {
    /// Capabilities that advertise exactly the given profile
    #[must_use]
    pub const fn for_profile(profile: &CodecProfile) -> Self {
        Self {
            sampling_frequencies: SupportedSamplingFrequencies(
                profile.sampling_frequency.capability_bit(),
            ),
            frame_durations: SupportedFrameDurations(profile.frame_duration.capability_bit()),
            channel_counts: SupportedChannelCounts::only(profile.channels),
            min_octets_per_frame: profile.octets_per_frame,
            max_octets_per_frame: profile.octets_per_frame,
            max_frames_per_sdu: 1,
        }
    }

    /// Validate capabilities
    ///
    /// # Errors
    /// Returns error if a field is empty or the octet range is invalid
    pub const fn validate(&self) -> Result<(), Lc3Error> {
        if self.sampling_frequencies.0 == 0 {
            return Err(Lc3Error::UnsupportedSamplingFrequency(0));
        }
        if self.frame_durations.0 == 0 {
            return Err(Lc3Error::UnsupportedFrameDuration(0));
        }
        if self.channel_counts.0 == 0 {
            return Err(Lc3Error::InvalidChannelCount(0));
        }
        if self.min_octets_per_frame < MIN_LC3_OCTETS_PER_FRAME
            || self.max_octets_per_frame > MAX_LC3_OCTETS_PER_FRAME
            || self.min_octets_per_frame > self.max_octets_per_frame
        {
            return Err(Lc3Error::InvalidOctetsPerFrame(self.min_octets_per_frame));
        }
        Ok(())
    }

    /// Check whether a profile lies within these capabilities
    #[must_use]
    pub const fn supports(&self, profile: &CodecProfile) -> bool {
        self.sampling_frequencies.supports(profile.sampling_frequency)
            && self.frame_durations.supports(profile.frame_duration)
            && self.channel_counts.supports(profile.channels)
            && profile.octets_per_frame >= self.min_octets_per_frame
            && profile.octets_per_frame <= self.max_octets_per_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_configuration() {
        let config = CodecProfile::default().configuration().unwrap();
        assert_eq!(config.sample_rate_hz(), 48_000);
        assert_eq!(config.frame_duration(), FrameDuration::Ms10);
        assert_eq!(config.channels(), 1);
        assert_eq!(config.frame_bytes(), 120);
        assert_eq!(config.samples_per_frame(), 480);
        assert_eq!(config.pcm_samples_per_frame(), 480);
        assert_eq!(config.frame_period(), Duration::from_millis(10));
    }

    #[test]
    fn test_samples_per_frame_across_rates() {
        let mut profile = CodecProfile::default();

        profile.sampling_frequency = SamplingFrequency::Hz16000;
        assert_eq!(profile.configuration().unwrap().samples_per_frame(), 160);

        profile.frame_duration = FrameDuration::Ms7_5;
        assert_eq!(profile.configuration().unwrap().samples_per_frame(), 120);

        profile.sampling_frequency = SamplingFrequency::Hz48000;
        assert_eq!(profile.configuration().unwrap().samples_per_frame(), 360);
    }

    #[test]
    fn test_profile_validation() {
        let mut profile = CodecProfile::default();
        profile.channels = 0;
        assert_eq!(
            profile.configuration(),
            Err(Lc3Error::InvalidChannelCount(0))
        );

        profile.channels = 1;
        profile.octets_per_frame = 10;
        assert_eq!(
            profile.configuration(),
            Err(Lc3Error::InvalidOctetsPerFrame(10))
        );

        // Two channels of 300 octets do not fit the scratch buffer
        profile.channels = 2;
        profile.octets_per_frame = 300;
        assert_eq!(profile.configuration(), Err(Lc3Error::FrameTooLarge(600)));
    }

    #[test]
    fn test_stereo_configuration_fits_buffers() {
        let profile = CodecProfile {
            channels: 2,
            ..CodecProfile::default()
        };
        let config = profile.configuration().unwrap();
        assert_eq!(config.frame_bytes(), 240);
        assert_eq!(config.pcm_samples_per_frame(), 960);
    }

    #[test]
    fn test_config_codes() {
        for frequency in [
            SamplingFrequency::Hz8000,
            SamplingFrequency::Hz16000,
            SamplingFrequency::Hz24000,
            SamplingFrequency::Hz32000,
            SamplingFrequency::Hz48000,
        ] {
            assert_eq!(
                SamplingFrequency::from_config_code(frequency.config_code()),
                Ok(frequency)
            );
        }
        assert!(SamplingFrequency::from_config_code(0x07).is_err());
        assert!(FrameDuration::from_config_code(0x02).is_err());
    }

    #[test]
    fn test_capabilities_for_profile() {
        let profile = CodecProfile::default();
        let caps = Lc3Capabilities::for_profile(&profile);
        assert!(caps.validate().is_ok());
        assert!(caps.supports(&profile));
        assert_eq!(caps.sampling_frequencies.0, SupportedSamplingFrequencies::HZ_48000);
        assert_eq!(caps.frame_durations.0, SupportedFrameDurations::MS_10);
        assert!(caps.channel_counts.supports(1));
        assert!(!caps.channel_counts.supports(2));

        let other = CodecProfile {
            octets_per_frame: 100,
            ..profile
        };
        assert!(!caps.supports(&other));
    }
}
