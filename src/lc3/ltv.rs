//! LTV (Length-Type-Value) Records
//!
//! LC3 capabilities and codec-specific configuration are exchanged as a
//! sequence of LTV records: one length octet covering the type and value,
//! one type octet, then the value in little-endian order.

use super::{CodecProfile, FrameDuration, Lc3Capabilities, Lc3Error, SamplingFrequency};
use crate::constants::MAX_LTV_LENGTH;
use heapless::Vec;

/// Encoded LTV record set
pub type LtvBuffer = Vec<u8, MAX_LTV_LENGTH>;

/// Codec-specific capability types (PAC records)
pub mod capability_type {
    /// Supported sampling frequencies (2 octets)
    pub const SUPPORTED_SAMPLING_FREQUENCIES: u8 = 0x01;
    /// Supported frame durations (1 octet)
    pub const SUPPORTED_FRAME_DURATIONS: u8 = 0x02;
    /// Supported audio channel counts (1 octet)
    pub const SUPPORTED_CHANNEL_COUNTS: u8 = 0x03;
    /// Supported octets per codec frame (min, max: 2 + 2 octets)
    pub const SUPPORTED_OCTETS_PER_FRAME: u8 = 0x04;
    /// Supported maximum codec frames per SDU (1 octet)
    pub const SUPPORTED_MAX_FRAMES_PER_SDU: u8 = 0x05;
}

/// Codec-specific configuration types
pub mod config_type {
    /// Sampling frequency (1 octet)
    pub const SAMPLING_FREQUENCY: u8 = 0x01;
    /// Frame duration (1 octet)
    pub const FRAME_DURATION: u8 = 0x02;
    /// Audio channel allocation (4 octets)
    pub const AUDIO_CHANNEL_ALLOCATION: u8 = 0x03;
    /// Octets per codec frame (2 octets)
    pub const OCTETS_PER_FRAME: u8 = 0x04;
    /// Codec frame blocks per SDU (1 octet)
    pub const FRAME_BLOCKS_PER_SDU: u8 = 0x05;
}

/// Iterator over the records of an LTV blob
///
/// Yields `(type, value)` pairs. A truncated record yields a single
/// [`Lc3Error::MalformedLtv`] and ends the iteration.
#[derive(Debug, Clone)]
pub struct LtvIter<'a> {
    data: &'a [u8],
    failed: bool,
}

impl<'a> LtvIter<'a> {
    /// Iterate the records in `data`
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            failed: false,
        }
    }
}

impl<'a> Iterator for LtvIter<'a> {
    type Item = Result<(u8, &'a [u8]), Lc3Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.data.is_empty() {
            return None;
        }

        let length = usize::from(self.data[0]);
        if length == 0 || self.data.len() < length + 1 {
            self.failed = true;
            return Some(Err(Lc3Error::MalformedLtv));
        }

        let record_type = self.data[1];
        let value = &self.data[2..=length];
        self.data = &self.data[length + 1..];
        Some(Ok((record_type, value)))
    }
}

/// Append one LTV record
///
/// # Errors
/// Returns error if the record does not fit the buffer
pub fn push_ltv(buffer: &mut LtvBuffer, record_type: u8, value: &[u8]) -> Result<(), Lc3Error> {
    let length = u8::try_from(value.len() + 1).map_err(|_| Lc3Error::BufferFull)?;
    buffer.push(length).map_err(|_| Lc3Error::BufferFull)?;
    buffer.push(record_type).map_err(|_| Lc3Error::BufferFull)?;
    buffer
        .extend_from_slice(value)
        .map_err(|()| Lc3Error::BufferFull)
}

/// Encode PAC capability records
///
/// # Errors
/// Returns error if the capabilities are invalid or exceed the buffer
pub fn encode_capabilities(capabilities: &Lc3Capabilities) -> Result<LtvBuffer, Lc3Error> {
    capabilities.validate()?;

    let mut buffer = LtvBuffer::new();
    push_ltv(
        &mut buffer,
        capability_type::SUPPORTED_SAMPLING_FREQUENCIES,
        &capabilities.sampling_frequencies.0.to_le_bytes(),
    )?;
    push_ltv(
        &mut buffer,
        capability_type::SUPPORTED_FRAME_DURATIONS,
        &[capabilities.frame_durations.0],
    )?;
    push_ltv(
        &mut buffer,
        capability_type::SUPPORTED_CHANNEL_COUNTS,
        &[capabilities.channel_counts.0],
    )?;

    let min = capabilities.min_octets_per_frame.to_le_bytes();
    let max = capabilities.max_octets_per_frame.to_le_bytes();
    push_ltv(
        &mut buffer,
        capability_type::SUPPORTED_OCTETS_PER_FRAME,
        &[min[0], min[1], max[0], max[1]],
    )?;
    push_ltv(
        &mut buffer,
        capability_type::SUPPORTED_MAX_FRAMES_PER_SDU,
        &[capabilities.max_frames_per_sdu],
    )?;
    Ok(buffer)
}

/// Encode the codec-specific configuration for a profile
///
/// # Errors
/// Returns error if the records exceed the buffer
pub fn encode_configuration(profile: &CodecProfile) -> Result<LtvBuffer, Lc3Error> {
    let mut buffer = LtvBuffer::new();
    push_ltv(
        &mut buffer,
        config_type::SAMPLING_FREQUENCY,
        &[profile.sampling_frequency.config_code()],
    )?;
    push_ltv(
        &mut buffer,
        config_type::FRAME_DURATION,
        &[profile.frame_duration.config_code()],
    )?;
    push_ltv(
        &mut buffer,
        config_type::AUDIO_CHANNEL_ALLOCATION,
        &channel_allocation(profile.channels).to_le_bytes(),
    )?;
    push_ltv(
        &mut buffer,
        config_type::OCTETS_PER_FRAME,
        &profile.octets_per_frame.to_le_bytes(),
    )?;
    Ok(buffer)
}

/// Front Left for mono, Front Left | Front Right for stereo
const fn channel_allocation(channels: u8) -> u32 {
    match channels {
        1 => 0x0000_0001,
        2 => 0x0000_0003,
        _ => 0,
    }
}

/// Codec-specific configuration parsed from a `SetConfiguration` request
///
/// Fields are `None` when the peer omitted the record; unknown record types
/// are skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigurationRecord {
    /// Sampling frequency
    pub sampling_frequency: Option<SamplingFrequency>,
    /// Frame duration
    pub frame_duration: Option<FrameDuration>,
    /// Audio channel allocation bitmap
    pub channel_allocation: Option<u32>,
    /// Octets per codec frame
    pub octets_per_frame: Option<u16>,
    /// Codec frame blocks per SDU
    pub frame_blocks_per_sdu: Option<u8>,
}

impl ConfigurationRecord {
    /// Parse configuration records
    ///
    /// # Errors
    /// Returns error on truncated records, wrong value lengths or codes the
    /// endpoint does not know
    pub fn parse(data: &[u8]) -> Result<Self, Lc3Error> {
        let mut record = Self::default();

        for entry in LtvIter::new(data) {
            let (record_type, value) = entry?;
            match record_type {
                config_type::SAMPLING_FREQUENCY => {
                    let [code] = value else {
                        return Err(Lc3Error::MalformedLtv);
                    };
                    record.sampling_frequency = Some(SamplingFrequency::from_config_code(*code)?);
                }
                config_type::FRAME_DURATION => {
                    let [code] = value else {
                        return Err(Lc3Error::MalformedLtv);
                    };
                    record.frame_duration = Some(FrameDuration::from_config_code(*code)?);
                }
                config_type::AUDIO_CHANNEL_ALLOCATION => {
                    let bytes: [u8; 4] = value.try_into().map_err(|_| Lc3Error::MalformedLtv)?;
                    record.channel_allocation = Some(u32::from_le_bytes(bytes));
                }
                config_type::OCTETS_PER_FRAME => {
                    let bytes: [u8; 2] = value.try_into().map_err(|_| Lc3Error::MalformedLtv)?;
                    record.octets_per_frame = Some(u16::from_le_bytes(bytes));
                }
                config_type::FRAME_BLOCKS_PER_SDU => {
                    let [blocks] = value else {
                        return Err(Lc3Error::MalformedLtv);
                    };
                    record.frame_blocks_per_sdu = Some(*blocks);
                }
                _ => {}
            }
        }

        Ok(record)
    }

    /// Number of channels implied by the allocation (no allocation is mono)
    #[must_use]
    pub const fn channel_count(&self) -> Option<u8> {
        match self.channel_allocation {
            Some(0) => Some(1),
            Some(allocation) => Some(allocation.count_ones() as u8),
            None => None,
        }
    }

    /// Check the records that are present against the endpoint profile
    ///
    /// # Errors
    /// Returns [`Lc3Error::ProfileMismatch`] if any present record differs
    pub fn check_against(&self, profile: &CodecProfile) -> Result<(), Lc3Error> {
        let matches = self
            .sampling_frequency
            .is_none_or(|f| f == profile.sampling_frequency)
            && self
                .frame_duration
                .is_none_or(|d| d == profile.frame_duration)
            && self
                .channel_count()
                .is_none_or(|c| c == profile.channels)
            && self
                .octets_per_frame
                .is_none_or(|o| o == profile.octets_per_frame)
            && self.frame_blocks_per_sdu.is_none_or(|b| b <= 1);

        if matches {
            Ok(())
        } else {
            Err(Lc3Error::ProfileMismatch)
        }
    }
}

/// Check whether a peer's PAC records include the given profile
///
/// Records that are missing do not restrict the profile. Malformed input is
/// reported as unsupported.
#[must_use]
pub fn peer_supports(data: &[u8], profile: &CodecProfile) -> bool {
    for entry in LtvIter::new(data) {
        let Ok((record_type, value)) = entry else {
            return false;
        };
        let supported = match (record_type, value) {
            (capability_type::SUPPORTED_SAMPLING_FREQUENCIES, [lo, hi]) => {
                u16::from_le_bytes([*lo, *hi]) & profile.sampling_frequency.capability_bit() != 0
            }
            (capability_type::SUPPORTED_FRAME_DURATIONS, [durations]) => {
                durations & profile.frame_duration.capability_bit() != 0
            }
            (capability_type::SUPPORTED_OCTETS_PER_FRAME, [min_lo, min_hi, max_lo, max_hi]) => {
                let min = u16::from_le_bytes([*min_lo, *min_hi]);
                let max = u16::from_le_bytes([*max_lo, *max_hi]);
                (min..=max).contains(&profile.octets_per_frame)
            }
            _ => true,
        };
        if !supported {
            return false;
        }
    }
    true
}
