//! Capability Negotiator
//!
//! Answers `SelectProperties`: given the capabilities a peer advertises,
//! choose the codec configuration and `QoS` the endpoint wants. The endpoint
//! offers a single fixed profile, so the peer's records are only inspected
//! for logging. Negotiation is pure and never fails: whatever the input, a
//! non-empty configuration and a consistent `QoS` proposal come back.

use crate::constants::{
    DEFAULT_MAX_LATENCY_MS, DEFAULT_PREFERRED_MAX_DELAY, DEFAULT_PREFERRED_MIN_DELAY,
    FRAMING_UNFRAMED, MAX_PEER_BLOB_LENGTH, PHY_2M,
};
use crate::lc3::{CodecProfile, LtvBuffer, encode_configuration, peer_supports};
use heapless::Vec;

/// Configuration records for the default profile, used if encoding the
/// configured profile ever fails
const FALLBACK_CONFIGURATION: [u8; 16] = [
    0x02, 0x01, 0x08, 0x02, 0x02, 0x01, 0x05, 0x03, 0x01, 0x00, 0x00, 0x00, 0x03, 0x04, 0x78, 0x00,
];

/// `QoS` proposal returned from `SelectProperties`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QosProposal {
    /// Framing (0x00 unframed)
    pub framing: u8,
    /// Preferred PHY (0x02 LE 2M)
    pub phy: u8,
    /// Maximum transport latency
    pub max_latency: u16,
    /// Preferred minimum presentation delay
    pub preferred_min_delay: u32,
    /// Preferred maximum presentation delay
    pub preferred_max_delay: u32,
}

impl QosProposal {
    /// Unframed, LE 2M, 20 ms latency, 20–40 delay window
    #[must_use]
    pub const fn unframed_2m() -> Self {
        Self {
            framing: FRAMING_UNFRAMED,
            phy: PHY_2M,
            max_latency: DEFAULT_MAX_LATENCY_MS,
            preferred_min_delay: DEFAULT_PREFERRED_MIN_DELAY,
            preferred_max_delay: DEFAULT_PREFERRED_MAX_DELAY,
        }
    }

    /// Check that the latency lies within the preferred delay window
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        let latency = self.max_latency as u32;
        self.preferred_min_delay <= latency && latency <= self.preferred_max_delay
    }

    /// Force the proposal into a consistent shape
    ///
    /// An inverted window is reordered, then the latency is clamped into it.
    #[must_use]
    pub fn clamped(self) -> Self {
        let min = self.preferred_min_delay.min(self.preferred_max_delay);
        let max = self
            .preferred_min_delay
            .max(self.preferred_max_delay)
            .min(u32::from(u16::MAX));
        let min = min.min(max);
        let latency = u32::from(self.max_latency).clamp(min, max);

        Self {
            max_latency: u16::try_from(latency).unwrap_or(u16::MAX),
            preferred_min_delay: min,
            preferred_max_delay: max,
            ..self
        }
    }
}

impl Default for QosProposal {
    fn default() -> Self {
        Self::unframed_2m()
    }
}

/// Capabilities a peer offers in `SelectProperties`
///
/// Blobs longer than the fixed capacity are truncated; the endpoint only
/// inspects them for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerCapabilities {
    /// Codec capability LTV records
    pub capabilities: Vec<u8, MAX_PEER_BLOB_LENGTH>,
    /// Metadata LTV records
    pub metadata: Vec<u8, MAX_PEER_BLOB_LENGTH>,
}

impl PeerCapabilities {
    /// Copy peer blobs, truncating anything past capacity
    #[must_use]
    pub fn new(capabilities: &[u8], metadata: &[u8]) -> Self {
        Self {
            capabilities: truncated(capabilities),
            metadata: truncated(metadata),
        }
    }
}

fn truncated(data: &[u8]) -> Vec<u8, MAX_PEER_BLOB_LENGTH> {
    let len = data.len().min(MAX_PEER_BLOB_LENGTH);
    Vec::from_slice(&data[..len]).unwrap_or_default()
}

/// Reply to `SelectProperties`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected codec-specific configuration records
    pub capabilities: LtvBuffer,
    /// Selected metadata (empty)
    pub metadata: LtvBuffer,
    /// `QoS` proposal
    pub qos: QosProposal,
}

/// Choose the codec configuration and `QoS` for a peer
#[must_use]
pub fn select_properties(
    peer: &PeerCapabilities,
    profile: &CodecProfile,
    qos: &QosProposal,
) -> Selection {
    if !peer_supports(&peer.capabilities, profile) {
        warn!(
            "[NEGOTIATOR] Peer capabilities ({} bytes) do not list the endpoint profile, offering it anyway",
            peer.capabilities.len()
        );
    }

    let capabilities = match encode_configuration(profile) {
        Ok(records) if !records.is_empty() => records,
        _ => {
            error!("[NEGOTIATOR] Profile encoding failed, falling back to default configuration");
            LtvBuffer::from_slice(&FALLBACK_CONFIGURATION).unwrap_or_default()
        }
    };

    let qos = if qos.is_consistent() {
        *qos
    } else {
        warn!("[NEGOTIATOR] Configured QoS latency outside delay window, clamping");
        qos.clamped()
    };

    debug!(
        "[NEGOTIATOR] Selected {} configuration bytes, latency {}",
        capabilities.len(),
        qos.max_latency
    );

    Selection {
        capabilities,
        metadata: LtvBuffer::new(),
        qos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lc3::{ConfigurationRecord, Lc3Capabilities, encode_capabilities};

    fn assert_valid(selection: &Selection) {
        assert!(!selection.capabilities.is_empty());
        assert!(ConfigurationRecord::parse(&selection.capabilities).is_ok());
        let qos = selection.qos;
        assert!(qos.preferred_min_delay <= u32::from(qos.max_latency));
        assert!(u32::from(qos.max_latency) <= qos.preferred_max_delay);
    }

    #[test]
    fn test_default_selection() {
        let profile = CodecProfile::default();
        let peer = PeerCapabilities::new(
            &encode_capabilities(&Lc3Capabilities::for_profile(&profile)).unwrap(),
            &[],
        );
        let selection = select_properties(&peer, &profile, &QosProposal::default());

        assert_valid(&selection);
        assert!(selection.metadata.is_empty());
        assert_eq!(selection.qos.framing, 0x00);
        assert_eq!(selection.qos.phy, 0x02);
        assert_eq!(selection.qos.max_latency, 20);
        assert_eq!(selection.qos.preferred_min_delay, 20);
        assert_eq!(selection.qos.preferred_max_delay, 40);
        assert_eq!(selection.capabilities.as_slice(), &FALLBACK_CONFIGURATION);
    }

    #[test]
    fn test_selection_ignores_peer_input() {
        let profile = CodecProfile::default();
        let qos = QosProposal::default();
        let inputs: [&[u8]; 5] = [
            &[],
            &[0x00],
            &[0xFF, 0x01],
            &[0x03, 0x01, 0x04, 0x00],
            &[0xAB; 200],
        ];

        let expected = select_properties(&PeerCapabilities::default(), &profile, &qos);
        for input in inputs {
            let selection = select_properties(&PeerCapabilities::new(input, input), &profile, &qos);
            assert_valid(&selection);
            assert_eq!(selection, expected);
        }
    }

    #[test]
    fn test_peer_blob_truncated() {
        let peer = PeerCapabilities::new(&[0x11; 100], &[0x22; 3]);
        assert_eq!(peer.capabilities.len(), MAX_PEER_BLOB_LENGTH);
        assert_eq!(peer.metadata.as_slice(), &[0x22; 3]);
    }

    #[test]
    fn test_inconsistent_qos_clamped() {
        let profile = CodecProfile::default();
        let qos = QosProposal {
            max_latency: 100,
            ..QosProposal::default()
        };
        assert!(!qos.is_consistent());

        let selection = select_properties(&PeerCapabilities::default(), &profile, &qos);
        assert_valid(&selection);
        assert_eq!(selection.qos.max_latency, 40);

        let inverted = QosProposal {
            max_latency: 5,
            preferred_min_delay: 60,
            preferred_max_delay: 30,
            ..QosProposal::default()
        };
        let clamped = inverted.clamped();
        assert!(clamped.is_consistent());
        assert_eq!(clamped.preferred_min_delay, 30);
        assert_eq!(clamped.preferred_max_delay, 60);
        assert_eq!(clamped.max_latency, 30);
    }
}
