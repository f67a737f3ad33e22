#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::too_many_lines)]

#[macro_use]
mod fmt;

pub mod api;
pub mod audio;
pub mod constants;
pub mod endpoint;
pub mod lc3;
pub mod negotiator;
pub mod processor;
pub mod registration;
pub mod stream;
pub mod transport;

#[cfg(test)]
mod mock;

use crate::audio::{DecodeError, SinkError};
use crate::constants::{DEFAULT_ADAPTER_PATH, DEFAULT_ENDPOINT_PATH, MAX_PEER_BLOB_LENGTH};
use crate::lc3::{CodecProfile, Lc3Error};
use crate::negotiator::{PeerCapabilities, QosProposal, Selection};
use crate::transport::{AcquireError, ObjectPath};
use heapless::Vec;

pub use endpoint::Endpoint;
pub use processor::EndpointService;

/// Options for configuring an [`Endpoint`]
///
/// The codec profile and `QoS` proposal are advertised as-is to every peer.
///
/// # Examples
///
/// ```rust
/// use leaudio_sink::{EndpointOptions, lc3::CodecProfile, negotiator::QosProposal};
///
/// let options = EndpointOptions {
///     adapter_path: "/org/bluez/hci1",
///     qos: QosProposal {
///         max_latency: 30,
///         ..QosProposal::default()
///     },
///     ..EndpointOptions::default()
/// };
/// assert_eq!(options.profile, CodecProfile::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointOptions {
    /// Adapter the endpoint registers on
    pub adapter_path: &'static str,
    /// Object path the endpoint is exported at
    pub endpoint_path: &'static str,
    /// LC3 profile offered to peers
    pub profile: CodecProfile,
    /// `QoS` proposal offered to peers
    pub qos: QosProposal,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            adapter_path: DEFAULT_ADAPTER_PATH,
            endpoint_path: DEFAULT_ENDPOINT_PATH,
            profile: CodecProfile::default(),
            qos: QosProposal::default(),
        }
    }
}

/// Lifecycle state of the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointState {
    /// No transport, ready for `SetConfiguration`
    Idle,
    /// Transport acquisition in progress
    Configuring,
    /// Worker running on an acquired transport
    Streaming,
    /// Released by the host; no further configuration is accepted
    Released,
}

/// Errors replied to control-plane requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointError {
    /// Transport acquisition failed
    Acquire(AcquireError),
    /// Codec configuration rejected
    Codec(Lc3Error),
    /// Decoder could not be set up
    Decoder(DecodeError),
    /// Audio sink could not be opened
    Sink(SinkError),
    /// Malformed request arguments
    InvalidArguments,
    /// A stream is already configured
    Busy,
    /// Endpoint has been released
    Released,
    /// Internal failure (e.g. worker thread could not be started)
    Failed,
    /// Reply did not match the request
    UnexpectedResponse,
}

impl EndpointError {
    /// Bus error name to reply with
    #[must_use]
    pub const fn bus_error_name(&self) -> &'static str {
        match self {
            Self::Codec(_) | Self::InvalidArguments => "org.bluez.Error.InvalidArguments",
            Self::Busy => "org.bluez.Error.InProgress",
            Self::Released => "org.bluez.Error.NotAvailable",
            Self::Acquire(_)
            | Self::Decoder(_)
            | Self::Sink(_)
            | Self::Failed
            | Self::UnexpectedResponse => "org.bluez.Error.Failed",
        }
    }
}

impl core::fmt::Display for EndpointError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Acquire(e) => write!(f, "{e}"),
            Self::Codec(e) => write!(f, "{e}"),
            Self::Decoder(e) => write!(f, "{e}"),
            Self::Sink(e) => write!(f, "{e}"),
            Self::InvalidArguments => write!(f, "Invalid arguments"),
            Self::Busy => write!(f, "Endpoint already streaming"),
            Self::Released => write!(f, "Endpoint released"),
            Self::Failed => write!(f, "Stream could not be started"),
            Self::UnexpectedResponse => write!(f, "Unexpected response"),
        }
    }
}

impl From<AcquireError> for EndpointError {
    fn from(error: AcquireError) -> Self {
        Self::Acquire(error)
    }
}

impl From<Lc3Error> for EndpointError {
    fn from(error: Lc3Error) -> Self {
        Self::Codec(error)
    }
}

/// Properties passed with `SetConfiguration`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationProperties {
    /// Codec-specific configuration LTV records (may be empty)
    pub capabilities: Vec<u8, MAX_PEER_BLOB_LENGTH>,
    /// Metadata LTV records
    pub metadata: Vec<u8, MAX_PEER_BLOB_LENGTH>,
}

impl ConfigurationProperties {
    /// Copy the property blobs
    ///
    /// # Errors
    /// Returns [`EndpointError::InvalidArguments`] if a blob exceeds capacity
    pub fn new(capabilities: &[u8], metadata: &[u8]) -> Result<Self, EndpointError> {
        Ok(Self {
            capabilities: Vec::from_slice(capabilities)
                .map_err(|()| EndpointError::InvalidArguments)?,
            metadata: Vec::from_slice(metadata).map_err(|()| EndpointError::InvalidArguments)?,
        })
    }
}

/// Control-plane requests, one variant per `MediaEndpoint1` method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `SelectProperties(a{sv})`
    SelectProperties(PeerCapabilities),
    /// `SetConfiguration(o, a{sv})`
    SetConfiguration {
        /// Transport object path
        transport: ObjectPath,
        /// Configuration properties
        properties: ConfigurationProperties,
    },
    /// `ClearConfiguration(o)`
    ClearConfiguration(ObjectPath),
    /// `Release()`
    Release,
}

impl Request {
    /// Bus method name of the request
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::SelectProperties(_) => "SelectProperties",
            Self::SetConfiguration { .. } => "SetConfiguration",
            Self::ClearConfiguration(_) => "ClearConfiguration",
            Self::Release => "Release",
        }
    }
}

/// Replies to control-plane requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Chosen configuration and `QoS`
    Selection(Selection),
    /// Stream configured and started
    Configured,
    /// Configuration cleared (or nothing to clear)
    Cleared,
    /// Endpoint released
    Released,
    /// Structured error reply
    Error(EndpointError),
}

impl Response {
    /// Short name for logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Selection(_) => "Selection",
            Self::Configured => "Configured",
            Self::Cleared => "Cleared",
            Self::Released => "Released",
            Self::Error(_) => "Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_options_default() {
        let options = EndpointOptions::default();
        assert_eq!(options.adapter_path, "/org/bluez/hci0");
        assert_eq!(options.endpoint_path, "/leaudio/endpoint0");
        assert_eq!(options.profile, CodecProfile::mono_48khz_10ms());
        assert_eq!(options.qos, QosProposal::unframed_2m());
    }

    #[test]
    fn test_bus_error_names() {
        assert_eq!(
            EndpointError::Acquire(AcquireError::Rejected).bus_error_name(),
            "org.bluez.Error.Failed"
        );
        assert_eq!(
            EndpointError::Codec(Lc3Error::ProfileMismatch).bus_error_name(),
            "org.bluez.Error.InvalidArguments"
        );
        assert_eq!(
            EndpointError::Busy.bus_error_name(),
            "org.bluez.Error.InProgress"
        );
        assert_eq!(
            EndpointError::Released.bus_error_name(),
            "org.bluez.Error.NotAvailable"
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            EndpointError::Acquire(AcquireError::Rejected).to_string(),
            "Transport acquire rejected"
        );
        assert_eq!(
            EndpointError::Sink(SinkError::OpenFailed).to_string(),
            "Audio sink could not be opened"
        );
    }

    #[test]
    fn test_configuration_properties_capacity() {
        let properties = ConfigurationProperties::new(&[0x02, 0x01, 0x08], &[]).unwrap();
        assert_eq!(properties.capabilities.as_slice(), &[0x02, 0x01, 0x08]);

        assert_eq!(
            ConfigurationProperties::new(&[0u8; MAX_PEER_BLOB_LENGTH + 1], &[]),
            Err(EndpointError::InvalidArguments)
        );
    }

    #[test]
    fn test_request_method_names() {
        let path = ObjectPath::try_from("/transport/0").unwrap();
        assert_eq!(
            Request::SelectProperties(PeerCapabilities::default()).method(),
            "SelectProperties"
        );
        assert_eq!(
            Request::SetConfiguration {
                transport: path.clone(),
                properties: ConfigurationProperties::default(),
            }
            .method(),
            "SetConfiguration"
        );
        assert_eq!(
            Request::ClearConfiguration(path).method(),
            "ClearConfiguration"
        );
        assert_eq!(Request::Release.method(), "Release");
    }
}
