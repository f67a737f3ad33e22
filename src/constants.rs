//! Endpoint Constants
//!
//! This module contains the constants used throughout the crate: `BlueZ` object
//! and interface names, the fixed LC3 profile advertised by the endpoint, the
//! default `QoS` proposal and the capacities of the fixed-size buffers.

/// Well-known bus name of the `BlueZ` daemon
pub const BLUEZ_SERVICE: &str = "org.bluez";

/// Default adapter object path the endpoint registers against
pub const DEFAULT_ADAPTER_PATH: &str = "/org/bluez/hci0";

/// Object path the endpoint is exported at
pub const DEFAULT_ENDPOINT_PATH: &str = "/leaudio/endpoint0";

/// Interface used to register media endpoints
pub const MEDIA_INTERFACE: &str = "org.bluez.Media1";

/// Interface implemented by this endpoint
pub const MEDIA_ENDPOINT_INTERFACE: &str = "org.bluez.MediaEndpoint1";

/// Interface of the transport objects handed to `SetConfiguration`
pub const MEDIA_TRANSPORT_INTERFACE: &str = "org.bluez.MediaTransport1";

/// Published Audio Capabilities sink characteristic UUID (Unicast Sink role)
pub const PAC_SINK_UUID: &str = "00002bc9-0000-1000-8000-00805f9b34fb";

/// LC3 coding format identifier
pub const LC3_CODEC_ID: u8 = 0x06;

/// Default number of audio channels of the advertised profile
pub const DEFAULT_CHANNEL_COUNT: u8 = 1;

/// Default octets per LC3 frame (48 kHz / 10 ms, 96 kbps)
pub const DEFAULT_OCTETS_PER_FRAME: u16 = 120;

/// Smallest LC3 frame size in octets
pub const MIN_LC3_OCTETS_PER_FRAME: u16 = 20;

/// Largest LC3 frame size in octets
pub const MAX_LC3_OCTETS_PER_FRAME: u16 = 400;

/// Capacity of the frame scratch buffer used by the streaming worker
pub const MAX_FRAME_BYTES: usize = 512;

/// Capacity of the PCM buffer used by the streaming worker (all channels)
pub const MAX_PCM_SAMPLES: usize = 960;

/// Capacity of an encoded LTV record set
pub const MAX_LTV_LENGTH: usize = 32;

/// Capacity of the peer capability and metadata blobs kept from a request
pub const MAX_PEER_BLOB_LENGTH: usize = 64;

/// Maximum length of a bus object path
pub const MAX_OBJECT_PATH_LENGTH: usize = 128;

/// `QoS` framing: unframed ISOAL PDUs
pub const FRAMING_UNFRAMED: u8 = 0x00;

/// `QoS` PHY preference: LE 2M
pub const PHY_2M: u8 = 0x02;

/// Default maximum transport latency in milliseconds
pub const DEFAULT_MAX_LATENCY_MS: u16 = 20;

/// Default preferred minimum presentation delay
pub const DEFAULT_PREFERRED_MIN_DELAY: u32 = 20;

/// Default preferred maximum presentation delay
pub const DEFAULT_PREFERRED_MAX_DELAY: u32 = 40;

/// Depth of the request and response queues between bus adapter and endpoint
pub const REQUEST_QUEUE_DEPTH: usize = 4;

/// Name given to the streaming worker thread
pub const STREAM_THREAD_NAME: &str = "leaudio-rx";
