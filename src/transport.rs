//! Transport Acquirer
//!
//! Resolves a `MediaTransport1` object path into an open isochronous channel.
//! `Acquire` is issued synchronously on the control thread; its `(hqq)` reply
//! carries the descriptor and the read and write MTUs. Ownership of the
//! descriptor passes to the caller the moment acquisition returns.
//!
//! ## Descriptor ownership
//!
//! The acquired channel is wrapped in a [`Transport`], owned by the endpoint.
//! The streaming worker only ever holds a shared reference to the channel for
//! the duration of its run, and the endpoint closes the descriptor in
//! [`Transport::close`] after the worker has been joined. Closing is done by
//! dropping the last reference, so it happens exactly once.

use crate::EndpointError;
use crate::constants::{MAX_OBJECT_PATH_LENGTH, MEDIA_TRANSPORT_INTERFACE};
use heapless::String;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::sync::Arc;

/// Bus object path (transport or endpoint)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath(String<MAX_OBJECT_PATH_LENGTH>);

impl ObjectPath {
    /// Path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = EndpointError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        if !path.starts_with('/') {
            return Err(EndpointError::InvalidArguments);
        }
        String::try_from(path)
            .map(Self)
            .map_err(|()| EndpointError::InvalidArguments)
    }
}

impl core::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-plane channel behind an acquired transport
///
/// Reads must not close the channel; it is closed when the value is dropped.
pub trait IsoChannel: Send + Sync + 'static {
    /// Read at most `buf.len()` bytes of the next SDU
    ///
    /// # Errors
    /// Returns the underlying I/O error; `Ok(0)` means the channel has ended
    fn read_frame(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// ISO socket descriptor handed out by `MediaTransport1.Acquire`
#[derive(Debug)]
pub struct IsoSocket {
    file: File,
}

impl From<OwnedFd> for IsoSocket {
    fn from(fd: OwnedFd) -> Self {
        Self {
            file: File::from(fd),
        }
    }
}

impl AsFd for IsoSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl IsoChannel for IsoSocket {
    fn read_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.file).read(buf)
    }
}

/// Reply of a successful `Acquire`
#[derive(Debug)]
pub struct AcquiredTransport<C> {
    /// Open channel, owned by the receiver
    pub channel: C,
    /// Negotiated read MTU
    pub read_mtu: u16,
    /// Negotiated write MTU
    pub write_mtu: u16,
}

/// Failure reported by the transport's `Acquire`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquireError {
    /// Remote side rejected the call (`org.bluez.Error.Failed`)
    Rejected,
    /// Caller is not allowed to acquire the transport
    NotAuthorized,
    /// Transport is not in a state that can be acquired
    NotAvailable,
    /// Reply did not carry a usable descriptor
    InvalidReply,
}

impl core::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Rejected => write!(f, "Transport acquire rejected"),
            Self::NotAuthorized => write!(f, "Not authorized to acquire transport"),
            Self::NotAvailable => write!(f, "Transport not available"),
            Self::InvalidReply => write!(f, "Acquire reply carried no descriptor"),
        }
    }
}

/// Control-plane access to `MediaTransport1` objects
pub trait MediaTransportBus {
    /// Channel type handed out on acquisition
    type Channel: IsoChannel;

    /// Call `Acquire` on the transport at `path` and wait for the reply
    ///
    /// # Errors
    /// Returns error if the remote call fails or the reply is unusable
    fn acquire(
        &mut self,
        path: &ObjectPath,
    ) -> Result<AcquiredTransport<Self::Channel>, AcquireError>;
}

/// Acquired transport owned by the endpoint
#[derive(Debug)]
pub struct Transport<C> {
    path: ObjectPath,
    channel: Arc<C>,
    read_mtu: u16,
}

impl<C: IsoChannel> Transport<C> {
    /// Transport object path
    #[must_use]
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Negotiated read MTU
    #[must_use]
    pub const fn read_mtu(&self) -> u16 {
        self.read_mtu
    }

    /// Shared handle for the streaming worker
    pub(crate) fn channel(&self) -> Arc<C> {
        Arc::clone(&self.channel)
    }

    /// Close the descriptor
    ///
    /// Returns the path, which the caller clears last, and whether this call
    /// closed the descriptor. `false` means a reader still held the channel;
    /// the descriptor is then closed when that reader lets go.
    pub(crate) fn close(self) -> (ObjectPath, bool) {
        let Self { path, channel, .. } = self;
        match Arc::try_unwrap(channel) {
            Ok(channel) => {
                drop(channel);
                (path, true)
            }
            Err(shared) => {
                error!(
                    "[TRANSPORT] Channel for {} still shared at close",
                    path.as_str()
                );
                drop(shared);
                (path, false)
            }
        }
    }
}

/// Acquire the transport at `path`
///
/// Performs no endpoint state changes; on success the returned [`Transport`]
/// is the only owner of the descriptor.
///
/// # Errors
/// Returns the bus error if `Acquire` fails
pub fn acquire<B: MediaTransportBus>(
    bus: &mut B,
    path: &ObjectPath,
) -> Result<Transport<B::Channel>, AcquireError> {
    debug!(
        "[TRANSPORT] {}.Acquire on {}",
        MEDIA_TRANSPORT_INTERFACE,
        path.as_str()
    );
    let acquired = bus.acquire(path)?;
    info!(
        "[TRANSPORT] Acquired {} (read MTU {}, write MTU {})",
        path.as_str(),
        acquired.read_mtu,
        acquired.write_mtu
    );

    Ok(Transport {
        path: path.clone(),
        channel: Arc::new(acquired.channel),
        read_mtu: acquired.read_mtu,
    })
}
