//! Endpoint API Functions
//!
//! Caller-side functions for the `MediaEndpoint1` methods. A bus adapter calls
//! these from its method handlers; each one queues a [`Request`] on the
//! [`EndpointService`], waits for the processor task to answer and turns the
//! [`Response`] into a `Result`. An `Err` is meant to be sent back as the bus
//! error named by [`EndpointError::bus_error_name`].
//!
//! Calls from several handlers may overlap; they are answered one after the
//! other. A call dropped before its reply arrives does not disturb the next
//! one, and calls made after the processor shut down are answered as if the
//! endpoint had been released.
//!
//! # Usage
//!
//! ```rust,ignore
//! // SelectProperties(a{sv})
//! let selection = SERVICE.select_properties(&capabilities, &metadata).await?;
//!
//! // SetConfiguration(o, a{sv})
//! SERVICE.set_configuration(transport_path, &capabilities, &metadata).await?;
//!
//! // ClearConfiguration(o) and Release()
//! SERVICE.clear_configuration(transport_path).await?;
//! SERVICE.release().await?;
//! ```

use crate::negotiator::{PeerCapabilities, Selection};
use crate::processor::{EndpointService, closed_reply};
use crate::transport::ObjectPath;
use crate::{ConfigurationProperties, EndpointError, Request, Response};
use embassy_sync::blocking_mutex::raw::RawMutex;

impl<M: RawMutex, const N: usize> EndpointService<M, N> {
    /// Submit a request and wait for its reply
    pub async fn invoke(&self, request: Request) -> Response {
        let mut invocation = self.invocation.lock().await;
        if self.is_closed() {
            return closed_reply(&request);
        }

        *invocation = invocation.wrapping_add(1);
        let tag = *invocation;
        self.requests.send((tag, request)).await;

        loop {
            let (reply_tag, response) = self.responses.receive().await;
            if reply_tag == tag {
                return response;
            }
            debug!("[API] Dropping stale reply {}: {}", reply_tag, response.kind());
        }
    }

    /// Negotiate the codec configuration and `QoS` for a peer.
    ///
    /// Oversized peer blobs are truncated.
    ///
    /// # Errors
    ///
    /// Returns an error if the response is unexpected.
    pub async fn select_properties(
        &self,
        capabilities: &[u8],
        metadata: &[u8],
    ) -> Result<Selection, EndpointError> {
        let peer = PeerCapabilities::new(capabilities, metadata);
        match self.invoke(Request::SelectProperties(peer)).await {
            Response::Selection(selection) => Ok(selection),
            Response::Error(e) => Err(e),
            _ => Err(EndpointError::UnexpectedResponse),
        }
    }

    /// Configure the transport at `transport` and start streaming from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the path or properties are invalid, a stream is
    /// already configured, the endpoint was released, acquisition or audio
    /// setup fails, or the response is unexpected.
    pub async fn set_configuration(
        &self,
        transport: &str,
        capabilities: &[u8],
        metadata: &[u8],
    ) -> Result<(), EndpointError> {
        let request = Request::SetConfiguration {
            transport: ObjectPath::try_from(transport)?,
            properties: ConfigurationProperties::new(capabilities, metadata)?,
        };
        match self.invoke(request).await {
            Response::Configured => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(EndpointError::UnexpectedResponse),
        }
    }

    /// Stop the stream on `transport`, if it is the active one.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the response is unexpected.
    pub async fn clear_configuration(&self, transport: &str) -> Result<(), EndpointError> {
        let transport = ObjectPath::try_from(transport)?;
        match self.invoke(Request::ClearConfiguration(transport)).await {
            Response::Cleared => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(EndpointError::UnexpectedResponse),
        }
    }

    /// Release the endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the response is unexpected.
    pub async fn release(&self) -> Result<(), EndpointError> {
        match self.invoke(Request::Release).await {
            Response::Released => Ok(()),
            Response::Error(e) => Err(e),
            _ => Err(EndpointError::UnexpectedResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use core::sync::atomic::Ordering;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    type Service = EndpointService<CriticalSectionRawMutex, 2>;

    #[test]
    fn test_invalid_path_rejected_before_queueing() {
        let service = Service::new();

        assert_eq!(
            block_on(service.set_configuration("no-slash", &[], &[])),
            Err(EndpointError::InvalidArguments)
        );
        assert_eq!(
            block_on(service.clear_configuration("")),
            Err(EndpointError::InvalidArguments)
        );
        assert!(service.requests.is_empty());
    }

    #[test]
    fn test_oversized_properties_rejected() {
        let service = Service::new();

        assert_eq!(
            block_on(service.set_configuration("/transport/0", &[0u8; 100], &[])),
            Err(EndpointError::InvalidArguments)
        );
        assert!(service.requests.is_empty());
    }

    #[test]
    fn test_mismatched_reply_is_unexpected() {
        let service = Service::new();
        service.responses.try_send((1, Response::Cleared)).unwrap();

        assert_eq!(
            block_on(service.release()),
            Err(EndpointError::UnexpectedResponse)
        );
        let (tag, request) = service.requests.try_receive().unwrap();
        assert_eq!(tag, 1);
        assert_eq!(request.method(), "Release");
    }

    #[test]
    fn test_stale_reply_skipped() {
        let service = Service::new();
        service.responses.try_send((7, Response::Cleared)).unwrap();
        service.responses.try_send((1, Response::Released)).unwrap();

        assert_eq!(block_on(service.release()), Ok(()));
        assert!(service.responses.is_empty());
    }

    #[test]
    fn test_closed_service_answers_without_queueing() {
        let service = Service::new();
        service.closed.store(true, Ordering::Release);

        assert_eq!(
            block_on(service.set_configuration("/transport/0", &[], &[])),
            Err(EndpointError::Released)
        );
        assert_eq!(
            block_on(service.select_properties(&[], &[])),
            Err(EndpointError::Released)
        );
        assert_eq!(block_on(service.clear_configuration("/transport/0")), Ok(()));
        assert_eq!(block_on(service.release()), Ok(()));
        assert!(service.requests.is_empty());
    }
}
