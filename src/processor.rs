//! Processor Task - control-plane request processing
//!
//! A bus adapter forwards every `MediaEndpoint1` method call as a [`Request`]
//! into an [`EndpointService`] and waits for the matching [`Response`]. The
//! processor task owns the [`Endpoint`] and handles those requests one at a
//! time, in the order they were submitted, so the state machine never sees two
//! invocations at once.
//!
//! # Usage
//!
//! ```rust,ignore
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//! use embassy_sync::signal::Signal;
//! use leaudio_sink::{Endpoint, EndpointOptions, processor::{self, DefaultEndpointService}};
//!
//! static SERVICE: DefaultEndpointService = DefaultEndpointService::new();
//! static SHUTDOWN: Signal<CriticalSectionRawMutex, ()> = Signal::new();
//!
//! // Control thread
//! let mut endpoint = Endpoint::new(EndpointOptions::default(), bus, audio)?;
//! embassy_futures::block_on(processor::run(&mut endpoint, &SERVICE, &SHUTDOWN));
//!
//! // Bus adapter, on an incoming SetConfiguration call
//! embassy_futures::block_on(SERVICE.set_configuration(path, &capabilities, &metadata))?;
//! ```
//!
//! # Architecture
//!
//! * **Request channel**: bounded queue of pending method calls, each tagged
//! * **Response channel**: replies carrying the tag of the request they answer
//! * **Invocation lock**: one caller at a time; also holds the last tag handed out
//!
//! A caller that gives up waiting leaves its reply behind in the response
//! channel. The next caller skips replies that do not carry its own tag.
//!
//! After shutdown the service stays answerable: requests still queued or
//! submitted later get the reply of a released endpoint instead of hanging.
//!
//! # Generic Parameters
//!
//! * `M: RawMutex` - Mutex flavour for the channels (`CriticalSectionRawMutex` across threads)
//! * `N` - Depth of the request and response queues

use crate::audio::AudioBackend;
use crate::constants::REQUEST_QUEUE_DEPTH;
use crate::endpoint::Endpoint;
use crate::transport::MediaTransportBus;
use crate::{Request, Response};
use crate::EndpointError;
use core::sync::atomic::{AtomicBool, Ordering};
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

/// Tag pairing a request with its reply
pub type InvocationTag = u32;

/// Request and response queues shared by callers and the processor task
pub struct EndpointService<M: RawMutex, const N: usize> {
    pub(crate) requests: Channel<M, (InvocationTag, Request), N>,
    pub(crate) responses: Channel<M, (InvocationTag, Response), N>,
    pub(crate) invocation: Mutex<M, InvocationTag>,
    pub(crate) closed: AtomicBool,
}

impl<M: RawMutex, const N: usize> EndpointService<M, N> {
    /// Create an empty service, usable in a `static`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
            responses: Channel::new(),
            invocation: Mutex::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether the processor has shut down
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<M: RawMutex, const N: usize> Default for EndpointService<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Service shared across threads, with the default queue depth
pub type DefaultEndpointService = EndpointService<CriticalSectionRawMutex, REQUEST_QUEUE_DEPTH>;

/// Reply given once the processor has shut down
pub(crate) fn closed_reply(request: &Request) -> Response {
    match request {
        Request::ClearConfiguration(_) => Response::Cleared,
        Request::Release => Response::Released,
        Request::SelectProperties(_) | Request::SetConfiguration { .. } => {
            Response::Error(EndpointError::Released)
        }
    }
}

async fn serve<B, A, M, const N: usize>(
    endpoint: &mut Endpoint<B, A>,
    service: &EndpointService<M, N>,
    tag: InvocationTag,
    request: Request,
) where
    B: MediaTransportBus,
    A: AudioBackend,
    M: RawMutex,
{
    debug!("[PROCESSOR] API request {}: {}", tag, request.method());

    let response = endpoint.process_request(request);
    debug!("[PROCESSOR] API response {}: {}", tag, response.kind());

    service.responses.send((tag, response)).await;
}

/// Answer whatever is still pending after shutdown, then return
///
/// Returns once no caller holds the invocation lock. Callers arriving later
/// see the closed flag and never queue a request.
async fn close<M: RawMutex, const N: usize>(service: &EndpointService<M, N>) {
    service.closed.store(true, Ordering::Release);

    loop {
        match select(service.requests.receive(), service.invocation.lock()).await {
            Either::First((tag, request)) => {
                debug!("[PROCESSOR] Closed, refusing {}: {}", tag, request.method());
                service.responses.send((tag, closed_reply(&request))).await;
            }
            Either::Second(_idle) => {
                // Left behind by callers that stopped waiting
                while service.requests.try_receive().is_ok() {}
                return;
            }
        }
    }
}

/// Run the processor until `shutdown` is signalled, then release the endpoint
///
/// A request already taken off the queue when the signal arrives is completed
/// and answered first. The service is then closed: pending and later calls are
/// answered as if sent to a released endpoint.
pub async fn run<B, A, M, const N: usize>(
    endpoint: &mut Endpoint<B, A>,
    service: &EndpointService<M, N>,
    shutdown: &Signal<M, ()>,
) where
    B: MediaTransportBus,
    A: AudioBackend,
    M: RawMutex,
{
    info!("[PROCESSOR] Serving {}", endpoint.options().endpoint_path);

    while let Either::First((tag, request)) =
        select(service.requests.receive(), shutdown.wait()).await
    {
        serve(endpoint, service, tag, request).await;
    }
    info!("[PROCESSOR] Shutdown requested");

    endpoint.release();
    close(service).await;
}
