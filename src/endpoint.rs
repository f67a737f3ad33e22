//! Endpoint State Machine
//!
//! The control-plane side of the sink endpoint. Every `MediaEndpoint1` call
//! ends up in one of the methods below, which run strictly one at a time on
//! the control task. The endpoint is the only owner of the acquired
//! [`Transport`] and of the running stream session; nothing else creates or
//! closes them.
//!
//! ## States
//!
//! ```text
//!            SetConfiguration              worker spawned
//!   Idle ─────────────────────▶ Configuring ─────────────▶ Streaming
//!    ▲                              │                          │
//!    │          any failure         │                          │
//!    ├──────────────────────────────┘                          │
//!    │                    ClearConfiguration                   │
//!    └─────────────────────────────────────────────────────────┘
//!
//!   Release() from any state ──▶ Released
//! ```
//!
//! ## Teardown
//!
//! Stopping a stream always runs in the same order: raise the stop flag, join
//! the worker, close the descriptor, close the sink, clear the transport path.
//! The worker never touches the descriptor or the sink once the join returns.

use crate::audio::AudioBackend;
use crate::lc3::{CodecConfiguration, ConfigurationRecord};
use crate::negotiator::{self, PeerCapabilities, Selection};
use crate::stream::{StreamSession, StreamStats};
use crate::transport::{self, MediaTransportBus, ObjectPath, Transport};
use crate::{
    ConfigurationProperties, EndpointError, EndpointOptions, EndpointState, Request, Response,
};

/// LE Audio unicast sink endpoint
pub struct Endpoint<B: MediaTransportBus, A: AudioBackend> {
    options: EndpointOptions,
    config: CodecConfiguration,
    bus: B,
    audio: A,
    state: EndpointState,
    transport: Option<Transport<B::Channel>>,
    session: Option<StreamSession<A::Sink>>,
    last_stats: Option<StreamStats>,
}

impl<B: MediaTransportBus, A: AudioBackend> Endpoint<B, A> {
    /// Create an idle endpoint
    ///
    /// # Errors
    /// Returns [`EndpointError::Codec`] if the configured profile does not fit
    /// the frame and PCM buffers
    pub fn new(options: EndpointOptions, bus: B, audio: A) -> Result<Self, EndpointError> {
        let config = options.profile.configuration()?;
        info!(
            "[ENDPOINT] {} ready: {} Hz, {} channel(s), {} bytes per frame",
            options.endpoint_path,
            config.sample_rate_hz(),
            config.channels(),
            config.frame_bytes()
        );

        Ok(Self {
            options,
            config,
            bus,
            audio,
            state: EndpointState::Idle,
            transport: None,
            session: None,
            last_stats: None,
        })
    }

    /// Dispatch one control-plane request and build its reply
    pub fn process_request(&mut self, request: Request) -> Response {
        match request {
            Request::SelectProperties(peer) => Response::Selection(self.select_properties(&peer)),
            Request::SetConfiguration {
                transport,
                properties,
            } => match self.set_configuration(&transport, &properties) {
                Ok(()) => Response::Configured,
                Err(e) => Response::Error(e),
            },
            Request::ClearConfiguration(transport) => {
                self.clear_configuration(&transport);
                Response::Cleared
            }
            Request::Release => {
                self.release();
                Response::Released
            }
        }
    }

    /// Answer `SelectProperties`; never changes state
    #[must_use]
    pub fn select_properties(&self, peer: &PeerCapabilities) -> Selection {
        negotiator::select_properties(peer, &self.options.profile, &self.options.qos)
    }

    /// Answer `SetConfiguration`: acquire the transport and start streaming
    ///
    /// Nothing acquired along the way survives a failure; the endpoint is
    /// back in [`EndpointState::Idle`] when an error is returned.
    ///
    /// # Errors
    ///
    /// - [`EndpointError::Released`] after `Release`
    /// - [`EndpointError::Busy`] while a stream is configured
    /// - [`EndpointError::Codec`] if the configuration records contradict the profile
    /// - [`EndpointError::Acquire`] if the transport cannot be acquired
    /// - [`EndpointError::InvalidArguments`] if the read MTU cannot carry a frame
    /// - [`EndpointError::Sink`] or [`EndpointError::Decoder`] if audio setup fails
    /// - [`EndpointError::Failed`] if the worker thread cannot be started
    pub fn set_configuration(
        &mut self,
        transport: &ObjectPath,
        properties: &ConfigurationProperties,
    ) -> Result<(), EndpointError> {
        match self.state {
            EndpointState::Idle => {}
            EndpointState::Configuring | EndpointState::Streaming => {
                warn!(
                    "[ENDPOINT] SetConfiguration for {} while a stream is configured",
                    transport.as_str()
                );
                return Err(EndpointError::Busy);
            }
            EndpointState::Released => return Err(EndpointError::Released),
        }

        self.check_properties(properties)?;

        self.state = EndpointState::Configuring;
        match self.start_stream(transport) {
            Ok(()) => {
                self.state = EndpointState::Streaming;
                info!("[ENDPOINT] Streaming from {}", transport.as_str());
                Ok(())
            }
            Err(e) => {
                self.state = EndpointState::Idle;
                warn!(
                    "[ENDPOINT] SetConfiguration for {} failed: {}",
                    transport.as_str(),
                    e.bus_error_name()
                );
                Err(e)
            }
        }
    }

    /// Answer `ClearConfiguration`: stop the stream on `transport`
    ///
    /// Always succeeds, and is a no-op with nothing configured. The endpoint
    /// has a single stream, so a path that is not the active transport still
    /// tears it down.
    pub fn clear_configuration(&mut self, transport: &ObjectPath) {
        match self.state {
            EndpointState::Idle | EndpointState::Released => {
                debug!("[ENDPOINT] Nothing to clear for {}", transport.as_str());
            }
            EndpointState::Configuring | EndpointState::Streaming => {
                if let Some(active) = self.transport_path().filter(|active| *active != transport) {
                    warn!(
                        "[ENDPOINT] ClearConfiguration for {} while streaming from {}",
                        transport.as_str(),
                        active.as_str()
                    );
                }
                self.teardown();
                self.state = EndpointState::Idle;
                info!("[ENDPOINT] Cleared {}", transport.as_str());
            }
        }
    }

    /// Answer `Release`: stop any stream and refuse further configuration
    pub fn release(&mut self) {
        if self.state != EndpointState::Released {
            info!("[ENDPOINT] Releasing {}", self.options.endpoint_path);
        }
        self.teardown();
        self.state = EndpointState::Released;
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Path of the acquired transport, if any
    #[must_use]
    pub fn transport_path(&self) -> Option<&ObjectPath> {
        self.transport.as_ref().map(Transport::path)
    }

    /// Whether a worker is currently running
    ///
    /// `false` while still [`EndpointState::Streaming`] means the transport
    /// ended on its own and is waiting for `ClearConfiguration`.
    #[must_use]
    pub fn is_stream_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.is_finished())
    }

    /// Counters of the last stream that was torn down
    #[must_use]
    pub const fn last_stream_stats(&self) -> Option<StreamStats> {
        self.last_stats
    }

    /// Codec configuration every stream is decoded with
    #[must_use]
    pub const fn configuration(&self) -> &CodecConfiguration {
        &self.config
    }

    /// Endpoint options
    #[must_use]
    pub const fn options(&self) -> &EndpointOptions {
        &self.options
    }

    fn check_properties(&self, properties: &ConfigurationProperties) -> Result<(), EndpointError> {
        let record = ConfigurationRecord::parse(&properties.capabilities)?;
        if let Err(e) = record.check_against(&self.options.profile) {
            warn!("[ENDPOINT] Configuration records do not match the endpoint profile");
            return Err(e.into());
        }
        Ok(())
    }

    fn start_stream(&mut self, path: &ObjectPath) -> Result<(), EndpointError> {
        let transport = transport::acquire(&mut self.bus, path)?;

        if usize::from(transport.read_mtu()) < self.config.frame_bytes() {
            warn!(
                "[ENDPOINT] Read MTU {} smaller than a {} byte frame",
                transport.read_mtu(),
                self.config.frame_bytes()
            );
            transport.close();
            return Err(EndpointError::InvalidArguments);
        }

        let sink = match self.audio.open_sink(&self.config) {
            Ok(sink) => sink,
            Err(e) => {
                transport.close();
                return Err(EndpointError::Sink(e));
            }
        };

        let decoder = match self.audio.open_decoder(&self.config) {
            Ok(decoder) => decoder,
            Err(e) => {
                drop(sink);
                transport.close();
                return Err(EndpointError::Decoder(e));
            }
        };

        let session = match StreamSession::spawn(transport.channel(), decoder, sink, self.config) {
            Ok(session) => session,
            Err(e) => {
                error!("[ENDPOINT] Could not start stream worker");
                transport.close();
                return Err(e);
            }
        };

        self.transport = Some(transport);
        self.session = Some(session);
        Ok(())
    }

    fn teardown(&mut self) {
        let sink = match self.session.take().map(StreamSession::stop) {
            Some(Some((sink, stats))) => {
                debug!(
                    "[ENDPOINT] Worker joined after {} frames, {} underruns",
                    stats.frames_decoded, stats.underruns_recovered
                );
                self.last_stats = Some(stats);
                Some(sink)
            }
            Some(None) => {
                error!("[ENDPOINT] Worker did not return its sink");
                None
            }
            None => None,
        };

        let path = self.transport.take().map(|transport| {
            let (path, closed) = transport.close();
            if !closed {
                warn!("[ENDPOINT] Descriptor for {} closed late", path.as_str());
            }
            path
        });

        if let Some(sink) = sink {
            trace!("[ENDPOINT] Closing sink");
            drop(sink);
        }

        if let Some(path) = path {
            debug!("[ENDPOINT] Transport {} released", path.as_str());
        }
    }
}

impl<B: MediaTransportBus, A: AudioBackend> Drop for Endpoint<B, A> {
    fn drop(&mut self) {
        self.teardown();
    }
}
