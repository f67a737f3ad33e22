//! Streaming Worker
//!
//! One worker thread per stream session: read a frame from the ISO channel,
//! decode it, write the PCM to the sink, repeat. The worker ends on its own
//! when the channel reports end of stream or a read error, and otherwise runs
//! until the endpoint raises the stop flag, which is checked once per frame.
//!
//! ## Ownership
//!
//! - The decoder and the sink move into the worker and the sink is handed
//!   back through the join, so the endpoint closes it after the descriptor.
//! - The channel is shared, never closed by the worker.
//! - `StreamSession` joins the worker before it can be dropped.
//! - A panic in the loop is caught on the worker, so the sink still comes
//!   back and is closed in order.
//!
//! Cancellation is cooperative: a read that blocks delays the stop until it
//! returns.

use crate::EndpointError;
use crate::audio::{FrameDecoder, PcmSink};
use crate::constants::{MAX_FRAME_BYTES, MAX_PCM_SAMPLES, STREAM_THREAD_NAME};
use crate::lc3::CodecConfiguration;
use crate::transport::IsoChannel;
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamExit {
    /// Stop flag raised by the endpoint
    Stopped,
    /// Channel read returned zero bytes
    EndOfStream,
    /// Channel read failed
    ReadError,
    /// The loop panicked; counters of the run are lost
    Panicked,
}

/// Counters collected by a worker over its run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamStats {
    /// Frames read and decoded
    pub frames_decoded: u64,
    /// PCM frames accepted by the sink
    pub samples_written: u64,
    /// Failed sink writes that were recovered
    pub underruns_recovered: u32,
    /// Frames skipped because they failed to decode
    pub decode_errors: u32,
    /// Exit reason, set once the worker returns
    pub exit: Option<StreamExit>,
}

/// Run the decode-and-play loop on the current thread until it exits
///
/// # Panics
/// Panics if `config` exceeds the scratch buffer capacities, which
/// [`crate::lc3::CodecProfile::configuration`] rules out.
pub fn run_stream<C, D, S>(
    channel: &C,
    decoder: &mut D,
    sink: &mut S,
    config: &CodecConfiguration,
    stop: &AtomicBool,
) -> StreamStats
where
    C: IsoChannel + ?Sized,
    D: FrameDecoder,
    S: PcmSink,
{
    let mut frame = [0u8; MAX_FRAME_BYTES];
    let mut pcm = [0i16; MAX_PCM_SAMPLES];
    let frame = &mut frame[..config.frame_bytes()];
    let pcm = &mut pcm[..config.pcm_samples_per_frame()];
    let mut stats = StreamStats::default();

    let exit = loop {
        if stop.load(Ordering::Acquire) {
            break StreamExit::Stopped;
        }

        let len = match channel.read_frame(frame) {
            Ok(0) => break StreamExit::EndOfStream,
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("[STREAM] Read failed (os error {})", e.raw_os_error().unwrap_or(-1));
                break StreamExit::ReadError;
            }
        };

        if let Err(e) = decoder.decode(&frame[..len], pcm) {
            stats.decode_errors = stats.decode_errors.saturating_add(1);
            warn!("[STREAM] Dropping {} byte frame: {:?}", len, e);
            continue;
        }
        stats.frames_decoded += 1;

        match sink.write(pcm) {
            Ok(written) => stats.samples_written += written as u64,
            Err(e) => {
                trace!("[STREAM] Sink write failed: {:?}", e);
                stats.underruns_recovered = stats.underruns_recovered.saturating_add(1);
                if let Err(e) = sink.recover() {
                    warn!("[STREAM] Sink recovery failed: {:?}", e);
                }
            }
        }
    };

    stats.exit = Some(exit);
    debug!(
        "[STREAM] Worker exit {:?} after {} frames",
        exit, stats.frames_decoded
    );
    stats
}

/// A running stream: stop flag and worker thread
///
/// Dropping a session stops and joins its worker, so the channel and sink
/// are never released while the worker may still touch them.
#[derive(Debug)]
pub(crate) struct StreamSession<S> {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<(S, StreamStats)>>,
}

impl<S: PcmSink> StreamSession<S> {
    /// Spawn the worker thread for a session
    ///
    /// If the thread cannot be spawned the decoder, sink and channel handle are
    /// dropped before this returns.
    pub(crate) fn spawn<C, D>(
        channel: Arc<C>,
        mut decoder: D,
        mut sink: S,
        config: CodecConfiguration,
    ) -> Result<Self, EndpointError>
    where
        C: IsoChannel,
        D: FrameDecoder,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let worker = thread::Builder::new()
            .name(STREAM_THREAD_NAME.into())
            .spawn(move || {
                let stats = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_stream(&*channel, &mut decoder, &mut sink, &config, &worker_stop)
                }))
                .unwrap_or_else(|_| {
                    error!("[STREAM] Worker loop panicked");
                    StreamStats {
                        exit: Some(StreamExit::Panicked),
                        ..StreamStats::default()
                    }
                });
                drop(channel);
                drop(decoder);
                (sink, stats)
            })
            .map_err(|_| EndpointError::Failed)?;

        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    /// Whether the worker has returned on its own
    pub(crate) fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Raise the stop flag and join the worker
    ///
    /// Returns the sink and the worker's counters, or `None` if the worker
    /// thread died outside the loop and its sink was dropped while unwinding.
    pub(crate) fn stop(mut self) -> Option<(S, StreamStats)> {
        self.join()
    }

    fn join(&mut self) -> Option<(S, StreamStats)> {
        self.stop.store(true, Ordering::Release);
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                error!("[STREAM] Worker panicked");
                None
            }
        }
    }
}

impl<S> Drop for StreamSession<S> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("[STREAM] Worker panicked");
            }
        }
    }
}
