//! Counting test doubles for the bus, channel, decoder and sink

use crate::audio::{AudioBackend, DecodeError, FrameDecoder, PcmSink, SinkError};
use crate::lc3::CodecConfiguration;
use crate::transport::{AcquireError, AcquiredTransport, IsoChannel, MediaTransportBus, ObjectPath};
use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
struct RecorderState {
    acquired: AtomicUsize,
    channels_closed: AtomicUsize,
    sinks_opened: AtomicUsize,
    sinks_closed: AtomicUsize,
    recovers: AtomicUsize,
    reads: AtomicUsize,
    max_read_len: AtomicUsize,
    writes: Mutex<Vec<usize>>,
    events: Mutex<Vec<&'static str>>,
}

/// Shared counters observed by every double
#[derive(Debug, Clone, Default)]
pub(crate) struct Recorder(Arc<RecorderState>);

impl Recorder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquired(&self) -> usize {
        self.0.acquired.load(Ordering::SeqCst)
    }

    pub(crate) fn channels_closed(&self) -> usize {
        self.0.channels_closed.load(Ordering::SeqCst)
    }

    pub(crate) fn sinks_opened(&self) -> usize {
        self.0.sinks_opened.load(Ordering::SeqCst)
    }

    pub(crate) fn sinks_closed(&self) -> usize {
        self.0.sinks_closed.load(Ordering::SeqCst)
    }

    pub(crate) fn recovers(&self) -> usize {
        self.0.recovers.load(Ordering::SeqCst)
    }

    pub(crate) fn reads(&self) -> usize {
        self.0.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn max_read_len(&self) -> usize {
        self.0.max_read_len.load(Ordering::SeqCst)
    }

    pub(crate) fn writes(&self) -> Vec<usize> {
        self.0.writes.lock().unwrap().clone()
    }

    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.0.events.lock().unwrap().clone()
    }

    fn event(&self, event: &'static str) {
        self.0.events.lock().unwrap().push(event);
    }
}

/// One scripted channel read
#[derive(Debug, Clone)]
pub(crate) enum Read {
    Frame(Vec<u8>),
    Eof,
    Error(ErrorKind),
}

/// Channel that replays a script, then either ends or produces frames forever
#[derive(Debug)]
pub(crate) struct MockChannel {
    recorder: Recorder,
    script: Mutex<VecDeque<Read>>,
    endless: Option<(usize, Duration)>,
}

impl MockChannel {
    pub(crate) fn new(recorder: &Recorder, script: impl IntoIterator<Item = Read>) -> Self {
        Self {
            recorder: recorder.clone(),
            script: Mutex::new(script.into_iter().collect()),
            endless: None,
        }
    }

    /// Produces a `len` byte frame every `period`
    pub(crate) fn endless(recorder: &Recorder, len: usize, period: Duration) -> Self {
        Self {
            recorder: recorder.clone(),
            script: Mutex::new(VecDeque::new()),
            endless: Some((len, period)),
        }
    }
}

impl IsoChannel for MockChannel {
    fn read_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.recorder.0.reads.fetch_add(1, Ordering::SeqCst);
        self.recorder.0.max_read_len.fetch_max(buf.len(), Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Read::Frame(data)) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            Some(Read::Eof) => Ok(0),
            Some(Read::Error(kind)) => Err(io::Error::from(kind)),
            None => match self.endless {
                Some((len, period)) => {
                    thread::sleep(period);
                    let len = len.min(buf.len());
                    buf[..len].fill(0x01);
                    Ok(len)
                }
                None => Ok(0),
            },
        }
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        self.recorder.0.channels_closed.fetch_add(1, Ordering::SeqCst);
        self.recorder.event("channel-closed");
    }
}

/// Bus handing out mock channels
#[derive(Debug)]
pub(crate) struct MockBus {
    recorder: Recorder,
    failure: Option<AcquireError>,
    read_mtu: u16,
    script: Option<Vec<Read>>,
}

impl MockBus {
    /// Endless 10 ms channels with a 120 byte read MTU
    pub(crate) fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            failure: None,
            read_mtu: 120,
            script: None,
        }
    }

    pub(crate) fn failing(mut self, error: AcquireError) -> Self {
        self.failure = Some(error);
        self
    }

    pub(crate) fn with_read_mtu(mut self, read_mtu: u16) -> Self {
        self.read_mtu = read_mtu;
        self
    }

    /// Every acquired channel replays `script` and then ends
    pub(crate) fn with_script(mut self, script: Vec<Read>) -> Self {
        self.script = Some(script);
        self
    }

    pub(crate) fn set_failure(&mut self, failure: Option<AcquireError>) {
        self.failure = failure;
    }
}

impl MediaTransportBus for MockBus {
    type Channel = MockChannel;

    fn acquire(
        &mut self,
        _path: &ObjectPath,
    ) -> Result<AcquiredTransport<Self::Channel>, AcquireError> {
        if let Some(error) = self.failure {
            return Err(error);
        }
        self.recorder.0.acquired.fetch_add(1, Ordering::SeqCst);

        let channel = match &self.script {
            Some(script) => MockChannel::new(&self.recorder, script.clone()),
            None => MockChannel::endless(&self.recorder, 120, Duration::from_millis(10)),
        };
        Ok(AcquiredTransport {
            channel,
            read_mtu: self.read_mtu,
            write_mtu: 0,
        })
    }
}

/// Decoder that fills the PCM buffer with the first frame byte
#[derive(Debug, Default)]
pub(crate) struct MockDecoder {
    pub(crate) frame_lengths: Vec<usize>,
}

impl MockDecoder {
    /// Frames starting with this byte fail to decode
    pub(crate) const CORRUPT: u8 = 0xEE;
    /// Frames starting with this byte make the decoder panic
    pub(crate) const PANIC: u8 = 0xDD;
}

impl FrameDecoder for MockDecoder {
    fn decode(&mut self, frame: &[u8], pcm: &mut [i16]) -> Result<(), DecodeError> {
        let first = *frame.first().ok_or(DecodeError::InvalidFrame)?;
        if first == Self::CORRUPT {
            return Err(DecodeError::InvalidFrame);
        }
        assert_ne!(first, Self::PANIC, "decoder blew up");
        self.frame_lengths.push(frame.len());
        pcm.fill(i16::from(first));
        Ok(())
    }
}

/// Sink recording write sizes, failing the scripted write indexes
#[derive(Debug)]
pub(crate) struct MockSink {
    recorder: Recorder,
    failing_writes: Vec<usize>,
    write_index: usize,
}

impl MockSink {
    pub(crate) fn new(recorder: &Recorder) -> Self {
        recorder.0.sinks_opened.fetch_add(1, Ordering::SeqCst);
        Self {
            recorder: recorder.clone(),
            failing_writes: Vec::new(),
            write_index: 0,
        }
    }

    pub(crate) fn failing_writes(mut self, indexes: &[usize]) -> Self {
        self.failing_writes = indexes.to_vec();
        self
    }
}

impl PcmSink for MockSink {
    fn write(&mut self, pcm: &[i16]) -> Result<usize, SinkError> {
        let index = self.write_index;
        self.write_index += 1;
        if self.failing_writes.contains(&index) {
            return Err(SinkError::Underrun);
        }
        self.recorder.0.writes.lock().unwrap().push(pcm.len());
        Ok(pcm.len())
    }

    fn recover(&mut self) -> Result<(), SinkError> {
        self.recorder.0.recovers.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockSink {
    fn drop(&mut self) {
        self.recorder.0.sinks_closed.fetch_add(1, Ordering::SeqCst);
        self.recorder.event("sink-closed");
    }
}

/// Backend producing mock decoders and sinks
#[derive(Debug)]
pub(crate) struct MockAudio {
    recorder: Recorder,
    sink_failure: Option<SinkError>,
    decoder_failure: Option<DecodeError>,
    failing_writes: Vec<usize>,
}

impl MockAudio {
    pub(crate) fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            sink_failure: None,
            decoder_failure: None,
            failing_writes: Vec::new(),
        }
    }

    pub(crate) fn failing_sink(mut self, error: SinkError) -> Self {
        self.sink_failure = Some(error);
        self
    }

    pub(crate) fn failing_decoder(mut self, error: DecodeError) -> Self {
        self.decoder_failure = Some(error);
        self
    }

    pub(crate) fn failing_writes(mut self, indexes: &[usize]) -> Self {
        self.failing_writes = indexes.to_vec();
        self
    }
}

impl AudioBackend for MockAudio {
    type Decoder = MockDecoder;
    type Sink = MockSink;

    fn open_decoder(&mut self, _config: &CodecConfiguration) -> Result<MockDecoder, DecodeError> {
        match self.decoder_failure {
            Some(error) => Err(error),
            None => Ok(MockDecoder::default()),
        }
    }

    fn open_sink(&mut self, _config: &CodecConfiguration) -> Result<MockSink, SinkError> {
        match self.sink_failure {
            Some(error) => Err(error),
            None => Ok(MockSink::new(&self.recorder).failing_writes(&self.failing_writes)),
        }
    }
}
