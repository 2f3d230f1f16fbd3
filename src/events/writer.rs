//! Buffered Event Writer
//!
//! Batches cache events as JSON lines and writes them out once a threshold
//! of buffered events is reached.

use std::io::{self, Write};

use parking_lot::Mutex;
use tracing::warn;

use crate::config::{CacheConfig, DEFAULT_EVENT_FLUSH_THRESHOLD};
use crate::events::{CacheEvent, EventSink};

struct WriterState<W> {
    buffer: Vec<String>,
    writer: W,
}

// == Buffered Event Writer ==
/// Event sink that buffers serialized events and flushes them in batches.
///
/// Events are written on reaching the flush threshold, on [`flush`], and when
/// the writer is dropped. I/O failures are logged and the batch is dropped;
/// they never reach the cache that produced the events.
///
/// [`flush`]: BufferedEventWriter::flush
pub struct BufferedEventWriter<W: Write + Send> {
    state: Mutex<WriterState<W>>,
    flush_threshold: usize,
}

impl<W: Write + Send> BufferedEventWriter<W> {
    /// Creates a writer flushing every [`DEFAULT_EVENT_FLUSH_THRESHOLD`] events.
    pub fn new(writer: W) -> Self {
        Self::with_threshold(writer, DEFAULT_EVENT_FLUSH_THRESHOLD)
    }

    /// Creates a writer flushing every `event_flush_threshold` events.
    pub fn from_config(writer: W, config: &CacheConfig) -> Self {
        Self::with_threshold(writer, config.event_flush_threshold)
    }

    /// Creates a writer flushing every `flush_threshold` events (at least 1).
    pub fn with_threshold(writer: W, flush_threshold: usize) -> Self {
        let flush_threshold = flush_threshold.max(1);
        Self {
            state: Mutex::new(WriterState {
                buffer: Vec::with_capacity(flush_threshold),
                writer,
            }),
            flush_threshold,
        }
    }

    /// Number of events waiting to be written.
    pub fn buffered(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    // == Flush ==
    /// Writes out all buffered events.
    pub fn flush(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        Self::write_batch(&mut state)
    }

    fn write_batch(state: &mut WriterState<W>) -> io::Result<()> {
        if state.buffer.is_empty() {
            return Ok(());
        }

        let WriterState { buffer, writer } = state;
        let result = buffer
            .iter()
            .try_for_each(|line| writeln!(writer, "{line}"))
            .and_then(|()| writer.flush());
        buffer.clear();
        result
    }
}

impl<W: Write + Send> EventSink for BufferedEventWriter<W> {
    fn record(&self, event: CacheEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                warn!("Failed to serialize cache event: {}", err);
                return;
            }
        };

        let mut state = self.state.lock();
        state.buffer.push(line);
        if state.buffer.len() >= self.flush_threshold {
            if let Err(err) = Self::write_batch(&mut state) {
                warn!("Failed to write cache events: {}", err);
            }
        }
    }
}

impl<W: Write + Send> Drop for BufferedEventWriter<W> {
    fn drop(&mut self) {
        if let Err(err) = Self::write_batch(self.state.get_mut()) {
            warn!("Failed to write cache events on drop: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CacheId;
    use crate::events::CacheEventKind;
    use std::sync::Arc;

    /// Writer whose output stays readable after the event writer is dropped.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn disposed_event(released: usize) -> CacheEvent {
        CacheEvent::new(CacheId::next(), CacheEventKind::Disposed { released })
    }

    #[test]
    fn test_default_threshold() {
        let writer = BufferedEventWriter::new(SharedBuf::default());
        assert_eq!(writer.flush_threshold(), 1000);
    }

    #[test]
    fn test_from_config_threshold() {
        let config = CacheConfig {
            event_flush_threshold: 2,
            ..CacheConfig::default()
        };
        let out = SharedBuf::default();
        let writer = BufferedEventWriter::from_config(out.clone(), &config);
        assert_eq!(writer.flush_threshold(), 2);

        writer.record(disposed_event(1));
        assert!(out.lines().is_empty());
        writer.record(disposed_event(2));
        assert_eq!(out.lines().len(), 2);
    }

    #[test]
    fn test_buffers_until_threshold() {
        let out = SharedBuf::default();
        let writer = BufferedEventWriter::with_threshold(out.clone(), 3);

        writer.record(disposed_event(1));
        writer.record(disposed_event(2));
        assert_eq!(writer.buffered(), 2);
        assert!(out.lines().is_empty());

        writer.record(disposed_event(3));
        assert_eq!(writer.buffered(), 0);

        let lines = out.lines();
        assert_eq!(lines.len(), 3);
        let last: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(last["event"], "disposed");
        assert_eq!(last["released"], 3);
    }

    #[test]
    fn test_explicit_flush() {
        let out = SharedBuf::default();
        let writer = BufferedEventWriter::with_threshold(out.clone(), 100);

        writer.record(disposed_event(0));
        writer.flush().unwrap();

        assert_eq!(out.lines().len(), 1);
        assert_eq!(writer.buffered(), 0);
    }

    #[test]
    fn test_drop_flushes_remaining() {
        let out = SharedBuf::default();
        {
            let writer = BufferedEventWriter::with_threshold(out.clone(), 100);
            writer.record(disposed_event(0));
            writer.record(disposed_event(0));
        }
        assert_eq!(out.lines().len(), 2);
    }

    #[test]
    fn test_write_failure_is_contained() {
        let writer = BufferedEventWriter::with_threshold(FailingWriter, 2);

        writer.record(disposed_event(0));
        assert_eq!(writer.buffered(), 1);
        assert!(writer.flush().is_err());
        assert_eq!(writer.buffered(), 0);

        // Threshold flush fails silently and drops the batch
        writer.record(disposed_event(0));
        writer.record(disposed_event(0));
        assert_eq!(writer.buffered(), 0);
    }
}
