//! Shared helpers for unit tests.

use crate::solve::{sink_from, OutputSink};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// A writer that appends to a shared buffer, so tests can inspect what
/// the engine printed after handing the sink away.
#[derive(Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

impl CaptureBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).expect("captured output should be UTF-8")
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// An output sink plus a handle to read back everything written to it.
pub fn capture() -> (OutputSink<'static>, CaptureBuffer) {
    let buffer = CaptureBuffer::default();
    (sink_from(buffer.clone()), buffer)
}
