//! Output capture buffer.
//!
//! The original pattern this library supports is fragment caching: wrap an
//! expensive render in `start(key)` / `save()`, and on the second request
//! serve the stored bytes instead of re-rendering. [`CaptureBuffer`] is the
//! output sink for that pattern. It collects everything written between
//! `begin()` and `stop()` and hands the accumulated content to `save`.
//! No process-global buffering state is involved; each façade owns its own
//! buffer.

/// Accumulates output written between `begin()` and `stop()`.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    content: String,
    capturing: bool,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        CaptureBuffer::default()
    }

    /// Begin a capture window. Clears anything left from a previous window.
    pub fn begin(&mut self) {
        self.content.clear();
        self.capturing = true;
    }

    /// True while a capture window is open.
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Append a chunk to the current window.
    pub fn write(&mut self, chunk: &str) {
        self.content.push_str(chunk);
    }

    /// Everything written since `begin()`.
    pub fn contents(&self) -> &str {
        &self.content
    }

    /// Take the captured content, leaving the window open and empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.content)
    }

    /// Close the window and discard its content.
    pub fn stop(&mut self) {
        self.content.clear();
        self.capturing = false;
    }
}
