//! Host capabilities the session talks to without owning them

use crate::errors::{ChatError, ChatResult};

/// An acquired capture device (e.g. an open camera stream)
pub trait CaptureStream {
    /// Grab one still frame, PNG-encoded
    fn grab_png(&mut self) -> ChatResult<Vec<u8>>;

    /// Stop the stream and give the hardware back
    fn release(&mut self);
}

/// A device that can be opened for a single still frame
pub trait FrameSource {
    fn acquire(&self) -> ChatResult<Box<dyn CaptureStream + '_>>;
}

/// Single-shot speech-to-text; each call is one activation
pub trait Transcriber {
    fn listen_once(&self) -> ChatResult<String>;
}

/// Fire-and-forget text-to-speech for finalized replies
pub trait SpeechSink {
    fn speak(&self, text: &str);
}

/// Stand-in for a capability the host does not have
#[derive(Debug, Clone, Copy)]
pub struct Unavailable(pub &'static str);

impl FrameSource for Unavailable {
    fn acquire(&self) -> ChatResult<Box<dyn CaptureStream + '_>> {
        Err(ChatError::UnsupportedCapability(self.0.to_string()))
    }
}

impl Transcriber for Unavailable {
    fn listen_once(&self) -> ChatResult<String> {
        Err(ChatError::UnsupportedCapability(self.0.to_string()))
    }
}
