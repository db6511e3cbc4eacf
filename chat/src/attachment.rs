use std::fs;
use std::path::Path;

use gemini_core::Attachment;
use tracing::{debug, warn};

use crate::capability::{CaptureStream, FrameSource};
use crate::errors::{ChatError, ChatResult};

/// MIME type of captured camera frames
pub const FRAME_MIME_TYPE: &str = "image/png";

/// Where an attachment comes from
pub enum AttachmentSource<'a> {
    /// A file on disk; the MIME type is inferred from its extension
    File(&'a Path),
    /// Bytes with a caller-supplied MIME type (e.g. a picker that knows it)
    Bytes { bytes: &'a [u8], mime_type: &'a str },
    /// One still frame from a capture device
    Frame(&'a dyn FrameSource),
}

/// Turns a raw source into an attachment record.
///
/// The pending turn is not touched; the caller appends the result.
pub fn collect(source: AttachmentSource<'_>) -> ChatResult<Attachment> {
    match source {
        AttachmentSource::File(path) => {
            let bytes = fs::read(path).map_err(|e| {
                ChatError::InvalidAttachment(format!("cannot read {}: {}", path.display(), e))
            })?;
            let mime_type = infer_mime_type(path);
            debug!(path = %path.display(), mime_type = %mime_type, size = bytes.len(), "Collected file attachment");
            encode(&bytes, &mime_type)
        }
        AttachmentSource::Bytes { bytes, mime_type } => encode(bytes, mime_type),
        AttachmentSource::Frame(source) => {
            let stream = source.acquire()?;
            let mut guard = ReleaseOnDrop(stream);
            let frame = guard.0.grab_png()?;
            debug!(size = frame.len(), "Captured camera frame");
            encode(&frame, FRAME_MIME_TYPE)
        }
    }
}

fn encode(bytes: &[u8], mime_type: &str) -> ChatResult<Attachment> {
    if bytes.is_empty() {
        return Err(ChatError::InvalidAttachment("source is empty".to_string()));
    }
    if mime_type.trim().is_empty() {
        return Err(ChatError::InvalidAttachment("missing MIME type".to_string()));
    }
    Ok(Attachment::from_bytes(bytes, mime_type.trim()))
}

fn infer_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

/// Releases the capture stream whichever way collection ends
struct ReleaseOnDrop<'a>(Box<dyn CaptureStream + 'a>);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.release();
        debug!("Released capture stream");
    }
}

/// Best-effort display name for the "Attached: <name>" notice
pub fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => {
            warn!(path = %path.display(), "Attachment path has no file name");
            path.display().to_string()
        }
    }
}
