use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::error::AppError;

/// MIME type assumed when the file extension is unrecognized.
pub const DEFAULT_MIME_TYPE: &str = "audio/wav";

/// Capture session state machine: Stopped -> Recording -> Stopped.
///
/// Starting while already Recording terminates the existing session
/// first rather than rejecting, to tolerate UI double-taps. Stopping
/// while Stopped is an idempotent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CaptureState {
    /// No active capture.
    Stopped = 0,
    /// Actively capturing audio.
    Recording = 1,
}

impl CaptureState {
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self, CaptureState::Recording)
    }
}

impl From<u8> for CaptureState {
    fn from(value: u8) -> Self {
        match value {
            1 => CaptureState::Recording,
            _ => CaptureState::Stopped,
        }
    }
}

impl From<CaptureState> for u8 {
    fn from(state: CaptureState) -> Self {
        state as u8
    }
}

/// Atomic wrapper for CaptureState for lock-free reads.
#[derive(Debug)]
pub struct AtomicCaptureState(AtomicU8);

impl AtomicCaptureState {
    pub fn new(state: CaptureState) -> Self {
        Self(AtomicU8::new(state.into()))
    }

    pub fn load(&self) -> CaptureState {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn store(&self, state: CaptureState) {
        self.0.store(state.into(), Ordering::Release);
    }
}

impl Default for AtomicCaptureState {
    fn default() -> Self {
        Self::new(CaptureState::Stopped)
    }
}

enum AudioData {
    /// Device-local file written by the native capture sink.
    File { path: PathBuf },
    /// In-memory blob accumulated by the web capture sink. The bytes
    /// are dropped on release, revoking the reference.
    Blob { bytes: Mutex<Option<Vec<u8>>> },
}

struct HandleInner {
    data: AudioData,
    mime_type: String,
    byte_len: u64,
    released: AtomicBool,
}

/// Opaque reference to recorded audio pending transcription.
///
/// Created by the recorder on stop, consumed at most once by the
/// orchestrator, and released on every exit path of transcription.
/// Clones share the underlying resource; releasing any clone releases
/// all of them.
#[derive(Clone)]
pub struct AudioHandle {
    inner: Arc<HandleInner>,
}

impl AudioHandle {
    /// Wrap an audio file on disk. Fails if the file is not accessible.
    pub fn from_file(path: PathBuf) -> Result<Self, AppError> {
        let metadata = fs::metadata(&path).map_err(|e| {
            AppError::InvalidInput(format!("audio file {} not accessible: {}", path.display(), e))
        })?;
        let mime_type = mime_from_path(&path);
        Ok(Self {
            inner: Arc::new(HandleInner {
                byte_len: metadata.len(),
                mime_type,
                data: AudioData::File { path },
                released: AtomicBool::new(false),
            }),
        })
    }

    /// Wrap an in-memory audio blob.
    pub fn from_blob(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                byte_len: bytes.len() as u64,
                mime_type: mime_type.into(),
                data: AudioData::Blob {
                    bytes: Mutex::new(Some(bytes)),
                },
                released: AtomicBool::new(false),
            }),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    pub fn byte_len(&self) -> u64 {
        self.inner.byte_len
    }

    /// File name to attach to multipart uploads.
    pub fn file_name(&self) -> String {
        match &self.inner.data {
            AudioData::File { path } => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("recording.wav")
                .to_string(),
            AudioData::Blob { .. } => "recording.wav".to_string(),
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Whether the underlying resource still exists.
    pub fn exists(&self) -> bool {
        if self.is_released() {
            return false;
        }
        match &self.inner.data {
            AudioData::File { path } => path.exists(),
            AudioData::Blob { bytes } => bytes.lock().is_some(),
        }
    }

    /// Read the full audio payload. Zero-length audio is valid.
    pub fn read_bytes(&self) -> Result<Vec<u8>, AppError> {
        if self.is_released() {
            return Err(AppError::InvalidInput(
                "audio handle has already been released".to_string(),
            ));
        }
        match &self.inner.data {
            AudioData::File { path } => fs::read(path).map_err(|e| {
                AppError::InvalidInput(format!(
                    "audio file {} not readable: {}",
                    path.display(),
                    e
                ))
            }),
            AudioData::Blob { bytes } => bytes.lock().clone().ok_or_else(|| {
                AppError::InvalidInput("audio blob reference has been revoked".to_string())
            }),
        }
    }

    /// Release the underlying resource: delete the file or revoke the
    /// blob reference. Idempotent; failures are logged, never escalated.
    pub fn release(&self) {
        if self
            .inner
            .released
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        match &self.inner.data {
            AudioData::File { path } => {
                if let Err(e) = fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to delete recording file");
                } else {
                    debug!(path = %path.display(), "recording file deleted");
                }
            }
            AudioData::Blob { bytes } => {
                bytes.lock().take();
                debug!("audio blob reference revoked");
            }
        }
    }
}

impl std::fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner.data {
            AudioData::File { path } => format!("file:{}", path.display()),
            AudioData::Blob { .. } => "blob".to_string(),
        };
        f.debug_struct("AudioHandle")
            .field("source", &kind)
            .field("mime_type", &self.inner.mime_type)
            .field("byte_len", &self.inner.byte_len)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Derive the MIME type from the file extension.
fn mime_from_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => DEFAULT_MIME_TYPE,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_path(Path::new("a.wav")), "audio/wav");
        assert_eq!(mime_from_path(Path::new("a.MP3")), "audio/mpeg");
        assert_eq!(mime_from_path(Path::new("a.m4a")), "audio/mp4");
        assert_eq!(mime_from_path(Path::new("a.webm")), "audio/webm");
        assert_eq!(mime_from_path(Path::new("a.xyz")), DEFAULT_MIME_TYPE);
        assert_eq!(mime_from_path(Path::new("noext")), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn test_blob_handle_roundtrip() {
        let handle = AudioHandle::from_blob(vec![1, 2, 3], "audio/wav");
        assert!(handle.exists());
        assert_eq!(handle.byte_len(), 3);
        assert_eq!(handle.read_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_zero_length_blob_is_valid() {
        let handle = AudioHandle::from_blob(Vec::new(), "audio/wav");
        assert!(handle.exists());
        assert_eq!(handle.byte_len(), 0);
        assert!(handle.read_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_release_is_idempotent() {
        let handle = AudioHandle::from_blob(vec![0u8; 8], "audio/wav");
        handle.release();
        handle.release();
        assert!(handle.is_released());
        assert!(!handle.exists());
        assert!(handle.read_bytes().is_err());
    }

    #[test]
    fn test_release_through_clone() {
        let handle = AudioHandle::from_blob(vec![0u8; 8], "audio/wav");
        let clone = handle.clone();
        clone.release();
        assert!(handle.is_released());
    }

    #[test]
    fn test_file_handle_release_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        std::fs::write(&path, b"RIFFdata").unwrap();

        let handle = AudioHandle::from_file(path.clone()).unwrap();
        assert_eq!(handle.mime_type(), "audio/wav");
        assert_eq!(handle.byte_len(), 8);

        handle.release();
        assert!(!path.exists());
        assert!(!handle.exists());
    }

    #[test]
    fn test_missing_file_rejected() {
        let result = AudioHandle::from_file(PathBuf::from("/nonexistent/take.wav"));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_capture_state_roundtrip() {
        let atomic = AtomicCaptureState::default();
        assert_eq!(atomic.load(), CaptureState::Stopped);
        atomic.store(CaptureState::Recording);
        assert!(atomic.load().is_recording());
    }
}
