use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use tracing::debug;
use uuid::Uuid;

use crate::domain::{AppError, AudioHandle};

/// Materializes captured PCM samples into a platform-appropriate
/// [`AudioHandle`]. This is the only place the native/web capture
/// paths diverge.
pub trait AudioSink: Send + Sync {
    fn materialize(&self, samples: &[i16], sample_rate: u32) -> Result<AudioHandle, AppError>;
}

/// Encode mono 16-bit PCM samples as a WAV byte stream.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, AppError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| AppError::Audio(format!("failed to start WAV encode: {}", e)))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| AppError::Audio(format!("failed to encode sample: {}", e)))?;
    }
    writer
        .finalize()
        .map_err(|e| AppError::Audio(format!("failed to finalize WAV: {}", e)))?;

    Ok(cursor.into_inner())
}

/// Native sink: writes the recording as a WAV file in the recordings
/// directory and hands back a file-backed handle.
pub struct WavFileSink {
    dir: PathBuf,
}

impl WavFileSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl AudioSink for WavFileSink {
    fn materialize(&self, samples: &[i16], sample_rate: u32) -> Result<AudioHandle, AppError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("recording-{}.wav", Uuid::new_v4()));

        let bytes = encode_wav(samples, sample_rate)?;
        fs::write(&path, &bytes)?;

        debug!(path = %path.display(), bytes = bytes.len(), "recording materialized to file");
        AudioHandle::from_file(path)
    }
}

/// Web sink: the recording stays in memory as a revocable blob.
pub struct MemoryBlobSink;

impl AudioSink for MemoryBlobSink {
    fn materialize(&self, samples: &[i16], sample_rate: u32) -> Result<AudioHandle, AppError> {
        let bytes = encode_wav(samples, sample_rate)?;
        debug!(bytes = bytes.len(), "recording materialized to memory blob");
        Ok(AudioHandle::from_blob(bytes, "audio/wav"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wav_header() {
        let bytes = encode_wav(&[0, 1000, -1000, 0], 16_000).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 44-byte header + 4 samples * 2 bytes
        assert_eq!(bytes.len(), 44 + 8);
    }

    #[test]
    fn test_encode_wav_empty_samples() {
        let bytes = encode_wav(&[], 16_000).unwrap();
        assert_eq!(bytes.len(), 44);
    }

    #[test]
    fn test_file_sink_materializes_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let sink = WavFileSink::new(dir.path().join("recordings"));

        let handle = sink.materialize(&[0i16; 1600], 16_000).unwrap();
        assert_eq!(handle.mime_type(), "audio/wav");
        assert_eq!(handle.byte_len(), 44 + 3200);
        assert!(handle.exists());

        handle.release();
        assert!(!handle.exists());
    }

    #[test]
    fn test_memory_sink_materializes_blob() {
        let handle = MemoryBlobSink.materialize(&[100i16; 16], 16_000).unwrap();
        assert_eq!(handle.mime_type(), "audio/wav");
        assert_eq!(handle.byte_len(), 44 + 32);

        let bytes = handle.read_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
    }
}
