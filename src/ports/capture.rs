use async_trait::async_trait;

use crate::domain::{AppError, AudioHandle, CaptureState};

/// Port for audio capture.
///
/// Implementations hold at most one active recording session. The
/// platform divergence (file-backed vs. in-memory audio) lives behind
/// the returned [`AudioHandle`], not in this contract.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Start a recording session.
    ///
    /// Fails with a permission error when no input device is
    /// available or authorized. Called while already recording, any
    /// existing session is terminated first rather than rejected.
    async fn start(&self) -> Result<(), AppError>;

    /// Stop recording and materialize the captured audio.
    ///
    /// Returns `None` without error when no session is active.
    async fn stop(&self) -> Result<Option<AudioHandle>, AppError>;

    /// Release the most recent handle's underlying resource. Safe to
    /// call multiple times; failures are logged, never escalated.
    async fn cleanup(&self);

    /// Current capture state.
    fn state(&self) -> CaptureState;

    /// Elapsed seconds of the active recording, 0.0 when stopped.
    fn current_duration(&self) -> f32;
}
