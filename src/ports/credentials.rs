use crate::domain::AppError;

/// One layered source of credential values. The resolver composes
/// sources in platform-specific order and takes the first hit.
pub trait CredentialSource: Send + Sync {
    /// Short source label used in diagnostic logging.
    fn name(&self) -> &'static str;

    /// Look up a credential value. `Ok(None)` means this source has no
    /// value for the key; the resolver falls through to the next one.
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
}
