use async_trait::async_trait;

use crate::domain::{AppError, ClinicalNote, NoteDraft};

/// A page request for note listings.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// Zero-based page index.
    pub index: usize,
    /// Page size.
    pub size: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { index: 0, size: 20 }
    }
}

/// One page of notes.
#[derive(Debug, Clone)]
pub struct NotePage {
    pub items: Vec<ClinicalNote>,
    pub has_more: bool,
}

/// Persistence gateway boundary. Every operation is scoped to the
/// authenticated user's identifier; cross-user access is rejected.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Persist a draft, returning the stored note with its identity.
    async fn save(&self, user_id: &str, draft: NoteDraft) -> Result<ClinicalNote, AppError>;

    /// Fetch one note by id.
    async fn get(&self, user_id: &str, id: &str) -> Result<ClinicalNote, AppError>;

    /// List notes, newest first.
    async fn list(&self, user_id: &str, page: Page) -> Result<NotePage, AppError>;

    /// Search note content and transcript for a keyword.
    async fn search(&self, user_id: &str, keyword: &str) -> Result<Vec<ClinicalNote>, AppError>;

    /// Delete one note by id.
    async fn delete(&self, user_id: &str, id: &str) -> Result<(), AppError>;
}
