use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{AppError, ClinicalNote, NoteDraft};
use crate::ports::{NotePage, NoteStore, Page};

/// In-memory persistence gateway, keyed by user id. Durable backends
/// live behind the same port.
#[derive(Default)]
pub struct InMemoryNoteStore {
    notes: RwLock<HashMap<String, Vec<ClinicalNote>>>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn save(&self, user_id: &str, draft: NoteDraft) -> Result<ClinicalNote, AppError> {
        let note = ClinicalNote {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            content: draft.content,
            procedure_type: draft.procedure_type,
            tags: draft.tags,
            transcript: draft.transcript,
            created_at: Utc::now(),
        };

        self.notes
            .write()
            .entry(user_id.to_string())
            .or_default()
            .push(note.clone());

        debug!(user = user_id, note = %note.id, "note saved");
        Ok(note)
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<ClinicalNote, AppError> {
        self.notes
            .read()
            .get(user_id)
            .and_then(|list| list.iter().find(|n| n.id == id))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("note {}", id)))
    }

    async fn list(&self, user_id: &str, page: Page) -> Result<NotePage, AppError> {
        let notes = self.notes.read();
        let mut items: Vec<ClinicalNote> = notes.get(user_id).cloned().unwrap_or_default();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let start = page.index.saturating_mul(page.size);
        let has_more = items.len() > start.saturating_add(page.size);
        let items = items.into_iter().skip(start).take(page.size).collect();

        Ok(NotePage { items, has_more })
    }

    async fn search(&self, user_id: &str, keyword: &str) -> Result<Vec<ClinicalNote>, AppError> {
        let needle = keyword.to_lowercase();
        Ok(self
            .notes
            .read()
            .get(user_id)
            .map(|list| {
                list.iter()
                    .filter(|n| {
                        n.content.to_lowercase().contains(&needle)
                            || n.transcript.to_lowercase().contains(&needle)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), AppError> {
        let mut notes = self.notes.write();
        let list = notes
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound(format!("note {}", id)))?;

        let before = list.len();
        list.retain(|n| n.id != id);
        if list.len() == before {
            return Err(AppError::NotFound(format!("note {}", id)));
        }

        debug!(user = user_id, note = id, "note deleted");
        Ok(())
    }
}
