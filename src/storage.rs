use anyhow::Result;
use async_trait::async_trait;

use crate::types::{NotesMap, ProgressMap};

/// TTL key/value cache for remote payloads.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>>;
    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()>;
}

/// Durable home for a learner's completion and notes maps.
///
/// The in-memory maps are the source of truth while a session is open; a store
/// only sees them when the caller explicitly loads or saves.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load_progress(&self, user_id: &str, course_id: &str) -> Result<(ProgressMap, NotesMap)>;
    async fn save_progress(&self, user_id: &str, course_id: &str, progress: &ProgressMap, notes: &NotesMap) -> Result<()>;
}
