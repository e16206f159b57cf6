//! In-memory thread and message persistence

use async_trait::async_trait;
use roundtable_application::ports::thread_repository::{RepositoryError, ThreadRepository};
use roundtable_domain::message::identity::user_message_id;
use roundtable_domain::{ChatMode, Message, Participant, Thread};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const TITLE_MAX_CHARS: usize = 48;

#[derive(Default)]
struct Tables {
    threads: HashMap<String, (Thread, Vec<Participant>)>,
    messages: HashMap<String, Message>,
}

/// Authoritative store for threads and finished messages.
#[derive(Default)]
pub struct InMemoryThreadRepository {
    tables: Mutex<Tables>,
    next_id: AtomicU64,
}

impl InMemoryThreadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous write used by the stream registry when a buffered stream
    /// finishes server-side.
    pub fn store_message(&self, message: Message) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.messages.insert(message.id.clone(), message);
        }
    }

    pub fn thread(&self, thread_id: &str) -> Option<(Thread, Vec<Participant>)> {
        self.tables.lock().ok()?.threads.get(thread_id).cloned()
    }

    /// Every persisted message of a thread, ordered by round and slot.
    pub fn messages_for_thread(&self, thread_id: &str) -> Vec<Message> {
        let Ok(tables) = self.tables.lock() else {
            return Vec::new();
        };
        let prefix = format!("{}_r", thread_id);
        let mut messages: Vec<Message> = tables
            .messages
            .values()
            .filter(|m| m.id.starts_with(&prefix))
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.round_number, m.slot()));
        messages
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Storage("repository lock poisoned".to_string()))
    }
}

#[async_trait]
impl ThreadRepository for InMemoryThreadRepository {
    async fn create_thread(
        &self,
        mode: ChatMode,
        enable_web_search: bool,
        participants: &[Participant],
    ) -> Result<Thread, RepositoryError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let thread = Thread::new(format!("thread-{}", n), mode).with_web_search(enable_web_search);
        self.lock()?
            .threads
            .insert(thread.id.clone(), (thread.clone(), participants.to_vec()));
        debug!(thread_id = %thread.id, "Thread persisted");
        Ok(thread)
    }

    async fn save_user_message(
        &self,
        thread_id: &str,
        round_number: u32,
        text: &str,
    ) -> Result<Message, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.threads.contains_key(thread_id) {
            return Err(RepositoryError::ThreadNotFound(thread_id.to_string()));
        }
        let message = Message::user(user_message_id(thread_id, round_number), round_number, text);
        tables.messages.insert(message.id.clone(), message.clone());
        Ok(message)
    }

    async fn save_message(&self, message: &Message) -> Result<(), RepositoryError> {
        self.lock()?
            .messages
            .insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn load_message(&self, id: &str) -> Result<Option<Message>, RepositoryError> {
        Ok(self.lock()?.messages.get(id).cloned())
    }

    async fn generate_title(
        &self,
        thread_id: &str,
        first_message: &str,
    ) -> Result<(String, String), RepositoryError> {
        let title = title_from(first_message);
        let slug = format!("{}-{}", slugify(&title), thread_id.trim_start_matches("thread-"));

        let mut tables = self.lock()?;
        let (thread, _) = tables
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| RepositoryError::ThreadNotFound(thread_id.to_string()))?;
        thread.title = title.clone();
        thread.slug = slug.clone();
        thread.is_ai_generated_title = true;
        Ok((title, slug))
    }
}

fn title_from(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= TITLE_MAX_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(TITLE_MAX_CHARS).collect();
    match cut.rfind(' ') {
        Some(space) if space > 0 => cut[..space].to_string(),
        _ => cut,
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "thread".to_string()
    } else {
        slug.to_string()
    }
}
