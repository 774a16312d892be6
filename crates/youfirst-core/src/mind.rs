//! Mind: books and timed reading sessions.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::storage::{Collection, KeyValueStore, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    WantToRead,
    Reading,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    pub current_page: u32,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Record for Book {
    const KEY: &'static str = "books";
    const ID_PREFIX: &'static str = "book";

    fn id(&self) -> &str {
        &self.id
    }

    fn upgrade(raw: &mut Map<String, Value>) {
        raw.entry("author").or_insert_with(|| Value::String(String::new()));
        raw.entry("currentPage").or_insert(Value::from(0));
        raw.entry("status").or_insert_with(|| Value::String("reading".into()));
        if !raw.contains_key("updatedAt") {
            if let Some(created) = raw.get("createdAt").cloned() {
                raw.insert("updatedAt".into(), created);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSession {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_read: Option<u32>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Record for ReadingSession {
    const KEY: &'static str = "reading_sessions";
    const ID_PREFIX: &'static str = "reading";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub total_pages: Option<u32>,
    pub current_page: Option<u32>,
    pub status: Option<BookStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingStats {
    pub total_seconds: u64,
    pub today_seconds: u64,
    pub session_count: usize,
    pub books_finished: usize,
}

pub struct MindStore<'a> {
    books: Collection<'a, Book>,
    sessions: Collection<'a, ReadingSession>,
}

impl<'a> MindStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore, clock: &'a dyn Clock) -> Self {
        Self {
            books: Collection::new(store, clock),
            sessions: Collection::new(store, clock),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.books.clock().now()
    }

    // ── Books ────────────────────────────────────────────────────────

    pub fn load_books(&self) -> Vec<Book> {
        self.books.load()
    }

    pub fn add_book(&self, title: &str, author: &str, total_pages: Option<u32>) -> Book {
        let now = self.now();
        self.books.insert_with(|id| Book {
            id,
            title: title.trim().to_string(),
            author: author.trim().to_string(),
            total_pages: total_pages.filter(|&p| p > 0),
            current_page: 0,
            status: BookStatus::Reading,
            created_at: now,
            updated_at: now,
            finished_at: None,
        })
    }

    pub fn update_book(&self, id: &str, patch: BookPatch) -> Option<Book> {
        let now = self.now();
        self.books.update(id, |book| {
            if let Some(title) = patch.title {
                book.title = title;
            }
            if let Some(author) = patch.author {
                book.author = author;
            }
            if let Some(total) = patch.total_pages {
                book.total_pages = Some(total).filter(|&p| p > 0);
            }
            if let Some(page) = patch.current_page {
                book.current_page = page;
            }
            if let Some(status) = patch.status {
                book.status = status;
            }
            settle_status(book, now);
            book.updated_at = now;
        })
    }

    pub fn delete_book(&self, id: &str) -> bool {
        self.books.remove(id)
    }

    // ── Sessions ─────────────────────────────────────────────────────

    pub fn load_sessions(&self) -> Vec<ReadingSession> {
        self.sessions.load()
    }

    /// Record a finished reading session. When tied to a book, the book's
    /// page counter advances and the book is marked finished on its last page.
    ///
    /// A session for an unknown book is still recorded, just not linked.
    pub fn record_session(
        &self,
        book_id: Option<&str>,
        duration_seconds: u64,
        pages_read: Option<u32>,
        notes: &str,
    ) -> ReadingSession {
        let now = self.now();
        let book_id = book_id.and_then(|id| {
            let pages = pages_read.unwrap_or(0);
            self.books
                .update(id, |book| {
                    book.current_page = book.current_page.saturating_add(pages);
                    if book.status == BookStatus::WantToRead {
                        book.status = BookStatus::Reading;
                    }
                    settle_status(book, now);
                    book.updated_at = now;
                })
                .map(|book| book.id)
        });
        let started_at = session_start(now, duration_seconds);
        self.sessions.insert_with(|id| ReadingSession {
            id,
            book_id,
            started_at,
            duration_seconds,
            pages_read,
            notes: notes.trim().to_string(),
            created_at: now,
        })
    }

    pub fn delete_session(&self, id: &str) -> bool {
        self.sessions.remove(id)
    }

    pub fn reading_stats(&self, today: NaiveDate) -> ReadingStats {
        let sessions = self.sessions.load();
        ReadingStats {
            total_seconds: sessions.iter().map(|s| s.duration_seconds).sum(),
            today_seconds: sessions
                .iter()
                .filter(|s| s.started_at.date_naive() == today || s.created_at.date_naive() == today)
                .map(|s| s.duration_seconds)
                .sum(),
            session_count: sessions.len(),
            books_finished: self
                .books
                .load()
                .iter()
                .filter(|b| b.status == BookStatus::Finished)
                .count(),
        }
    }
}

/// `now` minus the session length; `now` when that is not representable.
fn session_start(now: DateTime<Utc>, duration_seconds: u64) -> DateTime<Utc> {
    let secs = i64::try_from(duration_seconds).unwrap_or(i64::MAX);
    TimeDelta::try_seconds(secs)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(now)
}

/// Clamp the page counter and keep `status`/`finished_at` consistent with it.
fn settle_status(book: &mut Book, now: DateTime<Utc>) {
    if let Some(total) = book.total_pages {
        if book.current_page >= total {
            book.current_page = total;
            book.status = BookStatus::Finished;
        }
    }
    match book.status {
        BookStatus::Finished if book.finished_at.is_none() => book.finished_at = Some(now),
        BookStatus::Finished => {}
        _ => book.finished_at = None,
    }
}
