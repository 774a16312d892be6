use clap::Subcommand;
use youfirst_core::{BookPatch, BookStatus, Clock, MindStore, SqliteStore, SystemClock};

use super::{print_found, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ReadAction {
    /// List books
    Books,
    /// Add a book to the shelf
    Add {
        title: String,
        #[arg(long, default_value = "")]
        author: String,
        #[arg(long)]
        pages: Option<u32>,
    },
    /// Edit a book
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        pages: Option<u32>,
        /// Page reached so far
        #[arg(long)]
        current_page: Option<u32>,
        /// want_to_read, reading or finished
        #[arg(long, value_parser = parse_status)]
        status: Option<BookStatus>,
    },
    /// Delete a book (its sessions are kept)
    Delete { id: String },
    /// Log a reading session
    Log {
        /// Duration in minutes
        minutes: u64,
        #[arg(long)]
        book: Option<String>,
        /// Pages read during the session
        #[arg(long)]
        pages: Option<u32>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List reading sessions, newest first
    Sessions,
    /// Delete a reading session
    DeleteSession { id: String },
    /// Reading totals
    Stats,
}

fn parse_status(s: &str) -> Result<BookStatus, String> {
    serde_json::from_value(serde_json::Value::String(s.replace('-', "_")))
        .map_err(|_| format!("unknown status '{s}' (want_to_read, reading, finished)"))
}

pub fn run(action: ReadAction) -> CmdResult {
    let store = SqliteStore::open()?;
    let clock = SystemClock;
    let mind = MindStore::new(&store, &clock);

    match action {
        ReadAction::Books => print_json(&mind.load_books())?,
        ReadAction::Add {
            title,
            author,
            pages,
        } => print_json(&mind.add_book(&title, &author, pages))?,
        ReadAction::Update {
            id,
            title,
            author,
            pages,
            current_page,
            status,
        } => {
            let patch = BookPatch {
                title,
                author,
                total_pages: pages,
                current_page,
                status,
            };
            print_found(mind.update_book(&id, patch), &id)?;
        }
        ReadAction::Delete { id } => {
            if !mind.delete_book(&id) {
                return Err(format!("not found: {id}").into());
            }
            println!("deleted {id}");
        }
        ReadAction::Log {
            minutes,
            book,
            pages,
            notes,
        } => {
            let seconds = minutes.saturating_mul(60);
            let session = mind.record_session(book.as_deref(), seconds, pages, &notes);
            print_json(&session)?;
        }
        ReadAction::Sessions => {
            let mut sessions = mind.load_sessions();
            sessions.reverse();
            print_json(&sessions)?;
        }
        ReadAction::DeleteSession { id } => {
            if !mind.delete_session(&id) {
                return Err(format!("not found: {id}").into());
            }
            println!("deleted {id}");
        }
        ReadAction::Stats => print_json(&mind.reading_stats(clock.today()))?,
    }
    Ok(())
}
