use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reading status of a book. Set explicitly by library actions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    #[default]
    ToRead,
    Reading,
    Paused,
    Completed,
}

impl BookStatus {
    pub const ALL: [BookStatus; 4] = [
        BookStatus::ToRead,
        BookStatus::Reading,
        BookStatus::Paused,
        BookStatus::Completed,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            BookStatus::ToRead => "To Read",
            BookStatus::Reading => "Reading",
            BookStatus::Paused => "Paused",
            BookStatus::Completed => "Completed",
        }
    }
}

/// A cataloged book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub total_pages: u32,
    /// Always within `0..=total_pages`; the store clamps on every write.
    pub current_page: u32,
    #[serde(default)]
    pub status: BookStatus,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>, total_pages: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            author: author.into(),
            total_pages,
            current_page: 0,
            status: BookStatus::ToRead,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    /// Fraction of the book read, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        (f64::from(self.current_page) / f64::from(self.total_pages)).min(1.0)
    }

    pub fn remaining_pages(&self) -> u32 {
        self.total_pages.saturating_sub(self.current_page)
    }

    pub(crate) fn clamp_current_page(&mut self) {
        self.current_page = self.current_page.min(self.total_pages);
    }
}

/// One recorded reading session. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingLog {
    pub id: Uuid,
    pub book_id: Uuid,
    pub pages_read: u32,
    #[serde(default)]
    pub reading_time_minutes: Option<u32>,
    pub log_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ReadingLog {
    /// A session logged now. Blank notes are dropped.
    pub fn new(
        book_id: Uuid,
        pages_read: u32,
        reading_time_minutes: Option<u32>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            pages_read,
            reading_time_minutes,
            log_date: Utc::now(),
            notes: notes.filter(|text| !text.trim().is_empty()),
        }
    }

    /// Override the session date before the log is stored (imports, tests).
    pub fn with_log_date(mut self, log_date: DateTime<Utc>) -> Self {
        self.log_date = log_date;
        self
    }

    pub fn reading_time_text(&self) -> String {
        match self.reading_time_minutes {
            None => "Time not logged".to_string(),
            Some(minutes) if minutes < 60 => format!("{minutes} min"),
            Some(minutes) => {
                let hours = minutes / 60;
                match minutes % 60 {
                    0 => format!("{hours}h"),
                    rest => format!("{hours}h {rest}m"),
                }
            }
        }
    }
}
