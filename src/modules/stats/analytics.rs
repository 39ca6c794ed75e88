//! Per-book reading analytics: totals, speed and time left.

use std::fmt;

use lectern_db::{Book, BookStatus, ReadingLog};
use serde::{Serialize, Serializer};

use super::engine::newest_first;

const RECENT_LOGS: usize = 5;

/// Whole-book estimate of the reading time left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeToFinish {
    Completed,
    Unknown,
    Minutes(u64),
    Hours(f64),
    Days(u64),
}

impl TimeToFinish {
    /// `remaining_pages` at `pages_per_hour`, bucketed by magnitude. A
    /// completed book is always `Completed`, whatever its page count.
    pub fn estimate(book: &Book, pages_per_hour: f64) -> Self {
        if book.status == BookStatus::Completed {
            return TimeToFinish::Completed;
        }
        if pages_per_hour <= 0.0 || book.current_page >= book.total_pages {
            return TimeToFinish::Unknown;
        }

        let hours = f64::from(book.remaining_pages()) / pages_per_hour;
        if hours < 1.0 {
            TimeToFinish::Minutes((hours * 60.0) as u64)
        } else if hours < 24.0 {
            TimeToFinish::Hours(hours)
        } else {
            TimeToFinish::Days((hours / 24.0) as u64)
        }
    }
}

impl fmt::Display for TimeToFinish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeToFinish::Completed => f.write_str("Completed"),
            TimeToFinish::Unknown => f.write_str("Unknown"),
            TimeToFinish::Minutes(minutes) => write!(f, "{minutes}m"),
            TimeToFinish::Hours(hours) => write!(f, "{hours:.1}h"),
            TimeToFinish::Days(days) => write!(f, "{days}d"),
        }
    }
}

impl Serialize for TimeToFinish {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// "45m", "2h" or "2h 5m".
pub fn format_minutes(total: u64) -> String {
    if total < 60 {
        return format!("{total}m");
    }
    match (total / 60, total % 60) {
        (hours, 0) => format!("{hours}h"),
        (hours, minutes) => format!("{hours}h {minutes}m"),
    }
}

/// Pages per hour over sessions, or 0 when pages or time is missing.
pub fn average_speed(total_pages: u64, total_minutes: u64) -> f64 {
    if total_pages == 0 || total_minutes == 0 {
        return 0.0;
    }
    total_pages as f64 / (total_minutes as f64 / 60.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookAnalytics {
    pub book: Book,
    pub total_pages_read: u64,
    /// Recorded minutes only; sessions without a time count as zero.
    pub total_reading_minutes: u64,
    pub formatted_reading_time: String,
    pub log_count: usize,
    /// Pages per hour.
    pub average_speed: f64,
    pub average_speed_text: String,
    pub time_to_finish: TimeToFinish,
    pub progress: f64,
    /// Newest first.
    pub recent_logs: Vec<ReadingLog>,
}

impl BookAnalytics {
    /// Analytics for `book` over whichever of `logs` belong to it.
    pub fn compute(book: &Book, logs: &[ReadingLog]) -> Self {
        let own: Vec<ReadingLog> = logs
            .iter()
            .filter(|log| log.book_id == book.id)
            .cloned()
            .collect();

        let total_pages_read: u64 = own.iter().map(|log| u64::from(log.pages_read)).sum();
        let total_reading_minutes: u64 = own
            .iter()
            .filter_map(|log| log.reading_time_minutes)
            .map(u64::from)
            .sum();
        let speed = average_speed(total_pages_read, total_reading_minutes);

        Self {
            book: book.clone(),
            total_pages_read,
            total_reading_minutes,
            formatted_reading_time: format_minutes(total_reading_minutes),
            log_count: own.len(),
            average_speed: speed,
            average_speed_text: if speed > 0.0 {
                format!("{}", speed as u64)
            } else {
                "N/A".to_string()
            },
            time_to_finish: TimeToFinish::estimate(book, speed),
            progress: book.progress(),
            recent_logs: newest_first(&own)
                .into_iter()
                .take(RECENT_LOGS)
                .cloned()
                .collect(),
        }
    }
}
