//! Reading statistics over a log history.
//!
//! Everything here is a pure function of the records and a "now" carrying
//! the time zone in which calendar days are counted.

use std::collections::HashSet;

use chrono::{Datelike, DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use lectern_db::{Book, ReadingLog};
use lectern_kernel::settings::ReadingSettings;
use serde::Serialize;
use uuid::Uuid;

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// First instant of `date` in `tz`. When midnight does not exist there
/// (DST gap), the first hour that does is used.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    (0..=3)
        .filter_map(|hour| NaiveTime::from_hms_opt(hour, 0, 0))
        .find_map(|time| tz.from_local_datetime(&date.and_time(time)).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// The local calendar day of `now`.
pub fn day_range<Tz: TimeZone>(now: &DateTime<Tz>) -> Period {
    let tz = now.timezone();
    let today = now.date_naive();
    Period {
        start: start_of_day(&tz, today),
        end: start_of_day(&tz, today + Days::new(1)),
    }
}

fn week_start_date(today: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (7 + today.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    today - Days::new(u64::from(offset))
}

/// From the start of the current week through the end of today.
pub fn week_range<Tz: TimeZone>(now: &DateTime<Tz>, week_start: Weekday) -> Period {
    let tz = now.timezone();
    let first = week_start_date(now.date_naive(), week_start);
    Period {
        start: start_of_day(&tz, first),
        end: day_range(now).end,
    }
}

/// The full week before the current one.
pub fn previous_week_range<Tz: TimeZone>(now: &DateTime<Tz>, week_start: Weekday) -> Period {
    let tz = now.timezone();
    let first = week_start_date(now.date_naive(), week_start);
    Period {
        start: start_of_day(&tz, first - Days::new(7)),
        end: start_of_day(&tz, first),
    }
}

fn year_start_date(day: NaiveDate) -> NaiveDate {
    day - Days::new(u64::from(day.ordinal0()))
}

/// From January 1st through the end of today.
pub fn year_range<Tz: TimeZone>(now: &DateTime<Tz>) -> Period {
    let tz = now.timezone();
    Period {
        start: start_of_day(&tz, year_start_date(now.date_naive())),
        end: day_range(now).end,
    }
}

/// The whole previous calendar year.
pub fn previous_year_range<Tz: TimeZone>(now: &DateTime<Tz>) -> Period {
    let tz = now.timezone();
    let this_year = year_start_date(now.date_naive());
    let last_year = year_start_date(this_year - Days::new(1));
    Period {
        start: start_of_day(&tz, last_year),
        end: start_of_day(&tz, this_year),
    }
}

fn in_period<'a>(logs: &'a [ReadingLog], period: Period) -> impl Iterator<Item = &'a ReadingLog> {
    logs.iter().filter(move |log| period.contains(log.log_date))
}

pub fn pages_in_range(logs: &[ReadingLog], period: Period) -> u64 {
    in_period(logs, period)
        .map(|log| u64::from(log.pages_read))
        .sum()
}

pub fn distinct_books_in_range(logs: &[ReadingLog], period: Period) -> usize {
    in_period(logs, period)
        .map(|log| log.book_id)
        .collect::<HashSet<Uuid>>()
        .len()
}

/// Reading minutes in the period. Sessions without a recorded time are
/// estimated at `minutes_per_page`.
pub fn minutes_in_range(logs: &[ReadingLog], period: Period, minutes_per_page: f64) -> u64 {
    let total: f64 = in_period(logs, period)
        .map(|log| match log.reading_time_minutes {
            Some(minutes) => f64::from(minutes),
            None => f64::from(log.pages_read) * minutes_per_page,
        })
        .sum();
    total.max(0.0).round() as u64
}

/// Consecutive local calendar days with at least one log, ending today.
pub fn current_streak<Tz: TimeZone>(logs: &[ReadingLog], now: &DateTime<Tz>) -> u32 {
    let tz = now.timezone();
    let days: HashSet<NaiveDate> = logs
        .iter()
        .map(|log| log.log_date.with_timezone(&tz).date_naive())
        .collect();

    let mut streak = 0;
    let mut day = Some(now.date_naive());
    while let Some(current) = day.filter(|current| days.contains(current)) {
        streak += 1;
        day = current.pred_opt();
    }
    streak
}

/// Logs newest first. Logs with equal dates keep their stored order.
pub fn newest_first(logs: &[ReadingLog]) -> Vec<&ReadingLog> {
    let mut sorted: Vec<&ReadingLog> = logs.iter().collect();
    sorted.sort_by(|a, b| b.log_date.cmp(&a.log_date));
    sorted
}

/// Books from the `limit` most recent logs, most recent first, without
/// repeats. Logs whose book no longer exists are skipped.
pub fn recent_books(logs: &[ReadingLog], books: &[Book], limit: usize) -> Vec<Book> {
    let mut seen = HashSet::new();
    newest_first(logs)
        .into_iter()
        .take(limit)
        .filter(|log| seen.insert(log.book_id))
        .filter_map(|log| books.iter().find(|book| book.id == log.book_id))
        .cloned()
        .collect()
}

/// Book of the most recent log.
pub fn last_logged_book(logs: &[ReadingLog], books: &[Book]) -> Option<Book> {
    let latest = newest_first(logs).into_iter().next()?;
    books.iter().find(|book| book.id == latest.book_id).cloned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

impl Trend {
    pub fn between(current: u64, previous: u64) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Trend::Up,
            std::cmp::Ordering::Less => Trend::Down,
            std::cmp::Ordering::Equal => Trend::Neutral,
        }
    }
}

/// Pages this week against all of last week.
pub fn weekly_trend<Tz: TimeZone>(logs: &[ReadingLog], now: &DateTime<Tz>, week_start: Weekday) -> Trend {
    Trend::between(
        pages_in_range(logs, week_range(now, week_start)),
        pages_in_range(logs, previous_week_range(now, week_start)),
    )
}

/// Distinct books this year against last year.
pub fn yearly_trend<Tz: TimeZone>(logs: &[ReadingLog], now: &DateTime<Tz>) -> Trend {
    Trend::between(
        distinct_books_in_range(logs, year_range(now)) as u64,
        distinct_books_in_range(logs, previous_year_range(now)) as u64,
    )
}

/// Share of the daily goal reached, capped at 1.
pub fn daily_goal_progress(today_pages: u64, goal_pages: u32) -> f64 {
    if goal_pages == 0 {
        return 0.0;
    }
    (today_pages as f64 / f64::from(goal_pages)).min(1.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    pub total_pages: u64,
    pub session_count: usize,
    /// Whole pages per session.
    pub average_pages: u64,
}

pub fn log_summary(logs: &[ReadingLog]) -> LogSummary {
    let total_pages: u64 = logs.iter().map(|log| u64::from(log.pages_read)).sum();
    let session_count = logs.len();
    LogSummary {
        total_pages,
        session_count,
        average_pages: total_pages.checked_div(session_count as u64).unwrap_or(0),
    }
}

/// Everything the home screen shows, for one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub today_pages: u64,
    pub today_minutes: u64,
    pub daily_goal_pages: u32,
    pub daily_goal_progress: f64,
    pub week_pages: u64,
    pub weekly_trend: Trend,
    pub books_this_year: usize,
    pub yearly_trend: Trend,
    pub streak_days: u32,
    pub recent_books: Vec<Book>,
    pub last_logged_book: Option<Book>,
}

impl Dashboard {
    pub fn compute<Tz: TimeZone>(
        books: &[Book],
        logs: &[ReadingLog],
        now: &DateTime<Tz>,
        reading: &ReadingSettings,
    ) -> Self {
        let week_start = reading.week_start.weekday();
        let today = day_range(now);
        let today_pages = pages_in_range(logs, today);

        Self {
            date: now.date_naive(),
            today_pages,
            today_minutes: minutes_in_range(logs, today, reading.default_minutes_per_page),
            daily_goal_pages: reading.daily_goal_pages,
            daily_goal_progress: daily_goal_progress(today_pages, reading.daily_goal_pages),
            week_pages: pages_in_range(logs, week_range(now, week_start)),
            weekly_trend: weekly_trend(logs, now, week_start),
            books_this_year: distinct_books_in_range(logs, year_range(now)),
            yearly_trend: yearly_trend(logs, now),
            streak_days: current_streak(logs, now),
            recent_books: recent_books(logs, books, reading.recent_books_limit),
            last_logged_book: last_logged_book(logs, books),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    /// Wednesday 2025-08-13 15:00 at UTC+2.
    fn now() -> DateTime<FixedOffset> {
        tz().with_ymd_and_hms(2025, 8, 13, 15, 0, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        tz().with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().with_timezone(&Utc)
    }

    fn log(book: &Book, pages: u32, date: DateTime<Utc>) -> ReadingLog {
        ReadingLog::new(book.id, pages, None, None).with_log_date(date)
    }

    #[test]
    fn empty_history_is_all_zero() {
        let dashboard = Dashboard::compute(&[], &[], &now(), &ReadingSettings::default());

        assert_eq!(dashboard.today_pages, 0);
        assert_eq!(dashboard.week_pages, 0);
        assert_eq!(dashboard.books_this_year, 0);
        assert_eq!(dashboard.streak_days, 0);
        assert!(dashboard.recent_books.is_empty());
        assert!(dashboard.last_logged_book.is_none());
        assert_eq!(dashboard.weekly_trend, Trend::Neutral);
    }

    #[test]
    fn today_uses_local_midnight() {
        let book = Book::new("Dune", "Frank Herbert", 400);
        let logs = vec![
            // 23:30 local on the 12th.
            log(&book, 7, at(2025, 8, 12, 23) + chrono::Duration::minutes(30)),
            log(&book, 20, at(2025, 8, 13, 0)),
            log(&book, 15, at(2025, 8, 13, 14)),
        ];

        let today = day_range(&now());
        assert_eq!(today.start, at(2025, 8, 13, 0));
        assert_eq!(pages_in_range(&logs, today), 35);
    }

    #[test]
    fn week_starts_on_configured_day() {
        let monday = week_range(&now(), Weekday::Mon);
        assert_eq!(monday.start, at(2025, 8, 11, 0));

        let sunday = week_range(&now(), Weekday::Sun);
        assert_eq!(sunday.start, at(2025, 8, 10, 0));

        let previous = previous_week_range(&now(), Weekday::Mon);
        assert_eq!(previous.start, at(2025, 8, 4, 0));
        assert_eq!(previous.end, monday.start);
    }

    #[test]
    fn year_ranges() {
        let this_year = year_range(&now());
        assert_eq!(this_year.start, at(2025, 1, 1, 0));

        let last_year = previous_year_range(&now());
        assert_eq!(last_year.start, at(2024, 1, 1, 0));
        assert_eq!(last_year.end, this_year.start);
    }

    #[test]
    fn distinct_books_counts_each_book_once() {
        let a = Book::new("A", "X", 100);
        let b = Book::new("B", "Y", 100);
        let logs = vec![
            log(&a, 10, at(2025, 3, 1, 9)),
            log(&a, 10, at(2025, 4, 1, 9)),
            log(&b, 10, at(2025, 5, 1, 9)),
            log(&b, 10, at(2024, 5, 1, 9)),
        ];

        assert_eq!(distinct_books_in_range(&logs, year_range(&now())), 2);
        assert_eq!(distinct_books_in_range(&logs, previous_year_range(&now())), 1);
        assert_eq!(yearly_trend(&logs, &now()), Trend::Up);
    }

    #[test]
    fn streak_counts_back_from_today() {
        let book = Book::new("Dune", "Frank Herbert", 400);
        let logs = vec![
            log(&book, 5, at(2025, 8, 13, 8)),
            log(&book, 5, at(2025, 8, 12, 22)),
            log(&book, 5, at(2025, 8, 12, 7)),
            log(&book, 5, at(2025, 8, 11, 1)),
            log(&book, 5, at(2025, 8, 9, 12)),
        ];
        assert_eq!(current_streak(&logs, &now()), 3);

        let without_today: Vec<ReadingLog> = logs[1..].to_vec();
        assert_eq!(current_streak(&without_today, &now()), 0);

        let gap_yesterday = vec![
            log(&book, 5, at(2025, 8, 13, 8)),
            log(&book, 5, at(2025, 8, 11, 9)),
            log(&book, 5, at(2025, 8, 10, 9)),
        ];
        assert_eq!(current_streak(&gap_yesterday, &now()), 1);
    }

    #[test]
    fn recent_books_dedupes_in_recency_order() {
        let a = Book::new("A", "X", 100);
        let b = Book::new("B", "Y", 100);
        let c = Book::new("C", "Z", 100);
        let gone = Uuid::new_v4();
        let books = vec![a.clone(), b.clone(), c.clone()];
        let logs = vec![
            log(&c, 1, at(2025, 8, 1, 9)),
            log(&a, 1, at(2025, 8, 13, 9)),
            log(&b, 1, at(2025, 8, 12, 9)),
            log(&a, 1, at(2025, 8, 11, 9)),
            ReadingLog::new(gone, 1, None, None).with_log_date(at(2025, 8, 10, 9)),
        ];

        let recent: Vec<String> = recent_books(&logs, &books, 3)
            .into_iter()
            .map(|book| book.title)
            .collect();
        assert_eq!(recent, vec!["A", "B"]);

        assert_eq!(last_logged_book(&logs, &books).unwrap().id, a.id);
    }

    #[test]
    fn equal_dates_keep_insertion_order() {
        let a = Book::new("A", "X", 100);
        let b = Book::new("B", "Y", 100);
        let when = at(2025, 8, 13, 9);
        let logs = vec![log(&a, 1, when), log(&b, 1, when)];

        assert_eq!(last_logged_book(&logs, &[a.clone(), b]).unwrap().id, a.id);
    }

    #[test]
    fn weekly_trend_compares_full_previous_week() {
        let book = Book::new("Dune", "Frank Herbert", 400);
        let mut logs = vec![
            log(&book, 30, at(2025, 8, 5, 9)),
            log(&book, 30, at(2025, 8, 10, 23)),
            log(&book, 50, at(2025, 8, 12, 9)),
        ];
        assert_eq!(weekly_trend(&logs, &now(), Weekday::Mon), Trend::Down);

        logs.push(log(&book, 10, at(2025, 8, 13, 9)));
        assert_eq!(weekly_trend(&logs, &now(), Weekday::Mon), Trend::Neutral);

        logs.push(log(&book, 1, at(2025, 8, 13, 10)));
        assert_eq!(weekly_trend(&logs, &now(), Weekday::Mon), Trend::Up);
    }

    #[test]
    fn estimated_minutes_fill_in_missing_times() {
        let book = Book::new("Dune", "Frank Herbert", 400);
        let logs = vec![
            ReadingLog::new(book.id, 10, Some(25), None).with_log_date(at(2025, 8, 13, 9)),
            log(&book, 10, at(2025, 8, 13, 10)),
        ];
        assert_eq!(minutes_in_range(&logs, day_range(&now()), 2.0), 45);
    }

    #[test]
    fn daily_goal_is_capped() {
        assert_eq!(daily_goal_progress(50, 100), 0.5);
        assert_eq!(daily_goal_progress(250, 100), 1.0);
        assert_eq!(daily_goal_progress(10, 0), 0.0);
    }

    #[test]
    fn summary_uses_whole_pages() {
        let book = Book::new("Dune", "Frank Herbert", 400);
        let logs = vec![
            log(&book, 10, at(2025, 8, 1, 9)),
            log(&book, 15, at(2025, 8, 2, 9)),
        ];
        let summary = log_summary(&logs);

        assert_eq!(summary.total_pages, 25);
        assert_eq!(summary.session_count, 2);
        assert_eq!(summary.average_pages, 12);
        assert_eq!(log_summary(&[]), LogSummary::default());
    }

    #[test]
    fn dashboard_bundles_everything() {
        let book = Book::new("Dune", "Frank Herbert", 400);
        let logs = vec![
            log(&book, 60, at(2025, 8, 12, 9)),
            log(&book, 40, at(2025, 8, 13, 9)),
        ];
        let dashboard = Dashboard::compute(
            std::slice::from_ref(&book),
            &logs,
            &now(),
            &ReadingSettings::default(),
        );

        assert_eq!(dashboard.date.day(), 13);
        assert_eq!(dashboard.today_pages, 40);
        assert_eq!(dashboard.today_minutes, 80);
        assert_eq!(dashboard.daily_goal_progress, 0.4);
        assert_eq!(dashboard.week_pages, 100);
        assert_eq!(dashboard.books_this_year, 1);
        assert_eq!(dashboard.streak_days, 2);
        assert_eq!(dashboard.recent_books.len(), 1);
        assert_eq!(dashboard.last_logged_book.map(|book| book.id), Some(book.id));
    }
}
