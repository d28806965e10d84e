use chrono::{Datelike, NaiveDate};

const WEEKDAYS: [&str; 7] = [
    "일요일", "월요일", "화요일", "수요일", "목요일", "금요일", "토요일",
];

/// Source of "today" in local time.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Always reports the same day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Format as `2026년 10월 19일 월요일`.
pub fn date_label(date: NaiveDate) -> String {
    let weekday = WEEKDAYS[date.weekday().num_days_from_sunday() as usize];
    format!(
        "{}년 {}월 {}일 {}",
        date.year(),
        date.month(),
        date.day(),
        weekday
    )
}
