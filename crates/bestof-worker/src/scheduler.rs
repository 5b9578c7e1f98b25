//! Weekly trigger for best-of generation.

use std::future::Future;
use std::time::Duration;

use chrono::{Datelike, Days, Local, NaiveDateTime, NaiveTime, Weekday};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A weekday and local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl Default for WeeklySchedule {
    /// Sunday at midnight.
    fn default() -> Self {
        Self {
            weekday: Weekday::Sun,
            time: NaiveTime::default(),
        }
    }
}

impl WeeklySchedule {
    /// Parse a weekday name (`sunday`, `sun`) and an `HH:MM` time.
    pub fn parse(weekday: &str, time: &str) -> Result<Self, String> {
        let weekday = weekday
            .trim()
            .parse::<Weekday>()
            .map_err(|_| format!("invalid weekday: {:?}", weekday))?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .map_err(|e| format!("invalid time {:?}: {}", time, e))?;
        Ok(Self { weekday, time })
    }

    /// First scheduled instant strictly after `now`.
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        let days_ahead = (7 + self.weekday.num_days_from_monday()
            - today.weekday().num_days_from_monday())
            % 7;

        let candidate = today
            .checked_add_days(Days::new(u64::from(days_ahead)))
            .unwrap_or(today)
            .and_time(self.time);

        if candidate > now {
            candidate
        } else {
            candidate
                .checked_add_days(Days::new(7))
                .unwrap_or(candidate)
        }
    }
}

/// Run `job` at every occurrence of `schedule` (local time) until `cancel`
/// fires. A job in progress is dropped on cancellation.
pub async fn run_weekly<F, Fut>(schedule: WeeklySchedule, cancel: CancellationToken, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let now = Local::now().naive_local();
        let next = schedule.next_run_after(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!("Next best-of generation scheduled for {}", next.format("%Y-%m-%d %H:%M"));

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Shutdown requested during best-of generation");
                break;
            }
            _ = job() => {}
        }
    }

    info!("Weekly scheduler stopped");
}
