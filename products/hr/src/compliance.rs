//! Training status classification.
//!
//! A program with a recurrence period expires `recurrence_years` calendar
//! years after the latest completion. The last calendar month before expiry is
//! the warning window. Programs without a recurrence never expire.

use async_graphql::Enum;
use chrono::{Months, NaiveDate};
use serde::Serialize;

/// Length of the warning window before expiry, in calendar months.
pub const WARNING_WINDOW_MONTHS: u32 = 1;

#[derive(Enum, Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainingStatus {
    NotCompleted,
    Completed,
    Warning,
    Overdue,
}

impl TrainingStatus {
    /// Kebab-case name used by report consumers for styling.
    pub fn css_class(self) -> &'static str {
        match self {
            TrainingStatus::NotCompleted => "not-completed",
            TrainingStatus::Completed => "completed",
            TrainingStatus::Warning => "warning",
            TrainingStatus::Overdue => "overdue",
        }
    }

    /// True when the employee has to be scheduled for (re)training.
    pub fn needs_attention(self) -> bool {
        !matches!(self, TrainingStatus::Completed)
    }
}

/// Completion date plus `recurrence_years` calendar years; Feb 29 clamps to Feb 28.
pub fn expiry_date(completion: NaiveDate, recurrence_years: Option<i32>) -> Option<NaiveDate> {
    let years = u32::try_from(recurrence_years?).ok().filter(|y| *y > 0)?;
    completion.checked_add_months(Months::new(years.checked_mul(12)?))
}

pub fn warning_start(expiry: NaiveDate) -> NaiveDate {
    expiry
        .checked_sub_months(Months::new(WARNING_WINDOW_MONTHS))
        .unwrap_or(expiry)
}

pub fn classify(
    latest_completion: Option<NaiveDate>,
    recurrence_years: Option<i32>,
    today: NaiveDate,
) -> TrainingStatus {
    let Some(completion) = latest_completion else {
        return TrainingStatus::NotCompleted;
    };
    let Some(expiry) = expiry_date(completion, recurrence_years) else {
        return TrainingStatus::Completed;
    };
    if today > expiry {
        TrainingStatus::Overdue
    } else if today >= warning_start(expiry) {
        TrainingStatus::Warning
    } else {
        TrainingStatus::Completed
    }
}

/// Anything carrying a completion date for a training program.
pub trait Completion {
    fn completed_on(&self) -> NaiveDate;
}

impl Completion for entity::training_record::Model {
    fn completed_on(&self) -> NaiveDate {
        self.completion_date
    }
}

impl Completion for NaiveDate {
    fn completed_on(&self) -> NaiveDate {
        *self
    }
}

/// The record with the greatest completion date.
pub fn latest<'a, R, I>(records: I) -> Option<&'a R>
where
    R: Completion + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records.into_iter().max_by_key(|record| record.completed_on())
}

/// Full classification of one (employee, program) pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Assessment {
    pub status: TrainingStatus,
    pub completion_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub days_until_expiry: Option<i64>,
}

pub fn assess(
    latest_completion: Option<NaiveDate>,
    recurrence_years: Option<i32>,
    today: NaiveDate,
) -> Assessment {
    let expiry = latest_completion.and_then(|date| expiry_date(date, recurrence_years));
    Assessment {
        status: classify(latest_completion, recurrence_years, today),
        completion_date: latest_completion,
        expiry_date: expiry,
        days_until_expiry: expiry.map(|date| (date - today).num_days()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_completion_is_not_completed() {
        assert_eq!(
            classify(None, Some(3), date(2025, 1, 1)),
            TrainingStatus::NotCompleted
        );
    }

    #[test]
    fn program_without_recurrence_stays_completed() {
        assert_eq!(
            classify(Some(date(2001, 5, 1)), None, date(2025, 1, 1)),
            TrainingStatus::Completed
        );
    }

    #[test]
    fn warning_window_starts_one_calendar_month_before_expiry() {
        let done = date(2022, 3, 15);
        // expiry 2025-03-15, warning from 2025-02-15
        assert_eq!(
            classify(Some(done), Some(3), date(2025, 2, 14)),
            TrainingStatus::Completed
        );
        assert_eq!(
            classify(Some(done), Some(3), date(2025, 2, 15)),
            TrainingStatus::Warning
        );
        assert_eq!(
            classify(Some(done), Some(3), date(2025, 3, 15)),
            TrainingStatus::Warning
        );
        assert_eq!(
            classify(Some(done), Some(3), date(2025, 3, 16)),
            TrainingStatus::Overdue
        );
    }

    #[test]
    fn leap_day_completion_expires_on_feb_28() {
        assert_eq!(
            expiry_date(date(2024, 2, 29), Some(1)),
            Some(date(2025, 2, 28))
        );
        assert_eq!(
            expiry_date(date(2024, 2, 29), Some(4)),
            Some(date(2028, 2, 29))
        );
    }

    #[test]
    fn warning_start_clamps_to_month_end() {
        assert_eq!(warning_start(date(2025, 3, 31)), date(2025, 2, 28));
    }

    #[test]
    fn non_positive_recurrence_never_expires() {
        assert_eq!(expiry_date(date(2020, 1, 1), Some(0)), None);
        assert_eq!(expiry_date(date(2020, 1, 1), Some(-2)), None);
    }

    #[test]
    fn latest_picks_greatest_completion_date() {
        let dates = [date(2020, 1, 1), date(2023, 6, 1), date(2021, 12, 31)];
        assert_eq!(latest(dates.iter()), Some(&date(2023, 6, 1)));
        assert_eq!(latest::<NaiveDate, _>([].iter()), None);
    }

    #[test]
    fn assessment_reports_days_left() {
        let report = assess(Some(date(2024, 1, 10)), Some(1), date(2024, 12, 31));
        assert_eq!(report.status, TrainingStatus::Warning);
        assert_eq!(report.expiry_date, Some(date(2025, 1, 10)));
        assert_eq!(report.days_until_expiry, Some(10));

        let overdue = assess(Some(date(2020, 1, 10)), Some(1), date(2021, 1, 11));
        assert_eq!(overdue.status, TrainingStatus::Overdue);
        assert_eq!(overdue.days_until_expiry, Some(-1));
    }

    #[test]
    fn only_completed_needs_no_attention() {
        assert!(!TrainingStatus::Completed.needs_attention());
        assert!(TrainingStatus::Warning.needs_attention());
        assert_eq!(TrainingStatus::NotCompleted.css_class(), "not-completed");
    }
}
