//! Interval and period vocabulary.
//!
//! Tokens are case-sensitive: `1m` is one minute, `1M` is one month.
//!
//! Intervals: `1m 5m 15m 30m 1h 1d 1w 1M 3M 1Y`
//! Periods:   `1h 1d 7d 1M 3M 6M 1Y 5Y all`

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Truncation {
    None,
    Day,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalStep {
    Minutes(u32),
    Days(u32),
    Months(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IntervalSpec {
    token: &'static str,
    step: IntervalStep,
    truncation: Truncation,
}

impl IntervalSpec {
    const fn new(token: &'static str, step: IntervalStep, truncation: Truncation) -> Self {
        Self {
            token,
            step,
            truncation,
        }
    }

    pub fn token(&self) -> &'static str {
        self.token
    }

    pub fn step(&self) -> IntervalStep {
        self.step
    }

    pub fn truncation(&self) -> Truncation {
        self.truncation
    }

    /// Fixed size in minutes, `None` for calendar steps.
    pub fn minutes(&self) -> Option<u32> {
        match self.step {
            IntervalStep::Minutes(minutes) => Some(minutes),
            IntervalStep::Days(_) | IntervalStep::Months(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodSpan {
    Minutes(i64),
    Months(u32),
    All,
}

/// Pins a period to an explicit calendar unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalendarBinding {
    Year(i32),
    Month { year: i32, month: u32 },
    /// `week` is 1-based; see `window` for the numbering convention.
    Week { year: i32, week: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PeriodSpec {
    token: &'static str,
    span: PeriodSpan,
    binding: Option<CalendarBinding>,
    forecast: bool,
}

impl PeriodSpec {
    const fn new(token: &'static str, span: PeriodSpan) -> Self {
        Self {
            token,
            span,
            binding: None,
            forecast: false,
        }
    }

    pub fn token(&self) -> &'static str {
        self.token
    }

    pub fn span(&self) -> PeriodSpan {
        self.span
    }

    pub fn binding(&self) -> Option<CalendarBinding> {
        self.binding
    }

    pub fn is_forecast(&self) -> bool {
        self.forecast
    }

    pub fn for_year(mut self, year: i32) -> Self {
        self.binding = Some(CalendarBinding::Year(year));
        self
    }

    pub fn for_month(mut self, year: i32, month: u32) -> Self {
        self.binding = Some(CalendarBinding::Month { year, month });
        self
    }

    pub fn for_week(mut self, year: i32, week: u32) -> Self {
        self.binding = Some(CalendarBinding::Week { year, week });
        self
    }

    /// Flips the window to extend forward from the anchor.
    pub fn forecast(mut self) -> Self {
        self.forecast = true;
        self
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnknownUnitError {
    #[error("unknown interval: {0}")]
    Interval(String),
    #[error("unknown period: {0}")]
    Period(String),
    #[error("no interval with size {0} minutes")]
    IntervalSize(u32),
    #[error("unknown unit: {0}")]
    Unit(String),
}

pub const INTERVALS: [IntervalSpec; 10] = [
    IntervalSpec::new("1m", IntervalStep::Minutes(1), Truncation::None),
    IntervalSpec::new("5m", IntervalStep::Minutes(5), Truncation::None),
    IntervalSpec::new("15m", IntervalStep::Minutes(15), Truncation::None),
    IntervalSpec::new("30m", IntervalStep::Minutes(30), Truncation::None),
    IntervalSpec::new("1h", IntervalStep::Minutes(60), Truncation::None),
    IntervalSpec::new("1d", IntervalStep::Days(1), Truncation::Day),
    IntervalSpec::new("1w", IntervalStep::Days(7), Truncation::None),
    IntervalSpec::new("1M", IntervalStep::Months(1), Truncation::Month),
    IntervalSpec::new("3M", IntervalStep::Months(3), Truncation::None),
    IntervalSpec::new("1Y", IntervalStep::Months(12), Truncation::None),
];

pub const PERIODS: [PeriodSpec; 9] = [
    PeriodSpec::new("1h", PeriodSpan::Minutes(60)),
    PeriodSpec::new("1d", PeriodSpan::Minutes(24 * 60)),
    PeriodSpec::new("7d", PeriodSpan::Minutes(7 * 24 * 60)),
    PeriodSpec::new("1M", PeriodSpan::Months(1)),
    PeriodSpec::new("3M", PeriodSpan::Months(3)),
    PeriodSpec::new("6M", PeriodSpan::Months(6)),
    PeriodSpec::new("1Y", PeriodSpan::Months(12)),
    PeriodSpec::new("5Y", PeriodSpan::Months(60)),
    PeriodSpec::new("all", PeriodSpan::All),
];

pub fn resolve_interval(token: &str) -> Result<IntervalSpec, UnknownUnitError> {
    let trimmed = token.trim();
    INTERVALS
        .iter()
        .find(|interval| interval.token == trimmed)
        .copied()
        .ok_or_else(|| UnknownUnitError::Interval(token.to_string()))
}

pub fn resolve_period(token: &str) -> Result<PeriodSpec, UnknownUnitError> {
    let trimmed = token.trim();
    PERIODS
        .iter()
        .find(|period| period.token == trimmed)
        .copied()
        .ok_or_else(|| UnknownUnitError::Period(token.to_string()))
}

/// Maps a network's native interval size to the catalog interval.
pub fn interval_by_size(minutes: u32) -> Result<IntervalSpec, UnknownUnitError> {
    INTERVALS
        .iter()
        .find(|interval| interval.minutes() == Some(minutes))
        .copied()
        .ok_or(UnknownUnitError::IntervalSize(minutes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_minute_and_calendar_intervals() {
        let five = resolve_interval("5m").unwrap();
        assert_eq!(five.token(), "5m");
        assert_eq!(five.minutes(), Some(5));
        assert_eq!(five.truncation(), Truncation::None);

        let daily = resolve_interval("1d").unwrap();
        assert_eq!(daily.step(), IntervalStep::Days(1));
        assert_eq!(daily.truncation(), Truncation::Day);

        let monthly = resolve_interval("1M").unwrap();
        assert_eq!(monthly.step(), IntervalStep::Months(1));
        assert_eq!(monthly.truncation(), Truncation::Month);
    }

    #[test]
    fn minute_and_month_tokens_are_distinct() {
        assert_eq!(resolve_interval("1m").unwrap().minutes(), Some(1));
        assert_eq!(resolve_interval("1M").unwrap().minutes(), None);
    }

    #[test]
    fn resolves_periods_and_bindings() {
        let week = resolve_period("7d").unwrap();
        assert_eq!(week.span(), PeriodSpan::Minutes(10_080));
        assert!(!week.is_forecast());
        assert!(week.forecast().is_forecast());

        let year = resolve_period("1Y").unwrap().for_year(2020);
        assert_eq!(year.binding(), Some(CalendarBinding::Year(2020)));

        assert_eq!(resolve_period(" all ").unwrap().span(), PeriodSpan::All);
    }

    #[test]
    fn unknown_tokens_are_explicit_errors() {
        assert_eq!(
            resolve_interval("2m").unwrap_err(),
            UnknownUnitError::Interval("2m".to_string())
        );
        assert_eq!(
            resolve_period("fortnight").unwrap_err(),
            UnknownUnitError::Period("fortnight".to_string())
        );
        assert_eq!(
            interval_by_size(7).unwrap_err(),
            UnknownUnitError::IntervalSize(7)
        );
    }

    #[test]
    fn interval_by_size_matches_network_cadences() {
        assert_eq!(interval_by_size(5).unwrap().token(), "5m");
        assert_eq!(interval_by_size(30).unwrap().token(), "30m");
        assert_eq!(interval_by_size(60).unwrap().token(), "1h");
    }
}
