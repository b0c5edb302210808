//! Query window resolution.
//!
//! Rules:
//! - fixed spans (`1h`, `7d`, ...): `[end - span, end]`
//! - calendar-month spans (`1M`, `1Y`, ...): `[end - n months, end]`
//! - forecast: `[end, end + span]`
//! - `all`: `[start, end]`, with end moved to the last second of the last complete
//!   month when the interval is monthly
//! - year binding: `[Jan 1 00:00:00, min(Dec 31 23:59:59, end)]`
//! - month binding: `[1st 00:00:00, min(last day 23:59:59, end)]`
//! - week binding: seven days from the Monday of `%W` week `week - 1`
//! - daily/monthly intervals snap the start to its local day/month
//!
//! Week numbering is not ISO-8601. Weeks start on Monday, and the days of January
//! before the first Monday form week 0. With the 1-based `week` used here, week 1 is
//! anchored on the Monday on or before January 1.

use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, FixedOffset, Months, NaiveDate,
    NaiveDateTime,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{
    CalendarBinding, IntervalSpec, IntervalStep, PeriodSpan, PeriodSpec, Truncation,
    UnknownUnitError,
};
use crate::network::{ConfigurationError, NetworkDescriptor, NetworkTz};
use crate::range::{AvailableRangeLookup, RangeFilter};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    UnknownUnit(#[from] UnknownUnitError),
    #[error("forecast windows need a bounded period, got {0}")]
    UnboundedForecast(&'static str),
    #[error("invalid calendar binding: {0}")]
    InvalidCalendar(String),
    #[error("window arithmetic out of range near {0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRequest {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub interval: IntervalSpec,
    pub period: PeriodSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    truncation: Truncation,
    interval: IntervalSpec,
}

impl ResolvedWindow {
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn truncation(&self) -> Truncation {
        self.truncation
    }

    pub fn interval(&self) -> IntervalSpec {
        self.interval
    }

    /// Interval token the window is bucketed by.
    pub fn trunc(&self) -> &'static str {
        self.interval.token()
    }

    /// Inclusive number of interval buckets between start and end.
    pub fn length(&self) -> u64 {
        if self.end < self.start {
            return 0;
        }

        let buckets = match self.interval.step() {
            IntervalStep::Minutes(minutes) => {
                (self.end - self.start).num_minutes() / i64::from(minutes.max(1))
            }
            IntervalStep::Days(days) => {
                (self.end.date_naive() - self.start.date_naive()).num_days()
                    / i64::from(days.max(1))
            }
            IntervalStep::Months(months) => {
                let elapsed = month_index(self.end.date_naive())
                    - month_index(self.start.date_naive());
                elapsed / i64::from(months.max(1))
            }
        };

        u64::try_from(buckets).unwrap_or(0).saturating_add(1)
    }
}

pub fn resolve_window(
    request: &WindowRequest,
    network: Option<&NetworkDescriptor>,
) -> Result<ResolvedWindow, WindowError> {
    let period = request.period;
    let interval = request.interval;

    let network_tz = network.map(NetworkDescriptor::timezone).transpose()?;
    if period.binding().is_some() && network_tz.is_none() {
        return Err(ConfigurationError::NetworkRequired("calendar-bound period").into());
    }
    let zone = network_tz.unwrap_or(NetworkTz::Fixed(*request.end.offset()));

    let nominal_start = zone.localize(request.start);
    let nominal_end = zone.localize(request.end);

    let (start, end) = match period.binding() {
        Some(binding) => binding_bounds(binding, &zone, nominal_end)?,
        None => span_bounds(&period, &interval, &zone, nominal_start, nominal_end)?,
    };

    let start = zone
        .truncate(start, interval.truncation())
        .ok_or_else(|| WindowError::OutOfRange(start.to_rfc3339()))?;

    let window = ResolvedWindow {
        start,
        end,
        truncation: interval.truncation(),
        interval,
    };

    debug!(
        component = "window",
        event = "window.resolve.finish",
        network = network.map(NetworkDescriptor::code).unwrap_or("-"),
        period = period.token(),
        interval = interval.token(),
        forecast = period.is_forecast(),
        start = %window.start.to_rfc3339(),
        end = %window.end.to_rfc3339(),
        length = window.length()
    );

    Ok(window)
}

/// Resolves a window over the data range reported by `lookup`. `Ok(None)` means the
/// network has no data for the filter.
pub fn resolve_window_from_range<L>(
    lookup: &L,
    filter: &RangeFilter,
    network: &NetworkDescriptor,
    interval: IntervalSpec,
    period: PeriodSpec,
) -> Result<Option<ResolvedWindow>, WindowError>
where
    L: AvailableRangeLookup + ?Sized,
{
    let Some(range) = lookup.available_range(network, filter) else {
        info!(
            component = "window",
            event = "window.range.missing",
            network = network.code(),
            network_region = filter.network_region.as_deref().unwrap_or("-")
        );
        return Ok(None);
    };

    let request = WindowRequest {
        start: range.start,
        end: range.end,
        interval,
        period,
    };
    resolve_window(&request, Some(network)).map(Some)
}

fn span_bounds(
    period: &PeriodSpec,
    interval: &IntervalSpec,
    zone: &NetworkTz,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), WindowError> {
    let out_of_range = || WindowError::OutOfRange(end.to_rfc3339());

    match (period.span(), period.is_forecast()) {
        (PeriodSpan::All, true) => Err(WindowError::UnboundedForecast(period.token())),
        (PeriodSpan::All, false) => {
            if interval.truncation() == Truncation::Month {
                let month_start = zone
                    .truncate(end, Truncation::Month)
                    .ok_or_else(out_of_range)?;
                Ok((start, month_start - ChronoDuration::seconds(1)))
            } else {
                Ok((start, end))
            }
        }
        (PeriodSpan::Minutes(minutes), forecast) => {
            let span = ChronoDuration::minutes(minutes);
            if forecast {
                let forward = end.checked_add_signed(span).ok_or_else(out_of_range)?;
                Ok((end, forward))
            } else {
                let back = end.checked_sub_signed(span).ok_or_else(out_of_range)?;
                Ok((back, end))
            }
        }
        (PeriodSpan::Months(months), forecast) => {
            if forecast {
                let forward = end
                    .checked_add_months(Months::new(months))
                    .ok_or_else(out_of_range)?;
                Ok((end, forward))
            } else {
                let back = end
                    .checked_sub_months(Months::new(months))
                    .ok_or_else(out_of_range)?;
                Ok((back, end))
            }
        }
    }
}

fn binding_bounds(
    binding: CalendarBinding,
    zone: &NetworkTz,
    end: DateTime<FixedOffset>,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), WindowError> {
    match binding {
        CalendarBinding::Year(year) => {
            let first = calendar_date(year, 1, 1)?;
            let last = calendar_date(year, 12, 31)?;
            Ok((
                local_at(zone, first.and_hms_opt(0, 0, 0))?,
                local_at(zone, last.and_hms_opt(23, 59, 59))?.min(end),
            ))
        }
        CalendarBinding::Month { year, month } => {
            let first = calendar_date(year, month, 1)?;
            let last = first
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .ok_or_else(|| WindowError::InvalidCalendar(format!("{year}-{month:02}")))?;
            Ok((
                local_at(zone, first.and_hms_opt(0, 0, 0))?,
                local_at(zone, last.and_hms_opt(23, 59, 59))?.min(end),
            ))
        }
        CalendarBinding::Week { year, week } => {
            if !(1..=54).contains(&week) {
                return Err(WindowError::InvalidCalendar(format!(
                    "week {week} of {year} is outside 1..=54"
                )));
            }
            let anchor = week_anchor(year, week - 1)?;
            let start = local_at(zone, anchor.and_hms_opt(0, 0, 0))?;
            let end = start
                .checked_add_signed(ChronoDuration::days(7))
                .ok_or_else(|| WindowError::OutOfRange(start.to_rfc3339()))?;
            Ok((start, end))
        }
    }
}

/// Monday of `%W` week `week_w` (0-based) of `year`. Week 0 may start in December of
/// the previous year.
pub fn week_anchor(year: i32, week_w: u32) -> Result<NaiveDate, WindowError> {
    let jan1 = calendar_date(year, 1, 1)?;
    let first_weekday = i64::from(jan1.weekday().num_days_from_monday());
    let week_0_length = (7 - first_weekday) % 7;

    let offset_days = if week_w == 0 {
        -first_weekday
    } else {
        week_0_length + 7 * (i64::from(week_w) - 1)
    };

    jan1.checked_add_signed(ChronoDuration::days(offset_days))
        .ok_or_else(|| WindowError::InvalidCalendar(format!("{year}-W{week_w}")))
}

fn calendar_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, WindowError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| WindowError::InvalidCalendar(format!("{year:04}-{month:02}-{day:02}")))
}

fn local_at(
    zone: &NetworkTz,
    naive: Option<NaiveDateTime>,
) -> Result<DateTime<FixedOffset>, WindowError> {
    let naive = naive.ok_or_else(|| WindowError::InvalidCalendar("invalid time".to_string()))?;
    zone.from_local(naive)
        .ok_or_else(|| WindowError::OutOfRange(naive.to_string()))
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}
