//! Folds raw per-group rows into trimmed output series.
//!
//! Per group: last write wins on duplicate timestamps, all-null groups are dropped,
//! the trailing null run is forward-filled from the last known value (unless the unit
//! is a temperature without a cast override, or casting is disabled), and nulls are
//! trimmed from both ends. Interior gaps stay as nulls at native cadence.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::Truncation;
use crate::network::{ConfigurationError, NetworkDescriptor, NetworkTz};
use crate::output::{OutputSeries, OutputSet, SeriesHistory};
use crate::units::UnitDefinition;
use crate::window::ResolvedWindow;

pub const OUTPUT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    /// Wall-clock timestamp as stored.
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
    pub group: String,
    #[serde(default)]
    pub extra: Vec<Option<f64>>,
}

impl RawPoint {
    pub fn new(timestamp: NaiveDateTime, value: Option<f64>, group: impl Into<String>) -> Self {
        Self {
            timestamp,
            value,
            group: group.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, extra: Vec<Option<f64>>) -> Self {
        self.extra = extra;
        self
    }

    fn column(&self, column: ValueColumn) -> Option<f64> {
        match column {
            ValueColumn::Primary => self.value,
            ValueColumn::Extra(index) => self.extra.get(index).copied().flatten(),
        }
    }
}

/// Which value of a [`RawPoint`] feeds the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueColumn {
    #[default]
    Primary,
    Extra(usize),
}

#[derive(Debug, Clone)]
pub struct AggregateOptions<'a> {
    pub network: Option<&'a NetworkDescriptor>,
    /// Clock used when no network is given.
    pub timezone: Option<FixedOffset>,
    pub code: Option<String>,
    pub region: Option<String>,
    pub include_group_code: bool,
    pub fueltech_group: bool,
    pub group_field: Option<String>,
    pub data_id: Option<String>,
    /// `true`: stored timestamps are resolved on the network clock (DST gaps shift
    /// forward). `false`: the clock's offset is attached as is.
    pub localize: bool,
    pub include_code: bool,
    pub cast_nulls: bool,
    pub value_column: ValueColumn,
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for AggregateOptions<'_> {
    fn default() -> Self {
        Self {
            network: None,
            timezone: None,
            code: None,
            region: None,
            include_group_code: false,
            fueltech_group: false,
            group_field: None,
            data_id: None,
            localize: true,
            include_code: true,
            cast_nulls: true,
            value_column: ValueColumn::Primary,
            created_at: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("timestamp {0} cannot be expressed on the output clock")]
    InvalidTimestamp(NaiveDateTime),
}

/// Returns `Ok(None)` when no group has a single non-null value.
pub fn aggregate(
    points: &[RawPoint],
    window: &ResolvedWindow,
    units: &UnitDefinition,
    options: &AggregateOptions<'_>,
) -> Result<Option<OutputSet>, AggregateError> {
    let zone = output_zone(options)?;
    let interval = window.interval();
    let should_cast = (!units.is_temperature() || units.cast_nulls) && options.cast_nulls;

    info!(
        component = "aggregate",
        event = "aggregate.start",
        points = points.len(),
        unit = %units.name,
        interval = interval.token(),
        network = options.network.map(NetworkDescriptor::code).unwrap_or("-"),
        cast_nulls = should_cast
    );

    let groups = group_points(points, options.value_column);
    let mut skipped_groups = 0usize;
    let mut series = Vec::with_capacity(groups.len());

    for (group_code, rows) in &groups {
        let (timestamps, mut values): (Vec<NaiveDateTime>, Vec<Option<f64>>) =
            rows.iter().map(|(ts, value)| (*ts, *value)).unzip();

        if values.iter().all(Option::is_none) {
            debug!(
                component = "aggregate",
                event = "aggregate.group.skipped_null",
                group = %group_code,
                rows = values.len()
            );
            skipped_groups += 1;
            continue;
        }

        if should_cast {
            cast_trailing_nulls(&mut values);
        }

        let Some((first, last)) = non_null_bounds(&values) else {
            skipped_groups += 1;
            continue;
        };

        let truncation = window.truncation();
        let start = place_on_clock(timestamps[first], &zone, options.localize, truncation)?;
        let end = place_on_clock(timestamps[last], &zone, options.localize, truncation)?;

        series.push(OutputSeries {
            id: series_id(group_code, units, options),
            data_type: units.unit_type.clone(),
            code: options.include_code.then(|| group_code.to_string()),
            units: units.unit.clone(),
            network: options.network.map(|network| network.code().to_lowercase()),
            region: options.region.clone(),
            fuel_tech: options.fueltech_group.then(|| group_code.to_string()),
            history: SeriesHistory {
                start,
                last: end,
                interval: interval.token().to_string(),
                data: values[first..=last].to_vec(),
            },
        });
    }

    if series.is_empty() {
        info!(
            component = "aggregate",
            event = "aggregate.empty",
            groups = groups.len(),
            skipped_groups
        );
        return Ok(None);
    }

    let created_at = zone.from_utc(options.created_at.unwrap_or_else(Utc::now));
    let code = options
        .code
        .clone()
        .or_else(|| options.region.clone())
        .or_else(|| options.network.map(|network| network.code().to_string()));

    info!(
        component = "aggregate",
        event = "aggregate.finish",
        groups = groups.len(),
        series = series.len(),
        skipped_groups
    );

    Ok(Some(OutputSet {
        data_type: units.unit_type.clone(),
        code: if options.include_code { code } else { None },
        network: options.network.map(|network| network.code().to_string()),
        region: options.region.clone(),
        created_at,
        version: OUTPUT_VERSION.to_string(),
        data: series,
    }))
}

/// Replaces the trailing run of nulls with the last non-null value.
pub fn cast_trailing_nulls(values: &mut [Option<f64>]) {
    let Some(last_known) = values.iter().rposition(Option::is_some) else {
        return;
    };
    let fill = values[last_known];
    for value in &mut values[last_known + 1..] {
        *value = fill;
    }
}

/// Slice between the first and last non-null values, inclusive.
pub fn trim_nulls(values: &[Option<f64>]) -> &[Option<f64>] {
    match non_null_bounds(values) {
        Some((first, last)) => &values[first..=last],
        None => &[],
    }
}

fn non_null_bounds(values: &[Option<f64>]) -> Option<(usize, usize)> {
    let first = values.iter().position(Option::is_some)?;
    let last = values.iter().rposition(Option::is_some)?;
    Some((first, last))
}

fn group_points(
    points: &[RawPoint],
    column: ValueColumn,
) -> BTreeMap<&str, BTreeMap<NaiveDateTime, Option<f64>>> {
    let mut groups: BTreeMap<&str, BTreeMap<NaiveDateTime, Option<f64>>> = BTreeMap::new();
    for point in points {
        if point.group.is_empty() {
            continue;
        }
        groups
            .entry(point.group.as_str())
            .or_default()
            .insert(point.timestamp, point.column(column));
    }
    groups
}

fn output_zone(options: &AggregateOptions<'_>) -> Result<NetworkTz, ConfigurationError> {
    match (options.network, options.timezone) {
        (Some(network), _) => network.timezone(),
        (None, Some(offset)) => Ok(NetworkTz::Fixed(offset)),
        (None, None) => Ok(NetworkTz::utc()),
    }
}

fn place_on_clock(
    naive: NaiveDateTime,
    zone: &NetworkTz,
    localize: bool,
    truncation: Truncation,
) -> Result<DateTime<FixedOffset>, AggregateError> {
    let aware = if localize {
        zone.from_local(naive)
    } else {
        zone.attach(naive)
    }
    .ok_or(AggregateError::InvalidTimestamp(naive))?;
    zone.truncate(aware, truncation)
        .ok_or(AggregateError::InvalidTimestamp(naive))
}

fn series_id(group_code: &str, units: &UnitDefinition, options: &AggregateOptions<'_>) -> String {
    if let Some(data_id) = &options.data_id {
        return data_id.clone();
    }

    let network_code = options.network.map(|network| network.code().to_lowercase());
    let region = distinct_region(options);
    let group_lower = group_code.to_lowercase();

    if options.fueltech_group {
        return join_id(&[
            network_code.as_deref(),
            region.as_deref(),
            Some("fuel_tech"),
            Some(group_code),
            Some(units.unit_type.as_str()),
        ])
        .to_lowercase();
    }

    if let Some(group_field) = &options.group_field {
        let country = options.network.map(|network| network.country().to_lowercase());
        let unit_label = units.name_alias.as_deref().unwrap_or(&units.unit_type);
        let (group_part, field_part) = if options.include_group_code {
            (Some(group_lower.as_str()), Some(group_field.as_str()))
        } else {
            (None, None)
        };
        return join_id(&[
            country.as_deref(),
            network_code.as_deref(),
            region.as_deref(),
            Some(unit_label),
            group_part,
            field_part,
        ]);
    }

    join_id(&[
        network_code.as_deref(),
        region.as_deref(),
        Some(group_lower.as_str()),
        Some(units.id_label()),
    ])
}

/// Region, lower-cased, unless it just repeats the network code.
fn distinct_region(options: &AggregateOptions<'_>) -> Option<String> {
    let region = options.region.as_deref()?.to_lowercase();
    match options.network {
        Some(network) if network.code().eq_ignore_ascii_case(&region) => None,
        _ => Some(region),
    }
}

fn join_id(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_cast_then_trim() {
        let mut values = vec![None, None, Some(5.0), None, Some(7.0), None, None];
        cast_trailing_nulls(&mut values);
        assert_eq!(
            values,
            vec![None, None, Some(5.0), None, Some(7.0), Some(7.0), Some(7.0)]
        );
        assert_eq!(
            trim_nulls(&values),
            &[Some(5.0), None, Some(7.0), Some(7.0), Some(7.0)]
        );
    }

    #[test]
    fn trim_without_cast_drops_trailing_nulls() {
        let values = vec![None, Some(1.0), None, Some(2.0), None];
        assert_eq!(trim_nulls(&values), &[Some(1.0), None, Some(2.0)]);
        assert!(trim_nulls(&[None, None]).is_empty());
    }

    #[test]
    fn cast_is_noop_for_all_null_or_no_trailing_nulls() {
        let mut all_null = vec![None, None];
        cast_trailing_nulls(&mut all_null);
        assert_eq!(all_null, vec![None, None]);

        let mut dense = vec![Some(1.0), None, Some(2.0)];
        cast_trailing_nulls(&mut dense);
        assert_eq!(dense, vec![Some(1.0), None, Some(2.0)]);
    }

    #[test]
    fn join_id_skips_missing_and_empty_parts() {
        assert_eq!(
            join_id(&[Some("nem"), None, Some(""), Some("wind"), Some("power")]),
            "nem.wind.power"
        );
        assert_eq!(join_id(&[None, None]), "");
    }

    #[test]
    fn extra_columns_are_selectable() {
        let ts = NaiveDateTime::parse_from_str("2021-01-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let point = RawPoint::new(ts, Some(1.0), "wind").with_extra(vec![Some(2.0), None]);

        assert_eq!(point.column(ValueColumn::Primary), Some(1.0));
        assert_eq!(point.column(ValueColumn::Extra(0)), Some(2.0));
        assert_eq!(point.column(ValueColumn::Extra(1)), None);
        assert_eq!(point.column(ValueColumn::Extra(5)), None);
    }
}
