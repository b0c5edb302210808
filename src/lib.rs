//! Energy-market time-series windows and aggregation.
//!
//! Current implemented scope:
//! - interval, period, unit and network catalogs
//! - timezone-aware query window resolution over an injected range lookup
//! - per-group aggregation into trimmed, publishable series sets

mod aggregate;
mod catalog;
mod network;
mod observability;
mod output;
mod range;
mod units;
mod window;

pub use aggregate::{
    aggregate, cast_trailing_nulls, trim_nulls, AggregateError, AggregateOptions, RawPoint,
    ValueColumn, OUTPUT_VERSION,
};
pub use catalog::{
    interval_by_size, resolve_interval, resolve_period, CalendarBinding, IntervalSpec,
    IntervalStep, PeriodSpan, PeriodSpec, Truncation, UnknownUnitError, INTERVALS, PERIODS,
};
pub use network::{
    builtin_networks, network_aemo_rooftop, network_apvi, network_au, network_by_code,
    network_nem, network_wem, ConfigurationError, NetworkConfig, NetworkDescriptor, NetworkTz,
};
pub use observability::{
    init_logging, init_logging_from_env, log_app_start, log_output_set, logging_config_from_env,
    LogFormat, LoggingConfig, LoggingInitError,
};
pub use output::{OutputSeries, OutputSet, SeriesHistory};
pub use range::{
    AvailableRangeLookup, CachedRangeLookup, DataRange, InMemoryRangeLookup, RangeFilter,
};
pub use units::{
    resolve_unit, unit_demand, unit_emissions, unit_energy, unit_energy_giga, unit_market_value,
    unit_power, unit_price, unit_temperature, unit_temperature_max, unit_temperature_mean,
    unit_temperature_min, UnitDefinition,
};
pub use window::{
    resolve_window, resolve_window_from_range, week_anchor, ResolvedWindow, WindowError,
    WindowRequest,
};
