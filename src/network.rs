//! Network metadata and timezone resolution.
//!
//! A network's fixed UTC offset takes precedence over its named timezone. Stored
//! timestamps are naive wall-clock values on the network's own clock, so localizing
//! through the fixed offset avoids a second DST-aware conversion.

use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, FixedOffset, NaiveDate, NaiveDateTime,
    Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{interval_by_size, IntervalSpec, Truncation, UnknownUnitError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("network {network} has no resolvable timezone or fixed offset")]
    NoTimezone { network: String },
    #[error("unknown timezone '{timezone}' for network {network}")]
    UnknownTimezone { network: String, timezone: String },
    #[error("invalid fixed offset {offset_minutes} minutes for network {network}")]
    InvalidOffset { network: String, offset_minutes: i32 },
    #[error("invalid network config: {0}")]
    InvalidNetwork(String),
    #[error("unknown network code: {0}")]
    UnknownNetwork(String),
    #[error("{0} requires a network context")]
    NetworkRequired(&'static str),
}

/// Raw network settings, validated by [`NetworkDescriptor::new`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub code: String,
    pub country: String,
    pub label: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub offset_minutes: Option<i32>,
    pub interval_size: u32,
    #[serde(default)]
    pub interval_shift: u32,
    #[serde(default)]
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NetworkConfig", into = "NetworkConfig")]
pub struct NetworkDescriptor {
    config: NetworkConfig,
}

impl TryFrom<NetworkConfig> for NetworkDescriptor {
    type Error = ConfigurationError;

    fn try_from(config: NetworkConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl From<NetworkDescriptor> for NetworkConfig {
    fn from(descriptor: NetworkDescriptor) -> Self {
        descriptor.config
    }
}

impl NetworkDescriptor {
    pub fn new(config: NetworkConfig) -> Result<Self, ConfigurationError> {
        if config.code.trim().is_empty() {
            return Err(ConfigurationError::InvalidNetwork(
                "code must not be empty".to_string(),
            ));
        }
        if config.interval_size == 0 {
            return Err(ConfigurationError::InvalidNetwork(format!(
                "interval_size must be > 0 for network {}",
                config.code
            )));
        }

        let descriptor = Self { config };
        descriptor.timezone()?;
        Ok(descriptor)
    }

    pub fn code(&self) -> &str {
        &self.config.code
    }

    pub fn country(&self) -> &str {
        &self.config.country
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn timezone_name(&self) -> &str {
        &self.config.timezone
    }

    pub fn offset_minutes(&self) -> Option<i32> {
        self.config.offset_minutes
    }

    pub fn interval_size(&self) -> u32 {
        self.config.interval_size
    }

    pub fn interval_shift(&self) -> u32 {
        self.config.interval_shift
    }

    pub fn regions(&self) -> &[String] {
        &self.config.regions
    }

    pub fn has_region(&self, region: &str) -> bool {
        self.config
            .regions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(region))
    }

    pub fn intervals_per_hour(&self) -> f64 {
        60.0 / f64::from(self.config.interval_size)
    }

    /// Native trading interval of the network.
    pub fn interval(&self) -> Result<IntervalSpec, UnknownUnitError> {
        interval_by_size(self.config.interval_size)
    }

    pub fn fixed_offset(&self) -> Result<Option<FixedOffset>, ConfigurationError> {
        match self.config.offset_minutes {
            Some(offset_minutes) => offset_minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .map(Some)
                .ok_or_else(|| ConfigurationError::InvalidOffset {
                    network: self.config.code.clone(),
                    offset_minutes,
                }),
            None => Ok(None),
        }
    }

    pub fn timezone(&self) -> Result<NetworkTz, ConfigurationError> {
        let named = self.config.timezone.trim();
        let parsed_named = if named.is_empty() {
            None
        } else {
            Some(
                named
                    .parse::<Tz>()
                    .map_err(|_| ConfigurationError::UnknownTimezone {
                        network: self.config.code.clone(),
                        timezone: named.to_string(),
                    })?,
            )
        };

        if let Some(offset) = self.fixed_offset()? {
            return Ok(NetworkTz::Fixed(offset));
        }

        parsed_named
            .map(NetworkTz::Named)
            .ok_or_else(|| ConfigurationError::NoTimezone {
                network: self.config.code.clone(),
            })
    }

    fn builtin(
        code: &str,
        label: &str,
        timezone: &str,
        offset_minutes: i32,
        interval_size: u32,
        interval_shift: u32,
        regions: &[&str],
    ) -> Self {
        Self {
            config: NetworkConfig {
                code: code.to_string(),
                country: "au".to_string(),
                label: label.to_string(),
                timezone: timezone.to_string(),
                offset_minutes: Some(offset_minutes),
                interval_size,
                interval_shift,
                regions: regions.iter().map(|region| region.to_string()).collect(),
            },
        }
    }
}

/// Resolved clock of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkTz {
    Fixed(FixedOffset),
    Named(Tz),
}

impl NetworkTz {
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Converts an instant into this clock.
    pub fn from_utc(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Fixed(offset) => instant.with_timezone(offset),
            Self::Named(tz) => {
                let local = instant.with_timezone(tz);
                local.with_timezone(&local.offset().fix())
            }
        }
    }

    /// Re-expresses an aware timestamp in this clock.
    pub fn localize(&self, dt: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        self.from_utc(dt.with_timezone(&Utc))
    }

    /// Attaches this clock to a wall-clock value. Ambiguous times resolve to the
    /// earlier instant; times inside a DST gap move forward by an hour.
    pub fn from_local(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Fixed(offset) => offset.from_local_datetime(&naive).single(),
            Self::Named(tz) => {
                let local = tz.from_local_datetime(&naive).earliest().or_else(|| {
                    let shifted = naive.checked_add_signed(ChronoDuration::hours(1))?;
                    tz.from_local_datetime(&shifted).earliest()
                })?;
                Some(local.with_timezone(&local.offset().fix()))
            }
        }
    }

    /// Stamps a wall-clock value with this clock's offset at that time without moving
    /// it. Unlike [`Self::from_local`], a value inside a DST gap keeps its wall clock.
    pub fn attach(&self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        let offset = match self {
            Self::Fixed(offset) => *offset,
            Self::Named(tz) => tz
                .offset_from_local_datetime(&naive)
                .earliest()
                .unwrap_or_else(|| tz.offset_from_utc_datetime(&naive))
                .fix(),
        };
        offset.from_local_datetime(&naive).single()
    }

    pub fn at_midnight(&self, date: NaiveDate) -> Option<DateTime<FixedOffset>> {
        self.from_local(date.and_hms_opt(0, 0, 0)?)
    }

    /// Snaps to the start of the local day or month.
    pub fn truncate(
        &self,
        dt: DateTime<FixedOffset>,
        truncation: Truncation,
    ) -> Option<DateTime<FixedOffset>> {
        let local = self.localize(dt);
        match truncation {
            Truncation::None => Some(local),
            Truncation::Day => self.at_midnight(local.date_naive()),
            Truncation::Month => {
                self.at_midnight(NaiveDate::from_ymd_opt(local.year(), local.month(), 1)?)
            }
        }
    }
}

pub fn network_nem() -> NetworkDescriptor {
    NetworkDescriptor::builtin(
        "NEM",
        "NEM",
        "Australia/Brisbane",
        600,
        5,
        5,
        &["NSW1", "QLD1", "SA1", "TAS1", "VIC1"],
    )
}

pub fn network_wem() -> NetworkDescriptor {
    NetworkDescriptor::builtin("WEM", "WEM", "Australia/Perth", 480, 30, 0, &["WEM"])
}

pub fn network_apvi() -> NetworkDescriptor {
    NetworkDescriptor::builtin("APVI", "APVI", "Australia/Sydney", 600, 15, 0, &[])
}

/// NEM and WEM combined.
pub fn network_au() -> NetworkDescriptor {
    NetworkDescriptor::builtin("AU", "AU", "Australia/Sydney", 600, 30, 0, &[])
}

pub fn network_aemo_rooftop() -> NetworkDescriptor {
    NetworkDescriptor::builtin(
        "AEMO_ROOFTOP",
        "AEMO Rooftop",
        "Australia/Sydney",
        600,
        30,
        0,
        &[],
    )
}

pub fn builtin_networks() -> Vec<NetworkDescriptor> {
    vec![
        network_nem(),
        network_wem(),
        network_apvi(),
        network_au(),
        network_aemo_rooftop(),
    ]
}

pub fn network_by_code(code: &str) -> Result<NetworkDescriptor, ConfigurationError> {
    builtin_networks()
        .into_iter()
        .find(|network| network.code().eq_ignore_ascii_case(code.trim()))
        .ok_or_else(|| ConfigurationError::UnknownNetwork(code.to_string()))
}
