//! Unit definitions attached to emitted series.

use serde::{Deserialize, Serialize};

use crate::catalog::UnknownUnitError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub name: String,
    #[serde(default)]
    pub name_alias: Option<String>,
    pub unit: String,
    pub unit_type: String,
    /// Forces trailing-null casting even for temperature units.
    #[serde(default)]
    pub cast_nulls: bool,
}

impl UnitDefinition {
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        unit_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            name_alias: None,
            unit: unit.into(),
            unit_type: unit_type.into(),
            cast_nulls: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.name_alias = Some(alias.into());
        self
    }

    pub fn with_cast_nulls(mut self, cast_nulls: bool) -> Self {
        self.cast_nulls = cast_nulls;
        self
    }

    pub fn is_temperature(&self) -> bool {
        self.name.starts_with("temperature")
    }

    /// Alias when present, otherwise the name.
    pub fn id_label(&self) -> &str {
        self.name_alias.as_deref().unwrap_or(&self.name)
    }
}

pub fn unit_power() -> UnitDefinition {
    UnitDefinition::new("power", "MW", "power")
}

pub fn unit_energy() -> UnitDefinition {
    UnitDefinition::new("energy", "MWh", "energy")
}

pub fn unit_energy_giga() -> UnitDefinition {
    UnitDefinition::new("energy_giga", "GWh", "energy").with_alias("energy")
}

pub fn unit_price() -> UnitDefinition {
    UnitDefinition::new("price", "$/MWh", "price")
}

pub fn unit_market_value() -> UnitDefinition {
    UnitDefinition::new("market_value", "$", "market_value")
}

pub fn unit_emissions() -> UnitDefinition {
    UnitDefinition::new("emissions", "tCO2e", "emissions")
}

pub fn unit_demand() -> UnitDefinition {
    UnitDefinition::new("demand", "MW", "demand")
}

pub fn unit_temperature() -> UnitDefinition {
    UnitDefinition::new("temperature", "C", "temperature")
}

pub fn unit_temperature_mean() -> UnitDefinition {
    UnitDefinition::new("temperature_mean", "C", "temperature").with_alias("temperature_mean")
}

pub fn unit_temperature_min() -> UnitDefinition {
    UnitDefinition::new("temperature_min", "C", "temperature").with_alias("temperature_min")
}

pub fn unit_temperature_max() -> UnitDefinition {
    UnitDefinition::new("temperature_max", "C", "temperature").with_alias("temperature_max")
}

pub fn resolve_unit(name: &str) -> Result<UnitDefinition, UnknownUnitError> {
    match name.trim() {
        "power" => Ok(unit_power()),
        "energy" => Ok(unit_energy()),
        "energy_giga" => Ok(unit_energy_giga()),
        "price" => Ok(unit_price()),
        "market_value" => Ok(unit_market_value()),
        "emissions" => Ok(unit_emissions()),
        "demand" => Ok(unit_demand()),
        "temperature" => Ok(unit_temperature()),
        "temperature_mean" => Ok(unit_temperature_mean()),
        "temperature_min" => Ok(unit_temperature_min()),
        "temperature_max" => Ok(unit_temperature_max()),
        other => Err(UnknownUnitError::Unit(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_units_are_detected_by_name_prefix() {
        assert!(unit_temperature().is_temperature());
        assert!(unit_temperature_mean().is_temperature());
        assert!(!unit_power().is_temperature());
        assert!(!unit_emissions().is_temperature());
    }

    #[test]
    fn id_label_prefers_alias() {
        assert_eq!(unit_energy_giga().id_label(), "energy");
        assert_eq!(unit_price().id_label(), "price");
    }

    #[test]
    fn resolve_unit_rejects_unknown_names() {
        assert_eq!(resolve_unit("market_value").unwrap().unit, "$");
        assert_eq!(
            resolve_unit("wind_speed").unwrap_err(),
            UnknownUnitError::Unit("wind_speed".to_string())
        );
    }
}
