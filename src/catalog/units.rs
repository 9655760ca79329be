//! Native measurement units
//!
//! Every quantity the store reports carries one of these units. Conversion
//! is only defined within a dimension; asking for meters from a calorie
//! quantity is an error, not a silent zero.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical dimension of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Count,
    Length,
    Energy,
    Time,
}

/// Unit of a reported quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Dimensionless count
    Count,
    Meter,
    Kilometer,
    Kilocalorie,
    Kilojoule,
    Second,
    Minute,
    Hour,
}

impl Unit {
    /// Dimension this unit measures
    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Count => Dimension::Count,
            Unit::Meter | Unit::Kilometer => Dimension::Length,
            Unit::Kilocalorie | Unit::Kilojoule => Dimension::Energy,
            Unit::Second | Unit::Minute | Unit::Hour => Dimension::Time,
        }
    }

    /// Factor that converts one of this unit into the dimension's base unit
    /// (count, meter, kilocalorie, second)
    fn base_factor(&self) -> f64 {
        match self {
            Unit::Count => 1.0,
            Unit::Meter => 1.0,
            Unit::Kilometer => 1000.0,
            Unit::Kilocalorie => 1.0,
            Unit::Kilojoule => 1.0 / 4.184,
            Unit::Second => 1.0,
            Unit::Minute => 60.0,
            Unit::Hour => 3600.0,
        }
    }

    /// Convert `value` expressed in `self` into `target`.
    ///
    /// Returns `None` when the units measure different dimensions.
    pub fn convert(&self, value: f64, target: Unit) -> Option<f64> {
        if self.dimension() != target.dimension() {
            return None;
        }
        if *self == target {
            return Some(value);
        }
        Some(value * self.base_factor() / target.base_factor())
    }

    /// Short symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Count => "count",
            Unit::Meter => "m",
            Unit::Kilometer => "km",
            Unit::Kilocalorie => "kcal",
            Unit::Kilojoule => "kJ",
            Unit::Second => "s",
            Unit::Minute => "min",
            Unit::Hour => "hr",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A value together with the unit it was recorded in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Value of this quantity expressed in `unit`
    pub fn value_in(&self, unit: Unit) -> Option<f64> {
        self.unit.convert(self.value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_unit_is_identity() {
        assert_eq!(Unit::Meter.convert(12.5, Unit::Meter), Some(12.5));
    }

    #[test]
    fn test_time_conversion() {
        let minutes = Quantity::new(150.0, Unit::Minute);
        assert_eq!(minutes.value_in(Unit::Hour), Some(2.5));
        assert_eq!(minutes.value_in(Unit::Second), Some(9000.0));
    }

    #[test]
    fn test_length_and_energy_conversion() {
        assert_eq!(Unit::Kilometer.convert(1.2, Unit::Meter), Some(1200.0));
        let kcal = Unit::Kilojoule.convert(4.184, Unit::Kilocalorie).unwrap();
        assert!((kcal - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cross_dimension_rejected() {
        assert_eq!(Unit::Meter.convert(1.0, Unit::Kilocalorie), None);
        assert_eq!(Unit::Count.convert(1.0, Unit::Hour), None);
    }
}
