//! Unit-of-measure support for leaf literals
//!
//! A leaf literal may carry a unit suffix (`9.81 m`). Validation resolves
//! the suffix against the document's unit provider and rescales the value
//! into the owning equation's declared unit, or into the category's base
//! unit when the equation declares none. The provider is pluggable so a
//! host can bring its own unit system.

use std::f64::consts::PI;

/// Dimension a unit measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    Length,
    Mass,
    Time,
    Angle,
}

/// A resolved unit: symbol, dimension, and scale to the dimension's base
/// unit (metre, kilogram, second, radian)
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub symbol: String,
    pub category: UnitCategory,
    pub scale: f64,
}

/// Pluggable unit table
pub trait UnitProvider: Send + Sync {
    /// Parse a unit symbol, if this provider knows it
    fn parse_unit(&self, text: &str) -> Option<Unit>;

    /// Convert a value between two units of the same dimension.
    /// Returns `None` when the dimensions differ.
    fn convert(&self, value: f64, from: &Unit, to: &Unit) -> Option<f64> {
        if from.category == to.category {
            Some(value * from.scale / to.scale)
        } else {
            None
        }
    }
}

/// Default table covering the common SI symbols
#[derive(Debug, Default, Clone)]
pub struct StandardUnits;

impl UnitProvider for StandardUnits {
    fn parse_unit(&self, text: &str) -> Option<Unit> {
        let (category, scale) = match text {
            "m" => (UnitCategory::Length, 1.0),
            "km" => (UnitCategory::Length, 1000.0),
            "cm" => (UnitCategory::Length, 0.01),
            "mm" => (UnitCategory::Length, 0.001),

            "kg" => (UnitCategory::Mass, 1.0),
            "g" => (UnitCategory::Mass, 0.001),
            "mg" => (UnitCategory::Mass, 1e-6),
            "t" => (UnitCategory::Mass, 1000.0),

            "s" => (UnitCategory::Time, 1.0),
            "ms" => (UnitCategory::Time, 0.001),
            "min" => (UnitCategory::Time, 60.0),
            "h" => (UnitCategory::Time, 3600.0),

            "rad" => (UnitCategory::Angle, 1.0),
            "deg" | "°" => (UnitCategory::Angle, PI / 180.0),

            _ => return None,
        };
        Some(Unit {
            symbol: text.to_string(),
            category,
            scale,
        })
    }
}
