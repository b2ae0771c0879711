//! Document-level calculation settings
//!
//! Hosts persist these alongside their document; every knob has a default
//! tuned for interactive use.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcSettings {
    /// Significant digits used when rendering results as text
    pub significant_digits: usize,

    /// When true, two equations may share a name and arity; a link then
    /// binds to the nearest preceding definition. When false, names are
    /// unique and lookups search the whole document.
    pub allow_redefinition: bool,

    /// Implicit sampling step for definite integrals given plain min/max
    /// bounds (interval-driven integrals take the interval's own step)
    pub integral_step: f64,

    /// Step h for central-difference numerical differentiation
    pub derivative_step: f64,

    /// Upper bound on array dimensions accepted during validation
    pub max_array_dimension: usize,

    /// Upper bound on total materialized array cells per equation
    pub max_array_points: usize,
}

impl Default for CalcSettings {
    fn default() -> Self {
        Self {
            significant_digits: 6,
            allow_redefinition: false,
            integral_step: 1e-3,
            derivative_step: 1e-6,
            max_array_dimension: 3,
            max_array_points: 1_000_000,
        }
    }
}
