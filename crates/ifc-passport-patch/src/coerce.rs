// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit-aware value coercion
//!
//! Maps a (unit token, raw text) pair from the mapping table to a typed IFC
//! value. Numeric parsing is attempted first; when it fails the value
//! degrades to an opaque label regardless of the declared unit.

use ifc_passport_model::AttributeValue;

/// Typed value produced by coercion
#[derive(Clone, Debug, PartialEq)]
pub enum IfcValue {
    /// W/mK and equivalents
    ThermalConductivity(f64),
    /// kg/m3 and equivalents
    MassDensity(f64),
    /// Environmental indicators and dimensionless values
    Real(f64),
    /// mm, m
    PositiveLength(f64),
    /// Anything non-numeric, or an unrecognized unit
    Label(String),
}

impl IfcValue {
    /// Render to the STEP typed value stored as a property NominalValue
    pub fn to_attribute(&self) -> AttributeValue {
        let (type_name, arg) = match self {
            IfcValue::ThermalConductivity(v) => {
                ("IFCTHERMALCONDUCTIVITYMEASURE", AttributeValue::Float(*v))
            }
            IfcValue::MassDensity(v) => ("IFCMASSDENSITYMEASURE", AttributeValue::Float(*v)),
            IfcValue::Real(v) => ("IFCREAL", AttributeValue::Float(*v)),
            IfcValue::PositiveLength(v) => {
                ("IFCPOSITIVELENGTHMEASURE", AttributeValue::Float(*v))
            }
            IfcValue::Label(s) => ("IFCLABEL", AttributeValue::string(s.clone())),
        };
        AttributeValue::TypedValue(type_name.to_string(), vec![arg])
    }
}

/// Thermal conductivity unit spellings (after normalization)
const THERMAL_UNITS: &[&str] = &["w/mk", "w/m/k", "w m-1 k-1"];

/// Mass density unit spellings
const DENSITY_UNITS: &[&str] = &["kg/m3", "kg/m^3", "kg m-3"];

/// Environmental indicator units, matched with internal whitespace stripped
const INDICATOR_UNITS: &[&str] = &[
    "kgco2e", "kgco2eq", "kgso2e", "kgcfc-11e", "kgpo4e", "mje", "mjd", "mj", "kj",
];

/// Length units
const LENGTH_UNITS: &[&str] = &["mm", "m"];

/// Normalize a unit token: trim, lowercase, ASCII-fold cubic and middle-dot
/// glyphs
fn normalize_unit(unit: &str) -> String {
    unit.trim()
        .to_lowercase()
        .replace('³', "3")
        .replace('·', "/")
}

/// Coerce a (unit, raw text) pair into a typed value
pub fn coerce_value(unit: &str, raw: &str) -> IfcValue {
    let text = raw.trim();
    let number: Option<f64> = text.parse().ok();
    let u = normalize_unit(unit);

    if let Some(n) = number {
        if THERMAL_UNITS.contains(&u.as_str()) {
            return IfcValue::ThermalConductivity(n);
        }
        if DENSITY_UNITS.contains(&u.as_str()) {
            return IfcValue::MassDensity(n);
        }
        let squeezed: String = u.chars().filter(|c| !c.is_whitespace()).collect();
        if INDICATOR_UNITS.contains(&squeezed.as_str()) {
            return IfcValue::Real(n);
        }
        if LENGTH_UNITS.contains(&u.as_str()) {
            return IfcValue::PositiveLength(n);
        }
        if u.is_empty() || u == "-" {
            return IfcValue::Real(n);
        }
    }

    IfcValue::Label(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_numeric_is_mass_density() {
        assert_eq!(coerce_value("kg/m3", "35"), IfcValue::MassDensity(35.0));
        assert_eq!(coerce_value("kg/m³", " 470.0 "), IfcValue::MassDensity(470.0));
    }

    #[test]
    fn test_thermal_conductivity_spellings() {
        assert_eq!(
            coerce_value("W/mK", "0.035"),
            IfcValue::ThermalConductivity(0.035)
        );
        assert_eq!(
            coerce_value("w/m·k", "0.035"),
            IfcValue::ThermalConductivity(0.035)
        );
    }

    #[test]
    fn test_indicator_units_are_plain_reals() {
        assert_eq!(coerce_value("kg CO2e", "1.92"), IfcValue::Real(1.92));
        assert_eq!(coerce_value("MJ", "27.4"), IfcValue::Real(27.4));
    }

    #[test]
    fn test_length_units() {
        assert_eq!(coerce_value("mm", "110"), IfcValue::PositiveLength(110.0));
    }

    #[test]
    fn test_dimensionless() {
        assert_eq!(coerce_value("-", "0.8"), IfcValue::Real(0.8));
        assert_eq!(coerce_value("", "0.8"), IfcValue::Real(0.8));
    }

    #[test]
    fn test_non_numeric_degrades_to_label_regardless_of_unit() {
        assert_eq!(
            coerce_value("kg/m3", "GL24h"),
            IfcValue::Label("GL24h".to_string())
        );
        assert_eq!(
            coerce_value("", "A1 (non-combustible)"),
            IfcValue::Label("A1 (non-combustible)".to_string())
        );
    }

    #[test]
    fn test_unknown_unit_is_label_even_when_numeric() {
        assert_eq!(coerce_value("psi", "42"), IfcValue::Label("42".to_string()));
    }

    #[test]
    fn test_to_attribute_rendering() {
        let mut out = String::new();
        IfcValue::MassDensity(35.0).to_attribute().encode_step(&mut out);
        assert_eq!(out, "IFCMASSDENSITYMEASURE(35.)");
    }
}
