use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{QitError, QitResult};

/// Flat key/value record describing one simulation run.
///
/// Only read for labelling and parameterising derived quantities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationConfig {
    entries: Map<String, Value>,
}

impl SimulationConfig {
    pub fn from_json_str(content: &str) -> QitResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.entries.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn require_f64(&self, key: &str) -> QitResult<f64> {
        self.get_f64(key)
            .ok_or_else(|| QitError::Parse(format!("config key '{key}' missing or not numeric")))
    }

    pub fn background_pressure(&self) -> QitResult<f64> {
        self.require_f64("background_pressure")
    }

    pub fn collision_gas_mass_amu(&self) -> QitResult<f64> {
        self.require_f64("collision_gas_mass_amu")
    }

    pub fn space_charge_factor(&self) -> Option<f64> {
        self.get_f64("space_charge_factor")
    }

    pub fn geometry_mode(&self) -> Option<&str> {
        self.get_str("geometry_mode")
    }

    /// Title line for analysis output of `project_name`.
    pub fn title(&self, project_name: &str) -> QitResult<String> {
        let pressure = self.raw("background_pressure")?;
        match self.space_charge_factor() {
            Some(scf) => {
                let gas_mass = self.raw("collision_gas_mass_amu")?;
                Ok(format!(
                    "{project_name} p:{pressure} Pa, c gas mass:{gas_mass} amu, space charge factor:{}",
                    format_general(scf, 6)
                ))
            }
            None => Ok(format!("{project_name} p:{pressure} Pa")),
        }
    }

    fn raw(&self, key: &str) -> QitResult<String> {
        match self.entries.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) if n.is_f64() => {
                Ok(n.as_f64().map(float_repr).unwrap_or_else(|| n.to_string()))
            }
            Some(v) => Ok(v.to_string()),
            None => Err(QitError::Parse(format!("config key '{key}' missing"))),
        }
    }
}

/// `%{width}g` formatting: six significant digits, trailing zeros dropped.
fn format_general(value: f64, width: usize) -> String {
    let body = if value == 0.0 || !value.is_finite() {
        value.to_string()
    } else {
        let sci = format!("{value:.5e}");
        let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        if !(-4..6).contains(&exp) {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
        } else {
            let decimals = (5 - exp).max(0) as usize;
            trim_fraction(&format!("{value:.decimals$}")).to_string()
        }
    };
    format!("{body:>width$}")
}

/// Shortest round-trip float text as written by the simulation tooling:
/// positional for decimal exponents in `-4..16` (always with a fraction),
/// scientific with a signed two digit exponent otherwise.
fn float_repr(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string().to_lowercase();
    }
    let sci = format!("{value:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if value == 0.0 || (-4..16).contains(&exp) {
        let positional = value.to_string();
        if positional.contains('.') {
            positional
        } else {
            format!("{positional}.0")
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
