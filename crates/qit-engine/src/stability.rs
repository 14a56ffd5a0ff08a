use std::f64::consts::{PI, SQRT_2};

use qit_core::error::{QitError, QitResult};

pub const ELEMENTARY_CHARGE: f64 = 1.602176634e-19;
pub const ATOMIC_MASS_UNIT: f64 = 1.66053906660e-27;

/// `q_z` at the edge of the first stability region (no DC potential).
pub const Q_Z_STABILITY_LIMIT: f64 = 0.908;

/// Ring electrode radius of the simulated trap, in metres.
pub const DEFAULT_R0: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityParameters {
    pub q_z: f64,
    /// Pseudopotential well depth `D_z = q_z V / 8`, in volts.
    pub well_depth: f64,
    /// Low mass cut-off in amu.
    pub lmco: f64,
}

/// Mathieu `q_z` of an ideal quadrupole ion trap with `z0 = r0 / √2`.
///
/// `v_rf` is the RF amplitude in volts, `f_rf` the RF frequency in Hz.
pub fn qit_stability_parameters(
    mass_amu: f64,
    v_rf: f64,
    f_rf: f64,
    r0: f64,
) -> QitResult<StabilityParameters> {
    for (name, v) in [
        ("mass", mass_amu),
        ("rf amplitude", v_rf),
        ("rf frequency", f_rf),
        ("r0", r0),
    ] {
        if !(v > 0.0 && v.is_finite()) {
            return Err(QitError::Usage(format!("{name} must be positive, got {v}")));
        }
    }
    let z0 = r0 / SQRT_2;
    let omega = 2.0 * PI * f_rf;
    let geometry = (r0 * r0 + 2.0 * z0 * z0) * omega * omega;
    let q_per_mass = 8.0 * ELEMENTARY_CHARGE * v_rf / (geometry * ATOMIC_MASS_UNIT);
    let q_z = q_per_mass / mass_amu;
    Ok(StabilityParameters {
        q_z,
        well_depth: q_z * v_rf / 8.0,
        lmco: q_per_mass / Q_Z_STABILITY_LIMIT,
    })
}
