use ndarray::{ArrayView2, Axis};

use crate::error::{QitError, QitResult};
use crate::trajectory::{Positions, StepArrays, Trajectory, CHEMICAL_ID_ATTRIBUTE};

/// A scalar per-particle parameter used to pick particles.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValues {
    /// One value per particle, valid at every step.
    Constant(Vec<f64>),
    /// One value per particle per step, `[step][particle]`.
    PerStep(Vec<Vec<f64>>),
}

/// Keeps the particles whose parameter equals `value` exactly.
///
/// A constant parameter keeps a dense input dense (the same particles are
/// dropped from every step). A per-step parameter always yields one block per
/// step since the matching set can change between steps.
pub fn filter_parameter(
    positions: &Positions,
    parameter: &ParameterValues,
    value: f64,
) -> QitResult<Positions> {
    match (positions, parameter) {
        (StepArrays::Dense(arr), ParameterValues::Constant(values)) => {
            let n_particles = arr.len_of(Axis(0));
            check_len(values.len(), n_particles, None)?;
            let keep = matching_rows(values, value);
            Ok(StepArrays::Dense(arr.select(Axis(0), &keep)))
        }
        (_, ParameterValues::Constant(values)) => {
            let keep = matching_rows(values, value);
            let mut out = Vec::with_capacity(positions.n_steps());
            for (step, block) in positions.steps().enumerate() {
                check_len(values.len(), block.nrows(), Some(step))?;
                out.push(block.select(Axis(0), &keep));
            }
            Ok(StepArrays::PerStep(out))
        }
        (_, ParameterValues::PerStep(values)) => {
            if values.len() != positions.n_steps() {
                return Err(QitError::Validation(format!(
                    "parameter covers {} steps, positions have {}",
                    values.len(),
                    positions.n_steps()
                )));
            }
            let mut out = Vec::with_capacity(values.len());
            for (step, (block, step_values)) in positions.steps().zip(values).enumerate() {
                out.push(filter_block(block, step_values, value, step)?);
            }
            Ok(StepArrays::PerStep(out))
        }
    }
}

fn filter_block(
    block: ArrayView2<'_, f64>,
    values: &[f64],
    value: f64,
    step: usize,
) -> QitResult<ndarray::Array2<f64>> {
    check_len(values.len(), block.nrows(), Some(step))?;
    Ok(block.select(Axis(0), &matching_rows(values, value)))
}

// Exact comparison: species ids and discretised masses are stored exactly.
fn matching_rows(values: &[f64], value: f64) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v == value)
        .map(|(i, _)| i)
        .collect()
}

fn check_len(n_values: usize, n_particles: usize, step: Option<usize>) -> QitResult<()> {
    if n_values == n_particles {
        return Ok(());
    }
    let at = step.map(|s| format!(" at step {s}")).unwrap_or_default();
    Err(QitError::Validation(format!(
        "{n_values} parameter values for {n_particles} particles{at}"
    )))
}

/// Positions of the particles with the given mass.
pub fn filter_mass(trajectory: &Trajectory, mass: f64) -> QitResult<Positions> {
    let masses = trajectory
        .masses()
        .ok_or_else(|| QitError::Usage("trajectory carries no particle masses".into()))?;
    filter_parameter(
        trajectory.positions(),
        &ParameterValues::Constant(masses.to_vec()),
        mass,
    )
}

/// Picks one species out of a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeciesSelector {
    Mass(f64),
    /// Matches the `chemical id` attribute.
    Substance(f64),
    Attribute { name: String, value: f64 },
}

impl SpeciesSelector {
    pub fn select_positions(&self, trajectory: &Trajectory) -> QitResult<Positions> {
        match self {
            SpeciesSelector::Mass(mass) => filter_mass(trajectory, *mass),
            SpeciesSelector::Substance(id) => filter_parameter(
                trajectory.positions(),
                &trajectory.attribute_values(CHEMICAL_ID_ATTRIBUTE)?,
                *id,
            ),
            SpeciesSelector::Attribute { name, value } => filter_parameter(
                trajectory.positions(),
                &trajectory.attribute_values(name)?,
                *value,
            ),
        }
    }
}
