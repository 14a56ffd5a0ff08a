use std::collections::HashSet;

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::{QitError, QitResult};
use crate::filter::ParameterValues;

/// Attribute label carrying the chemical species of a particle.
pub const CHEMICAL_ID_ATTRIBUTE: &str = "chemical id";

/// Number of spatial axes of a position record.
pub const SPATIAL_DIMS: usize = 3;

/// Per-step particle data, either one dense block or one block per step.
///
/// `Dense` is indexed `[particle, column, step]` and is used when the particle
/// count never changes. `PerStep` holds one `[particle, column]` block per step
/// so the particle count may differ between steps.
#[derive(Debug, Clone, PartialEq)]
pub enum StepArrays {
    Dense(Array3<f64>),
    PerStep(Vec<Array2<f64>>),
}

pub type Positions = StepArrays;
pub type Attributes = StepArrays;

impl StepArrays {
    pub fn n_steps(&self) -> usize {
        match self {
            StepArrays::Dense(arr) => arr.len_of(Axis(2)),
            StepArrays::PerStep(steps) => steps.len(),
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, StepArrays::Dense(_))
    }

    /// Rows (particles) present at `step`.
    pub fn n_rows(&self, step: usize) -> Option<usize> {
        match self {
            StepArrays::Dense(arr) => (step < arr.len_of(Axis(2))).then(|| arr.len_of(Axis(0))),
            StepArrays::PerStep(steps) => steps.get(step).map(|s| s.nrows()),
        }
    }

    /// Width of the column axis, `None` for an empty per-step sequence.
    pub fn n_cols(&self) -> Option<usize> {
        match self {
            StepArrays::Dense(arr) => Some(arr.len_of(Axis(1))),
            StepArrays::PerStep(steps) => steps.first().map(|s| s.ncols()),
        }
    }

    /// The `[particle, column]` block of one step.
    pub fn step(&self, step: usize) -> Option<ArrayView2<'_, f64>> {
        if step >= self.n_steps() {
            return None;
        }
        Some(self.step_view(step))
    }

    pub fn steps(&self) -> impl Iterator<Item = ArrayView2<'_, f64>> + '_ {
        (0..self.n_steps()).map(move |i| self.step_view(i))
    }

    fn step_view(&self, step: usize) -> ArrayView2<'_, f64> {
        match self {
            StepArrays::Dense(arr) => arr.index_axis(Axis(2), step),
            StepArrays::PerStep(steps) => steps[step].view(),
        }
    }

    /// Keeps only the listed steps, in the given order.
    pub fn select_steps(&self, steps: &[usize]) -> QitResult<StepArrays> {
        let n_steps = self.n_steps();
        if let Some(&bad) = steps.iter().find(|&&s| s >= n_steps) {
            return Err(QitError::Usage(format!(
                "step index {bad} out of range for {n_steps} steps"
            )));
        }
        Ok(match self {
            StepArrays::Dense(arr) => StepArrays::Dense(arr.select(Axis(2), steps)),
            StepArrays::PerStep(blocks) => {
                StepArrays::PerStep(steps.iter().map(|&s| blocks[s].clone()).collect())
            }
        })
    }

    fn check_width(&self, width: usize, what: &str) -> QitResult<()> {
        match self {
            StepArrays::Dense(arr) => {
                if arr.len_of(Axis(1)) != width {
                    return Err(QitError::Validation(format!(
                        "{what} expects {width} columns, got {}",
                        arr.len_of(Axis(1))
                    )));
                }
            }
            StepArrays::PerStep(steps) => {
                for (i, s) in steps.iter().enumerate() {
                    if s.ncols() != width {
                        return Err(QitError::Validation(format!(
                            "{what} expects {width} columns, step {i} has {}",
                            s.ncols()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A multi-step particle trajectory with its per-particle metadata.
///
/// Built once and never mutated; filters and aggregations derive new arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    positions: Positions,
    times: Vec<f64>,
    masses: Option<Vec<f64>>,
    additional_attributes: Option<Attributes>,
    additional_attribute_names: Vec<String>,
}

impl Trajectory {
    pub fn new(positions: Positions, times: Vec<f64>) -> QitResult<Self> {
        let n_steps = positions.n_steps();
        if times.len() != n_steps {
            return Err(QitError::Validation(format!(
                "trajectory has {n_steps} steps but {} times",
                times.len()
            )));
        }
        positions.check_width(SPATIAL_DIMS, "positions")?;
        Ok(Self {
            positions,
            times,
            masses: None,
            additional_attributes: None,
            additional_attribute_names: Vec::new(),
        })
    }

    pub fn with_masses(mut self, masses: Vec<f64>) -> QitResult<Self> {
        let n_particles = self.n_particles().ok_or_else(|| {
            QitError::Validation("particle masses require a static trajectory".into())
        })?;
        if masses.len() != n_particles {
            return Err(QitError::Validation(format!(
                "{} masses for {n_particles} particles",
                masses.len()
            )));
        }
        self.masses = Some(masses);
        Ok(self)
    }

    pub fn with_additional_attributes(
        mut self,
        attributes: Attributes,
        names: Vec<String>,
    ) -> QitResult<Self> {
        if attributes.is_dense() != self.positions.is_dense() {
            return Err(QitError::Validation(
                "attributes and positions must share the static/variable layout".into(),
            ));
        }
        if attributes.n_steps() != self.len() {
            return Err(QitError::Validation(format!(
                "attributes cover {} steps, trajectory has {}",
                attributes.n_steps(),
                self.len()
            )));
        }
        for step in 0..self.len() {
            if attributes.n_rows(step) != self.positions.n_rows(step) {
                return Err(QitError::Validation(format!(
                    "attribute and position particle counts differ at step {step}"
                )));
            }
        }
        attributes.check_width(names.len(), "additional attributes")?;
        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(QitError::Validation(format!(
                "duplicate attribute name '{dup}'"
            )));
        }
        self.additional_attributes = Some(attributes);
        self.additional_attribute_names = names;
        Ok(self)
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn is_static_trajectory(&self) -> bool {
        self.positions.is_dense()
    }

    /// Fixed particle count of a static trajectory.
    pub fn n_particles(&self) -> Option<usize> {
        match &self.positions {
            StepArrays::Dense(arr) => Some(arr.len_of(Axis(0))),
            StepArrays::PerStep(_) => None,
        }
    }

    pub fn particle_count(&self, step: usize) -> Option<usize> {
        self.positions.n_rows(step)
    }

    pub fn positions(&self) -> &Positions {
        &self.positions
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn masses(&self) -> Option<&[f64]> {
        self.masses.as_deref()
    }

    pub fn additional_attributes(&self) -> Option<&Attributes> {
        self.additional_attributes.as_ref()
    }

    pub fn additional_attribute_names(&self) -> &[String] {
        &self.additional_attribute_names
    }

    pub fn step_positions(&self, step: usize) -> Option<ArrayView2<'_, f64>> {
        self.positions.step(step)
    }

    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.additional_attribute_names.iter().position(|n| n == name)
    }

    fn attribute_column(&self, name: &str) -> QitResult<(&Attributes, usize)> {
        let idx = self
            .attribute_index(name)
            .ok_or_else(|| QitError::Usage(format!("no attribute named '{name}'")))?;
        let attributes = self
            .additional_attributes
            .as_ref()
            .ok_or_else(|| QitError::Usage("trajectory has no additional attributes".into()))?;
        Ok((attributes, idx))
    }

    /// Values of one attribute at every step, `[step][particle]`.
    pub fn attribute_values(&self, name: &str) -> QitResult<ParameterValues> {
        let (attributes, idx) = self.attribute_column(name)?;
        Ok(ParameterValues::PerStep(
            attributes.steps().map(|s| s.column(idx).to_vec()).collect(),
        ))
    }

    /// Values of one attribute frozen at a single step.
    pub fn attribute_values_at(&self, name: &str, step: usize) -> QitResult<ParameterValues> {
        let (attributes, idx) = self.attribute_column(name)?;
        let block = attributes.step(step).ok_or_else(|| {
            QitError::Usage(format!("step {step} out of range for {} steps", self.len()))
        })?;
        Ok(ParameterValues::Constant(block.column(idx).to_vec()))
    }

    /// A new trajectory restricted to the listed steps.
    pub fn select_steps(&self, steps: &[usize]) -> QitResult<Trajectory> {
        let positions = self.positions.select_steps(steps)?;
        let times = steps.iter().map(|&s| self.times[s]).collect();
        let additional_attributes = self
            .additional_attributes
            .as_ref()
            .map(|a| a.select_steps(steps))
            .transpose()?;
        Ok(Trajectory {
            positions,
            times,
            masses: self.masses.clone(),
            additional_attributes,
            additional_attribute_names: self.additional_attribute_names.clone(),
        })
    }
}
