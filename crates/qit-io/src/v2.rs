use std::path::PathBuf;

use ndarray::Array2;
use qit_core::error::{QitError, QitResult};
use qit_core::trajectory::{StepArrays, Trajectory, SPATIAL_DIMS};

use crate::container::{corrupt, keys, stack_steps, ArrayContainer, NpzContainer};
use crate::{TrajectoryFile, TrajectoryFormat, TrajectoryReader};

pub const V2_FILE_VERSION: u32 = 2;

/// Reader for version 2 containers (static and variable particle counts).
pub struct ContainerV2Reader<C: ArrayContainer> {
    container: C,
}

impl ContainerV2Reader<NpzContainer> {
    pub fn open(path: impl Into<PathBuf>) -> QitResult<Self> {
        Ok(Self::new(NpzContainer::open(path)?))
    }
}

impl<C: ArrayContainer> ContainerV2Reader<C> {
    pub fn new(container: C) -> Self {
        Self { container }
    }
}

impl<C: ArrayContainer> TrajectoryReader for ContainerV2Reader<C> {
    fn format(&self) -> TrajectoryFormat {
        TrajectoryFormat::Container
    }

    fn read_trajectory(&mut self) -> QitResult<TrajectoryFile> {
        let trajectory = read_v2(&mut self.container)?;
        Ok(TrajectoryFile {
            trajectory,
            file_version_id: V2_FILE_VERSION,
            format: TrajectoryFormat::Container,
        })
    }
}

pub fn read_v2<C: ArrayContainer>(container: &mut C) -> QitResult<Trajectory> {
    let version = container.read_scalar(keys::FILE_VERSION)?;
    if version != f64::from(V2_FILE_VERSION) {
        return Err(QitError::Unsupported(format!(
            "expected container version {V2_FILE_VERSION}, found {version}"
        )));
    }
    let is_static = container.read_scalar(keys::STATIC_TRAJECTORY)? != 0.0;
    let times = container.read_vector(keys::TIMES)?;

    let mut n_steps = 0usize;
    while container.contains(&keys::step_positions(n_steps)) {
        n_steps += 1;
    }
    if n_steps != times.len() {
        return Err(QitError::Parse(format!(
            "{n_steps} timestep groups stored but {} times",
            times.len()
        )));
    }

    let mut positions = Vec::with_capacity(n_steps);
    let mut attributes: Vec<Array2<f64>> = Vec::new();
    for step in 0..n_steps {
        positions.push(container.read_matrix(&keys::step_positions(step), Some(SPATIAL_DIMS))?);
        let attr_key = keys::step_attributes(step);
        match (container.contains(&attr_key), attributes.len() == step) {
            (true, true) => attributes.push(container.read_matrix(&attr_key, None)?),
            (false, true) if step == 0 => {}
            (false, false) => {}
            _ => {
                return Err(QitError::Parse(format!(
                    "additional attributes stored for some timesteps only (step {step})"
                )))
            }
        }
    }
    log::debug!(
        "container v2: {n_steps} steps, static={is_static}, attributes={}",
        !attributes.is_empty()
    );

    let (positions, attributes) = if is_static {
        let width = attributes.first().map(|a| a.ncols()).unwrap_or(0);
        let attributes = if attributes.is_empty() {
            None
        } else {
            Some(StepArrays::Dense(stack_steps(&attributes, width)?))
        };
        (StepArrays::Dense(stack_steps(&positions, SPATIAL_DIMS)?), attributes)
    } else {
        let attributes = (!attributes.is_empty()).then(|| StepArrays::PerStep(attributes));
        (StepArrays::PerStep(positions), attributes)
    };

    let mut trajectory = Trajectory::new(positions, times).map_err(corrupt)?;
    if let Some(attributes) = attributes {
        let names = container.read_text(keys::ATTRIBUTE_NAMES)?;
        trajectory = trajectory
            .with_additional_attributes(attributes, names)
            .map_err(corrupt)?;
    }
    if container.contains(keys::PARTICLE_MASSES) {
        if is_static {
            let masses = container.read_vector(keys::PARTICLE_MASSES)?;
            trajectory = trajectory.with_masses(masses).map_err(corrupt)?;
        } else {
            log::warn!("ignoring particle masses stored with a variable trajectory");
        }
    }
    Ok(trajectory)
}
