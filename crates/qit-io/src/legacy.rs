use std::path::PathBuf;

use ndarray::Axis;
use qit_core::error::{QitError, QitResult};
use qit_core::trajectory::{StepArrays, Trajectory, SPATIAL_DIMS};

use crate::container::{corrupt, keys, steps_last, ArrayContainer, NpzContainer};
use crate::{TrajectoryFile, TrajectoryFormat, TrajectoryReader};

pub const LEGACY_FILE_VERSION: u32 = 1;

/// Reader for version 1 containers, with or without the auxiliary block.
pub struct LegacyContainerReader<C: ArrayContainer> {
    container: C,
}

impl LegacyContainerReader<NpzContainer> {
    pub fn open(path: impl Into<PathBuf>) -> QitResult<Self> {
        Ok(Self::new(NpzContainer::open(path)?))
    }
}

impl<C: ArrayContainer> LegacyContainerReader<C> {
    pub fn new(container: C) -> Self {
        Self { container }
    }
}

impl<C: ArrayContainer> TrajectoryReader for LegacyContainerReader<C> {
    fn format(&self) -> TrajectoryFormat {
        TrajectoryFormat::Container
    }

    fn read_trajectory(&mut self) -> QitResult<TrajectoryFile> {
        let trajectory = read_legacy(&mut self.container)?;
        Ok(TrajectoryFile {
            trajectory,
            file_version_id: LEGACY_FILE_VERSION,
            format: TrajectoryFormat::Container,
        })
    }
}

pub fn read_legacy<C: ArrayContainer>(container: &mut C) -> QitResult<Trajectory> {
    let times = container.read_vector(keys::TIMES)?;
    let raw = container.read_cube(keys::LEGACY_POSITIONS)?;
    if raw.len_of(Axis(0)) != times.len() {
        return Err(QitError::Parse(format!(
            "positions hold {} steps but {} times are stored",
            raw.len_of(Axis(0)),
            times.len()
        )));
    }
    if raw.len_of(Axis(2)) != SPATIAL_DIMS {
        return Err(QitError::Parse(format!(
            "positions have {} spatial columns",
            raw.len_of(Axis(2))
        )));
    }
    let positions = steps_last(raw);
    let n_particles = positions.len_of(Axis(0));
    log::debug!(
        "legacy container: {n_particles} particles, {} steps",
        times.len()
    );
    let mut trajectory =
        Trajectory::new(StepArrays::Dense(positions), times).map_err(corrupt)?;

    if container.contains(keys::LEGACY_AUX) {
        let aux = container.read_cube(keys::LEGACY_AUX)?;
        let names = container.read_text(keys::LEGACY_AUX_NAMES)?;
        trajectory = trajectory
            .with_additional_attributes(StepArrays::Dense(steps_last(aux)), names)
            .map_err(corrupt)?;
    }
    if container.contains(keys::PARTICLE_MASSES) {
        let masses = container.read_vector(keys::PARTICLE_MASSES)?;
        trajectory = trajectory.with_masses(masses).map_err(corrupt)?;
    }
    Ok(trajectory)
}
