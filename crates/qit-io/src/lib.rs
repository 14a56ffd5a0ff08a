pub mod container;
pub mod json;
pub mod legacy;
pub mod project;
pub mod records;
pub mod v2;

use std::path::Path;

use qit_core::error::{QitError, QitResult};
use qit_core::trajectory::Trajectory;

pub use container::{ArrayContainer, MemoryContainer, NpzContainer};
pub use json::{parse_json_trajectory, JsonTrajectoryReader};
pub use legacy::LegacyContainerReader;
pub use project::{read_simulation_config, SimulationProject};
pub use records::{
    read_center_of_charge_record, read_concentrations_record, read_fft_record,
    read_ions_inactive_record, read_table, CenterOfChargeRecord, ConcentrationsRecord,
    IonsInactiveRecord, TransientRecord,
};
pub use v2::ContainerV2Reader;

/// On-disk trajectory encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryFormat {
    /// Step-indexed JSON, optionally gzip compressed.
    Json,
    /// Binary named-array container, legacy (v1) or current (v2) layout.
    Container,
}

impl TrajectoryFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".json") || name.ends_with(json::COMPRESSED_JSON_SUFFIX) {
            Some(TrajectoryFormat::Json)
        } else if name.ends_with(".npz") {
            Some(TrajectoryFormat::Container)
        } else {
            None
        }
    }
}

/// A trajectory together with what the file said about itself.
#[derive(Debug, Clone)]
pub struct TrajectoryFile {
    pub trajectory: Trajectory,
    pub file_version_id: u32,
    pub format: TrajectoryFormat,
}

impl TrajectoryFile {
    pub fn is_static_trajectory(&self) -> bool {
        self.trajectory.is_static_trajectory()
    }
}

pub trait TrajectoryReader {
    fn format(&self) -> TrajectoryFormat;
    fn read_trajectory(&mut self) -> QitResult<TrajectoryFile>;
}

/// Picks the container reader matching the stored version marker.
///
/// Containers without a marker use the legacy layout.
pub fn container_reader<C: ArrayContainer + 'static>(
    mut container: C,
) -> QitResult<Box<dyn TrajectoryReader>> {
    if !container.contains(container::keys::FILE_VERSION) {
        return Ok(Box::new(LegacyContainerReader::new(container)));
    }
    let version = container.read_scalar(container::keys::FILE_VERSION)?;
    if version == f64::from(v2::V2_FILE_VERSION) {
        Ok(Box::new(ContainerV2Reader::new(container)))
    } else {
        Err(QitError::Unsupported(format!(
            "container file version {version}"
        )))
    }
}

pub fn read_container_trajectory(path: &Path) -> QitResult<TrajectoryFile> {
    container_reader(NpzContainer::open(path)?)?.read_trajectory()
}

/// Reads a trajectory file, detecting the format from the file name when not given.
pub fn read_trajectory_file(
    path: &Path,
    format: Option<TrajectoryFormat>,
) -> QitResult<TrajectoryFile> {
    let format = format
        .or_else(|| TrajectoryFormat::from_path(path))
        .ok_or_else(|| {
            QitError::Unsupported(format!(
                "cannot tell trajectory format of {}",
                path.display()
            ))
        })?;
    let file = match format {
        TrajectoryFormat::Json => JsonTrajectoryReader::new(path).read_trajectory()?,
        TrajectoryFormat::Container => read_container_trajectory(path)?,
    };
    log::info!(
        "read {} (version {}, {} steps, static={})",
        path.display(),
        file.file_version_id,
        file.trajectory.len(),
        file.is_static_trajectory()
    );
    Ok(file)
}
