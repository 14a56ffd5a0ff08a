use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use qit_core::config::SimulationConfig;
use qit_core::error::{QitError, QitResult};

use crate::records::{
    read_center_of_charge_record, read_concentrations_record, read_fft_record,
    read_ions_inactive_record, CenterOfChargeRecord, ConcentrationsRecord, IonsInactiveRecord,
    TransientRecord,
};
use crate::{read_trajectory_file, TrajectoryFile};

pub const CONFIG_SUFFIX: &str = "_conf.json";
pub const CONTAINER_TRAJECTORY_SUFFIX: &str = "_trajectories.npz";
pub const COMPRESSED_JSON_TRAJECTORY_SUFFIX: &str = "_trajectories.json.gz";
pub const JSON_TRAJECTORY_SUFFIX: &str = "_trajectories.json";
pub const FFT_RECORD_SUFFIX: &str = "_fft.txt";
pub const CENTER_OF_CHARGE_SUFFIX: &str = "_averagePosition.txt";
pub const IONS_INACTIVE_SUFFIX: &str = "_ionsInactive.txt";
pub const CONCENTRATIONS_SUFFIX: &str = "_concentrations.txt";

pub fn read_simulation_config(path: &Path) -> QitResult<SimulationConfig> {
    let content = fs::read_to_string(path)?;
    SimulationConfig::from_json_str(&content)
}

/// The artifacts a simulation run writes next to each other under one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationProject {
    prefix: PathBuf,
}

impl SimulationProject {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Last path component of the prefix.
    pub fn name(&self) -> String {
        self.prefix
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn artifact(&self, suffix: &str) -> PathBuf {
        let mut path = OsString::from(self.prefix.as_os_str());
        path.push(suffix);
        PathBuf::from(path)
    }

    pub fn config_path(&self) -> PathBuf {
        self.artifact(CONFIG_SUFFIX)
    }

    pub fn fft_record_path(&self) -> PathBuf {
        self.artifact(FFT_RECORD_SUFFIX)
    }

    pub fn center_of_charge_path(&self) -> PathBuf {
        self.artifact(CENTER_OF_CHARGE_SUFFIX)
    }

    pub fn ions_inactive_path(&self) -> PathBuf {
        self.artifact(IONS_INACTIVE_SUFFIX)
    }

    pub fn concentrations_path(&self) -> PathBuf {
        self.artifact(CONCENTRATIONS_SUFFIX)
    }

    /// First existing trajectory artifact: container, compressed JSON, plain JSON.
    pub fn trajectory_path(&self) -> QitResult<PathBuf> {
        [
            CONTAINER_TRAJECTORY_SUFFIX,
            COMPRESSED_JSON_TRAJECTORY_SUFFIX,
            JSON_TRAJECTORY_SUFFIX,
        ]
        .iter()
        .map(|s| self.artifact(s))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            QitError::Usage(format!(
                "no trajectory file found for project {}",
                self.prefix.display()
            ))
        })
    }

    pub fn read_config(&self) -> QitResult<SimulationConfig> {
        read_simulation_config(&self.config_path())
    }

    pub fn read_trajectory(&self) -> QitResult<TrajectoryFile> {
        read_trajectory_file(&self.trajectory_path()?, None)
    }

    pub fn read_fft_record(&self) -> QitResult<TransientRecord> {
        read_fft_record(&self.fft_record_path())
    }

    pub fn read_center_of_charge_record(&self) -> QitResult<CenterOfChargeRecord> {
        read_center_of_charge_record(&self.center_of_charge_path())
    }

    pub fn read_ions_inactive_record(&self) -> QitResult<IonsInactiveRecord> {
        read_ions_inactive_record(&self.ions_inactive_path())
    }

    pub fn read_concentrations_record(&self) -> QitResult<ConcentrationsRecord> {
        read_concentrations_record(&self.concentrations_path())
    }
}
