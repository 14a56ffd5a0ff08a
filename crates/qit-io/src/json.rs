use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use ndarray::Array3;
use serde::Deserialize;

use qit_core::error::{QitError, QitResult};
use qit_core::trajectory::{StepArrays, Trajectory};

use crate::container::corrupt;
use crate::{TrajectoryFile, TrajectoryFormat, TrajectoryReader};

pub const JSON_FILE_VERSION: u32 = 1;
pub const COMPRESSED_JSON_SUFFIX: &str = ".json.gz";

#[derive(Debug, Deserialize)]
struct JsonTrajectory {
    steps: Vec<JsonStep>,
    #[serde(rename = "ionMasses")]
    ion_masses: Vec<JsonNumber>,
}

#[derive(Debug, Deserialize)]
struct JsonStep {
    time: JsonNumber,
    positions: Vec<[f64; 3]>,
}

/// Numbers are sometimes written as strings by the simulator.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonNumber {
    Number(f64),
    Text(String),
}

impl JsonNumber {
    fn value(&self, what: &str) -> QitResult<f64> {
        match self {
            JsonNumber::Number(v) => Ok(*v),
            JsonNumber::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| QitError::Parse(format!("{what}: '{s}' is not a number"))),
        }
    }
}

/// Gzip suffix check, ignoring case like format detection does.
pub fn is_compressed_json(path: &Path) -> bool {
    path.to_string_lossy()
        .to_lowercase()
        .ends_with(COMPRESSED_JSON_SUFFIX)
}

/// Opens `path` as text, inflating it first when it carries the gzip suffix.
pub fn open_text(path: &Path) -> QitResult<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if is_compressed_json(path) {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Parses a step-indexed JSON trajectory into the dense static form.
pub fn parse_json_trajectory<R: Read>(reader: R) -> QitResult<Trajectory> {
    let parsed: JsonTrajectory = serde_json::from_reader(reader)?;
    let Some(first) = parsed.steps.first() else {
        return Err(QitError::Parse("json trajectory has no steps".into()));
    };
    let n_ions = first.positions.len();
    let n_steps = parsed.steps.len();

    let mut positions = Array3::<f64>::zeros((n_ions, 3, n_steps));
    let mut times = Vec::with_capacity(n_steps);
    for (step, record) in parsed.steps.iter().enumerate() {
        if record.positions.len() != n_ions {
            return Err(QitError::Parse(format!(
                "step {step} has {} positions, step 0 has {n_ions}",
                record.positions.len()
            )));
        }
        for (ion, p) in record.positions.iter().enumerate() {
            positions[[ion, 0, step]] = p[0];
            positions[[ion, 1, step]] = p[1];
            positions[[ion, 2, step]] = p[2];
        }
        times.push(record.time.value("step time")?);
    }
    let masses = parsed
        .ion_masses
        .iter()
        .map(|m| m.value("ion mass"))
        .collect::<QitResult<Vec<_>>>()?;
    if masses.len() != n_ions {
        return Err(QitError::Parse(format!(
            "{} ion masses for {n_ions} ions",
            masses.len()
        )));
    }
    log::debug!("json trajectory: {n_ions} ions, {n_steps} steps");
    Trajectory::new(StepArrays::Dense(positions), times)
        .and_then(|t| t.with_masses(masses))
        .map_err(corrupt)
}

/// Reader for plain and gzip compressed JSON trajectories.
pub struct JsonTrajectoryReader {
    path: PathBuf,
}

impl JsonTrajectoryReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn is_compressed(&self) -> bool {
        is_compressed_json(&self.path)
    }
}

impl TrajectoryReader for JsonTrajectoryReader {
    fn format(&self) -> TrajectoryFormat {
        TrajectoryFormat::Json
    }

    fn read_trajectory(&mut self) -> QitResult<TrajectoryFile> {
        let trajectory = parse_json_trajectory(open_text(&self.path)?)?;
        Ok(TrajectoryFile {
            trajectory,
            file_version_id: JSON_FILE_VERSION,
            format: TrajectoryFormat::Json,
        })
    }
}
