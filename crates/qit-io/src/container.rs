use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, ArrayD, Axis, Ix1, Ix2, Ix3, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpzError, ReadableElement};
use qit_core::error::{QitError, QitResult};

/// Dataset names shared by the container layouts.
pub mod keys {
    pub const FILE_VERSION: &str = "file_version";
    pub const STATIC_TRAJECTORY: &str = "static_trajectory";
    pub const TIMES: &str = "times";
    pub const PARTICLE_MASSES: &str = "particle_masses";
    pub const ATTRIBUTE_NAMES: &str = "additional_attribute_names";
    pub const LEGACY_POSITIONS: &str = "positions";
    pub const LEGACY_AUX: &str = "aux_parameters";
    pub const LEGACY_AUX_NAMES: &str = "aux_parameter_names";

    pub fn step_positions(step: usize) -> String {
        format!("timesteps/{step}/positions")
    }

    pub fn step_attributes(step: usize) -> String {
        format!("timesteps/{step}/additional_attributes")
    }
}

/// Opaque named-array storage underneath the binary trajectory layouts.
pub trait ArrayContainer {
    fn contains(&self, name: &str) -> bool;
    fn read_f64(&mut self, name: &str) -> QitResult<ArrayD<f64>>;
    /// Newline separated UTF-8 labels stored as a byte array.
    fn read_text(&mut self, name: &str) -> QitResult<Vec<String>>;

    fn read_scalar(&mut self, name: &str) -> QitResult<f64> {
        let arr = self.read_f64(name)?;
        if arr.len() != 1 {
            return Err(QitError::Parse(format!(
                "'{name}' should hold one value, found {}",
                arr.len()
            )));
        }
        arr.iter()
            .next()
            .copied()
            .ok_or_else(|| QitError::Parse(format!("'{name}' is empty")))
    }

    fn read_vector(&mut self, name: &str) -> QitResult<Vec<f64>> {
        let arr = self.read_f64(name)?;
        let arr = arr
            .into_dimensionality::<Ix1>()
            .map_err(|e| shape_err(name, e))?;
        Ok(arr.to_vec())
    }

    fn read_matrix(&mut self, name: &str, width: Option<usize>) -> QitResult<Array2<f64>> {
        let arr = self
            .read_f64(name)?
            .into_dimensionality::<Ix2>()
            .map_err(|e| shape_err(name, e))?;
        if let Some(w) = width {
            if arr.ncols() != w {
                return Err(QitError::Parse(format!(
                    "'{name}' has {} columns, expected {w}",
                    arr.ncols()
                )));
            }
        }
        Ok(arr)
    }

    fn read_cube(&mut self, name: &str) -> QitResult<Array3<f64>> {
        self.read_f64(name)?
            .into_dimensionality::<Ix3>()
            .map_err(|e| shape_err(name, e))
    }
}

fn shape_err(name: &str, err: ndarray::ShapeError) -> QitError {
    QitError::Parse(format!("'{name}' has unexpected rank: {err}"))
}

fn map_npz_err(name: &str, err: ReadNpzError) -> QitError {
    QitError::Parse(format!("npz entry '{name}': {err}"))
}

/// NumPy `.npz` archive backend.
pub struct NpzContainer {
    reader: NpzReader<BufReader<File>>,
    names: BTreeSet<String>,
    path: PathBuf,
}

impl NpzContainer {
    pub fn open(path: impl Into<PathBuf>) -> QitResult<Self> {
        let path = path.into();
        let file = File::open(&path)?;
        let mut reader = NpzReader::new(BufReader::new(file))
            .map_err(|e| map_npz_err(&path.display().to_string(), e))?;
        let names = reader
            .names()
            .map_err(|e| map_npz_err(&path.display().to_string(), e))?
            .into_iter()
            .map(|n| n.trim_end_matches(".npy").to_string())
            .collect::<BTreeSet<_>>();
        log::debug!("opened {} with {} entries", path.display(), names.len());
        Ok(Self {
            reader,
            names,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    fn require(&self, name: &str) -> QitResult<()> {
        if self.names.contains(name) {
            Ok(())
        } else {
            Err(QitError::Parse(format!(
                "{} has no entry '{name}'",
                self.path.display()
            )))
        }
    }

    fn try_read<T: ReadableElement>(&mut self, name: &str) -> Result<ArrayD<T>, ReadNpzError> {
        self.reader.by_name::<OwnedRepr<T>, IxDyn>(name)
    }
}

impl ArrayContainer for NpzContainer {
    fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    fn read_f64(&mut self, name: &str) -> QitResult<ArrayD<f64>> {
        self.require(name)?;
        let first_err = match self.try_read::<f64>(name) {
            Ok(arr) => return Ok(arr),
            Err(e) => e,
        };
        if let Ok(arr) = self.try_read::<f32>(name) {
            return Ok(arr.mapv(f64::from));
        }
        if let Ok(arr) = self.try_read::<i64>(name) {
            return Ok(arr.mapv(|v| v as f64));
        }
        if let Ok(arr) = self.try_read::<bool>(name) {
            return Ok(arr.mapv(|v| if v { 1.0 } else { 0.0 }));
        }
        if let Ok(arr) = self.try_read::<i32>(name) {
            return Ok(arr.mapv(f64::from));
        }
        // No dtype matched; report why the f64 read failed.
        Err(map_npz_err(name, first_err))
    }

    fn read_text(&mut self, name: &str) -> QitResult<Vec<String>> {
        self.require(name)?;
        let bytes = self.try_read::<u8>(name).map_err(|e| map_npz_err(name, e))?;
        decode_labels(name, bytes.iter().copied().collect())
    }
}

fn decode_labels(name: &str, bytes: Vec<u8>) -> QitResult<Vec<String>> {
    let text = String::from_utf8(bytes)
        .map_err(|e| QitError::Parse(format!("'{name}' is not UTF-8: {e}")))?;
    Ok(text
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// In-memory backend, for arrays that come from another store.
#[derive(Debug, Default, Clone)]
pub struct MemoryContainer {
    arrays: HashMap<String, ArrayD<f64>>,
    texts: HashMap<String, Vec<String>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_array<D: ndarray::Dimension>(
        &mut self,
        name: impl Into<String>,
        array: ndarray::Array<f64, D>,
    ) {
        self.arrays.insert(name.into(), array.into_dyn());
    }

    pub fn insert_text(&mut self, name: impl Into<String>, labels: Vec<String>) {
        self.texts.insert(name.into(), labels);
    }
}

impl ArrayContainer for MemoryContainer {
    fn contains(&self, name: &str) -> bool {
        self.arrays.contains_key(name) || self.texts.contains_key(name)
    }

    fn read_f64(&mut self, name: &str) -> QitResult<ArrayD<f64>> {
        self.arrays
            .get(name)
            .cloned()
            .ok_or_else(|| QitError::Parse(format!("no array '{name}'")))
    }

    fn read_text(&mut self, name: &str) -> QitResult<Vec<String>> {
        self.texts
            .get(name)
            .cloned()
            .ok_or_else(|| QitError::Parse(format!("no labels '{name}'")))
    }
}

/// Stacks equally sized `[particle, column]` blocks into `[particle, column, step]`.
pub(crate) fn stack_steps(blocks: &[Array2<f64>], width: usize) -> QitResult<Array3<f64>> {
    let Some(first) = blocks.first() else {
        return Ok(Array3::zeros((0, width, 0)));
    };
    let n_rows = first.nrows();
    if let Some((step, b)) = blocks.iter().enumerate().find(|(_, b)| b.nrows() != n_rows) {
        return Err(QitError::Parse(format!(
            "static trajectory has {n_rows} particles at step 0 but {} at step {step}",
            b.nrows()
        )));
    }
    if let Some((step, b)) = blocks.iter().enumerate().find(|(_, b)| b.ncols() != width) {
        return Err(QitError::Parse(format!(
            "static trajectory stores {width} columns per particle but {} at step {step}",
            b.ncols()
        )));
    }
    let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
    ndarray::stack(Axis(2), &views)
        .map_err(|e| QitError::Parse(format!("cannot stack timesteps: {e}")))
}

/// Reorders a `[step, particle, column]` block to `[particle, column, step]`.
pub(crate) fn steps_last(arr: Array3<f64>) -> Array3<f64> {
    arr.permuted_axes([1, 2, 0]).as_standard_layout().into_owned()
}

/// A validation failure while assembling stored data means the file is corrupt.
pub(crate) fn corrupt(err: QitError) -> QitError {
    match err {
        QitError::Validation(msg) => {
            QitError::Parse(format!("inconsistent trajectory data: {msg}"))
        }
        other => other,
    }
}
