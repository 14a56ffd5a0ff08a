#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{arr0, Array1, Array2, Array3};
use ndarray_npy::NpzWriter;
use tempfile::TempDir;

pub fn labels(names: &[&str]) -> Array1<u8> {
    Array1::from(names.join("\n").into_bytes())
}

/// Writes a v2 container; `counts[i]` particles at step `i`.
///
/// Particle `p` sits at `x = p`, `z = 0.5 * step`. Attributes hold
/// `[step, p]` under the names "step" and "chemical id".
pub fn write_v2(path: &Path, is_static: bool, counts: &[usize], masses: Option<&[f64]>) {
    let mut npz = NpzWriter::new(File::create(path).expect("create file"));
    npz.add_array("file_version", &arr0(2i64)).expect("add array");
    npz.add_array("static_trajectory", &arr0(is_static)).expect("add array");
    let times = Array1::from_iter((0..counts.len()).map(|i| i as f64 * 0.1));
    npz.add_array("times", &times).expect("add array");
    for (step, &n) in counts.iter().enumerate() {
        let mut pos = Array2::<f64>::zeros((n, 3));
        let mut attrs = Array2::<f64>::zeros((n, 2));
        for p in 0..n {
            pos[[p, 0]] = p as f64;
            pos[[p, 2]] = step as f64 * 0.5;
            attrs[[p, 0]] = step as f64;
            attrs[[p, 1]] = p as f64;
        }
        npz.add_array(format!("timesteps/{step}/positions"), &pos)
            .expect("add array");
        npz.add_array(format!("timesteps/{step}/additional_attributes"), &attrs)
            .expect("add array");
    }
    npz.add_array("additional_attribute_names", &labels(&["step", "chemical id"]))
        .expect("add array");
    if let Some(m) = masses {
        npz.add_array("particle_masses", &Array1::from(m.to_vec()))
            .expect("add array");
    }
    npz.finish().expect("finish archive");
}

/// Writes a legacy container, `[step, particle, 3]` positions, optionally with
/// one auxiliary column named "collisions".
pub fn write_legacy(path: &Path, n_steps: usize, n_particles: usize, with_aux: bool) {
    let mut npz = NpzWriter::new(File::create(path).expect("create file"));
    let times = Array1::from_iter((0..n_steps).map(|i| i as f64));
    npz.add_array("times", &times).expect("add array");
    let mut pos = Array3::<f32>::zeros((n_steps, n_particles, 3));
    let mut aux = Array3::<f64>::zeros((n_steps, n_particles, 1));
    for s in 0..n_steps {
        for p in 0..n_particles {
            pos[[s, p, 0]] = p as f32;
            pos[[s, p, 2]] = s as f32;
            aux[[s, p, 0]] = (s * p) as f64;
        }
    }
    npz.add_array("positions", &pos).expect("add array");
    if with_aux {
        npz.add_array("aux_parameters", &aux).expect("add array");
        npz.add_array("aux_parameter_names", &labels(&["collisions"]))
            .expect("add array");
    }
    npz.finish().expect("finish archive");
}

pub const JSON_TRAJECTORY: &str = r#"{
  "ionMasses": [35.0, 35.0, 78.0],
  "steps": [
    {"time": 0.0, "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.5], [2.0, 0.0, -0.5]]},
    {"time": 1.0, "positions": [[0.1, 0.0, 0.1], [1.1, 0.0, 0.6], [2.1, 0.0, -0.4]]},
    {"time": 2.0, "positions": [[0.2, 0.0, 0.2], [1.2, 0.0, 0.7], [2.2, 0.0, -0.3]]}
  ]
}"#;

pub fn write_text(path: &Path, content: &str) {
    let mut f = File::create(path).expect("create file");
    f.write_all(content.as_bytes()).expect("write content");
}

pub fn write_gz(path: &Path, content: &str) {
    let mut enc = GzEncoder::new(
        File::create(path).expect("create file"),
        Compression::default(),
    );
    enc.write_all(content.as_bytes()).expect("write content");
    enc.finish().expect("finish archive");
}

pub fn project_in(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}
