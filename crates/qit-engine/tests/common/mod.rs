#![allow(dead_code)]

use std::f64::consts::PI;
use std::fs::{self, File};
use std::path::Path;

use ndarray::{arr0, Array1, Array2};
use ndarray_npy::NpzWriter;
use qit_io::SimulationProject;

pub const CONF: &str = r#"{
  "background_pressure": 0.1,
  "collision_gas_mass_amu": 4,
  "space_charge_factor": 2.5,
  "geometry_mode": "default"
}"#;

pub fn write_conf(project: &SimulationProject) {
    fs::write(project.config_path(), CONF).expect("write config");
}

/// FFT record sampled at `fs` with a sinusoid of frequency `f0` in column 3.
pub fn write_fft_record(project: &SimulationProject, n: usize, fs: f64, f0: f64) {
    let mut out = String::from("# time x y z\n");
    for i in 0..n {
        let t = i as f64 / fs;
        let z = (2.0 * PI * f0 * t).sin();
        out.push_str(&format!("{t:e} 0 0 {z:e}\n"));
    }
    fs::write(project.fft_record_path(), out).expect("write fft record");
}

/// Static two-species container: species of mass `masses[p % 2]`, all on the
/// trap axis, oscillating in z with `f_a` and `f_b` (times in µs).
pub fn write_oscillating_trajectory(
    path: &Path,
    n_steps: usize,
    dt_us: f64,
    f_a: f64,
    f_b: f64,
) {
    let n_particles = 4;
    let masses = [20.0, 40.0];
    let mut npz = NpzWriter::new(File::create(path).expect("create file"));
    npz.add_array("file_version", &arr0(2.0f64)).expect("add array");
    npz.add_array("static_trajectory", &arr0(1.0f64)).expect("add array");
    let times = Array1::from_iter((0..n_steps).map(|i| i as f64 * dt_us));
    npz.add_array("times", &times).expect("add array");
    for step in 0..n_steps {
        let t = step as f64 * dt_us * 1e-6;
        let mut pos = Array2::<f64>::zeros((n_particles, 3));
        for p in 0..n_particles {
            let f = if p % 2 == 0 { f_a } else { f_b };
            pos[[p, 2]] = (2.0 * PI * f * t).sin();
        }
        npz.add_array(format!("timesteps/{step}/positions"), &pos)
            .expect("add array");
    }
    let m = Array1::from_iter((0..n_particles).map(|p| masses[p % 2]));
    npz.add_array("particle_masses", &m).expect("add array");
    npz.finish().expect("finish archive");
}
