use std::ops::Range;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use qit_core::error::{QitError, QitResult};
use qit_core::filter::filter_mass;
use qit_core::trajectory::{Positions, Trajectory};
use qit_io::project::SimulationProject;

/// Trajectory times are written in microseconds.
pub const TRAJECTORY_TIME_SCALE: f64 = 1e-6;

/// Default acceptance radius of the detection region, in trajectory length units.
pub const DEFAULT_ACCEPTANCE_RADIUS: f64 = 5.0;

/// Single-sided amplitude spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub frequencies: Vec<f64>,
    pub amplitudes: Vec<f64>,
}

/// Amplitude spectrum of a uniformly sampled transient.
///
/// The sample rate is taken as `n / (t_last - t_first)`; amplitudes are
/// normalized by `n` and only the first `n / 2` bins are kept.
pub fn fft_spectrum(time: &[f64], signal: ArrayView1<'_, f64>) -> QitResult<Spectrum> {
    let n = time.len();
    if n < 2 {
        return Err(QitError::Usage(format!(
            "spectrum needs at least two samples, got {n}"
        )));
    }
    if signal.len() != n {
        return Err(QitError::Usage(format!(
            "{} signal samples for {n} time points",
            signal.len()
        )));
    }
    let duration = time[n - 1] - time[0];
    if !(duration > 0.0 && duration.is_finite()) {
        return Err(QitError::Usage(format!(
            "transient must span increasing time, got duration {duration}"
        )));
    }
    let sample_rate = n as f64 / duration;

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buf: Vec<Complex<f64>> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
    fft.process(&mut buf);

    let half = n / 2;
    let norm = n as f64;
    let period = n as f64 / sample_rate;
    Ok(Spectrum {
        frequencies: (0..half).map(|k| k as f64 / period).collect(),
        amplitudes: buf[..half].iter().map(|c| c.norm() / norm).collect(),
    })
}

/// How the distance of a particle from the trap is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadialMeasure {
    /// Distance from the trap axis, `sqrt(x² + y²)`.
    #[default]
    Cylindrical,
    /// Distance from the trap centre, `sqrt(x² + y² + z²)`.
    Spherical,
}

/// Region whose particles contribute to the detected signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptanceRegion {
    pub radius: f64,
    pub measure: RadialMeasure,
}

impl Default for AcceptanceRegion {
    fn default() -> Self {
        Self {
            radius: DEFAULT_ACCEPTANCE_RADIUS,
            measure: RadialMeasure::default(),
        }
    }
}

impl AcceptanceRegion {
    pub fn accepts(&self, x: f64, y: f64, z: f64) -> bool {
        let r2 = match self.measure {
            RadialMeasure::Cylindrical => x * x + y * y,
            RadialMeasure::Spherical => x * x + y * y + z * z,
        };
        r2.sqrt() < self.radius
    }
}

/// Mean axial position of the accepted particles at every step.
///
/// A step without accepted particles yields NaN.
pub fn reconstruct_transient(positions: &Positions, region: &AcceptanceRegion) -> Vec<f64> {
    positions
        .steps()
        .map(|block| {
            let (sum, count) = block
                .rows()
                .into_iter()
                .filter(|p| region.accepts(p[0], p[1], p[2]))
                .fold((0.0, 0usize), |(s, c), p| (s + p[2], c + 1));
            sum / count as f64
        })
        .collect()
}

/// Transient samples, one signal column per detected species.
#[derive(Debug, Clone, PartialEq)]
pub struct Transient {
    pub time: Vec<f64>,
    /// `[sample, column]`.
    pub signals: Array2<f64>,
    /// Particle mass of each column, when the columns were split by mass.
    pub masses: Vec<f64>,
}

impl Transient {
    pub fn n_columns(&self) -> usize {
        self.signals.ncols()
    }
}

/// Distinct particle masses in ascending order.
pub fn distinct_masses(masses: &[f64]) -> Vec<f64> {
    let mut out = masses.to_vec();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

/// Reconstructs the detected transient from trajectory data.
///
/// A trajectory with several distinct particle masses yields one column per
/// mass; otherwise a single column over all particles. Times are multiplied
/// by `time_scale`.
pub fn transient_from_trajectory(
    trajectory: &Trajectory,
    region: &AcceptanceRegion,
    time_scale: f64,
) -> QitResult<Transient> {
    let masses = trajectory.masses().map(distinct_masses).unwrap_or_default();
    let columns = if masses.len() > 1 {
        masses
            .iter()
            .map(|&m| Ok(reconstruct_transient(&filter_mass(trajectory, m)?, region)))
            .collect::<QitResult<Vec<_>>>()?
    } else {
        vec![reconstruct_transient(trajectory.positions(), region)]
    };
    let n = trajectory.len();
    let mut signals = Array2::<f64>::zeros((n, columns.len()));
    for (c, column) in columns.iter().enumerate() {
        for (s, &v) in column.iter().enumerate() {
            signals[[s, c]] = v;
        }
    }
    log::debug!(
        "reconstructed {} transient column(s) over {n} steps",
        columns.len()
    );
    Ok(Transient {
        time: trajectory.times().iter().map(|t| t * time_scale).collect(),
        signals,
        masses: if masses.len() > 1 { masses } else { Vec::new() },
    })
}

/// Spectra of every column of `signals`, sharing one frequency axis.
///
/// Returns the frequencies and a `[frequency, column]` amplitude table.
pub fn spectra(time: &[f64], signals: ArrayView2<'_, f64>) -> QitResult<(Vec<f64>, Array2<f64>)> {
    if signals.ncols() == 0 {
        return Err(QitError::Usage("transient has no signal columns".into()));
    }
    let n_bins = time.len() / 2;
    let mut amplitudes = Array2::<f64>::zeros((n_bins, signals.ncols()));
    let mut frequencies = Vec::new();
    for (c, column) in signals.axis_iter(Axis(1)).enumerate() {
        let spectrum = fft_spectrum(time, column)?;
        amplitudes
            .column_mut(c)
            .assign(&ArrayView1::from(&spectrum.amplitudes));
        frequencies = spectrum.frequencies;
    }
    Ok((frequencies, amplitudes))
}

/// Bin range `[floor(n * start), floor(n * stop))` of a fractional frequency window.
pub fn frequency_window(n_bins: usize, start: f64, stop: f64) -> QitResult<Range<usize>> {
    if !(0.0..=1.0).contains(&start) || !(0.0..=1.0).contains(&stop) || start > stop {
        return Err(QitError::Usage(format!(
            "frequency window [{start}, {stop}] is not a sub-range of [0, 1]"
        )));
    }
    let at = |f: f64| ((n_bins as f64 * f).floor() as usize).min(n_bins);
    Ok(at(start)..at(stop))
}

/// Where the transient of a simulation comes from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransientSource {
    /// The `_fft.txt` record written by the simulator.
    #[default]
    FftRecord,
    /// Reconstructed from the project trajectory.
    Reconstruct(AcceptanceRegion),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumOptions {
    pub freq_start: f64,
    pub freq_stop: f64,
    pub source: TransientSource,
}

impl Default for SpectrumOptions {
    fn default() -> Self {
        Self {
            freq_start: 0.0,
            freq_stop: 1.0,
            source: TransientSource::FftRecord,
        }
    }
}

/// Result of the spectral analysis of one simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralRecord {
    pub frequencies: Vec<f64>,
    /// `[frequency, column]`, one column per transient column.
    pub amplitudes: Array2<f64>,
    pub time: Vec<f64>,
    /// `[sample, column]`.
    pub transient: Array2<f64>,
    pub title: String,
}

pub fn analyse_fft_simulation(
    project: &SimulationProject,
    options: &SpectrumOptions,
) -> QitResult<SpectralRecord> {
    let config = project.read_config()?;
    let (time, transient) = match options.source {
        TransientSource::FftRecord => {
            let record = project.read_fft_record()?;
            (record.time, record.signals)
        }
        TransientSource::Reconstruct(region) => {
            let file = project.read_trajectory()?;
            let t = transient_from_trajectory(&file.trajectory, &region, TRAJECTORY_TIME_SCALE)?;
            (t.time, t.signals)
        }
    };
    let (frequencies, amplitudes) = spectra(&time, transient.view())?;
    let window = frequency_window(frequencies.len(), options.freq_start, options.freq_stop)?;
    let title = config.title(&project.name())?;
    log::info!(
        "{}: {} samples, {} column(s), {} frequency bins in window",
        project.name(),
        time.len(),
        transient.ncols(),
        window.len()
    );
    Ok(SpectralRecord {
        frequencies: frequencies[window.clone()].to_vec(),
        amplitudes: amplitudes.slice(ndarray::s![window, ..]).to_owned(),
        time,
        transient,
        title,
    })
}
