use ndarray::{Array2, Array3, ArrayView1, Zip};

use qit_core::error::{QitError, QitResult};
use qit_core::filter::SpeciesSelector;
use qit_core::trajectory::{Positions, Trajectory};

use crate::frames::FrameSequence;

/// Added to the combined count so empty bins get a relative concentration of zero.
pub const RELATIVE_CONCENTRATION_EPSILON: f64 = 0.00001;

/// Opacity floor for occupied bins in the logarithmic scale.
pub const LOG_OPACITY_FLOOR: f64 = 0.5;

const X_AXIS: usize = 0;
const Z_AXIS: usize = 2;

/// Strictly increasing histogram bin edges.
#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    pub fn new(edges: Vec<f64>) -> QitResult<Self> {
        if edges.len() < 2 {
            return Err(QitError::Usage(format!(
                "bin edges need at least two values, got {}",
                edges.len()
            )));
        }
        if !edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(QitError::Usage("bin edges must be strictly increasing".into()));
        }
        Ok(Self(edges))
    }

    /// `n` evenly spaced edges from `min` to `max` inclusive.
    pub fn linspace(min: f64, max: f64, n: usize) -> QitResult<Self> {
        if n < 2 {
            return Self::new(vec![min; n]);
        }
        let step = (max - min) / (n - 1) as f64;
        let mut edges: Vec<f64> = (0..n).map(|i| min + step * i as f64).collect();
        edges[n - 1] = max;
        Self::new(edges)
    }

    pub fn edges(&self) -> &[f64] {
        &self.0
    }

    pub fn n_bins(&self) -> usize {
        self.0.len() - 1
    }

    pub fn first(&self) -> f64 {
        self.0[0]
    }

    pub fn last(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    pub fn centers(&self) -> Vec<f64> {
        self.0.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Bin holding `value`: half-open bins, the last one closed.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if value.is_nan() || value < self.first() || value > self.last() {
            return None;
        }
        if value == self.last() {
            return Some(self.n_bins() - 1);
        }
        Some(self.0.partition_point(|&e| e <= value) - 1)
    }
}

/// Counts of `(row, col)` samples, indexed `[row_bin, col_bin]`.
///
/// Samples outside the edges or NaN are dropped.
pub fn histogram2d(
    rows: ArrayView1<'_, f64>,
    cols: ArrayView1<'_, f64>,
    row_edges: &BinEdges,
    col_edges: &BinEdges,
) -> Array2<f64> {
    let mut counts = Array2::<f64>::zeros((row_edges.n_bins(), col_edges.n_bins()));
    for (&r, &c) in rows.iter().zip(cols.iter()) {
        if let (Some(i), Some(j)) = (row_edges.bin_index(r), col_edges.bin_index(c)) {
            counts[[i, j]] += 1.0;
        }
    }
    counts
}

/// Spatial extent of the density window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialLimits {
    /// `[-s, s]` on both axes.
    Symmetric(f64),
    Bounds {
        x_min: f64,
        x_max: f64,
        z_min: f64,
        z_max: f64,
    },
}

/// Number of edges along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinCount {
    Uniform(usize),
    PerAxis { x: usize, z: usize },
}

/// x and z bin edges of a density window.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    pub x_edges: BinEdges,
    pub z_edges: BinEdges,
}

impl DensityGrid {
    pub fn new(limits: SpatialLimits, bins: BinCount) -> QitResult<Self> {
        let (x_min, x_max, z_min, z_max) = match limits {
            SpatialLimits::Symmetric(s) => (-s, s, -s, s),
            SpatialLimits::Bounds {
                x_min,
                x_max,
                z_min,
                z_max,
            } => (x_min, x_max, z_min, z_max),
        };
        let (nx, nz) = match bins {
            BinCount::Uniform(n) => (n, n),
            BinCount::PerAxis { x, z } => (x, z),
        };
        Ok(Self {
            x_edges: BinEdges::linspace(x_min, x_max, nx)?,
            z_edges: BinEdges::linspace(z_min, z_max, nz)?,
        })
    }

    /// Window of the single-species density plot: 80 edges over `[-10, 10]`.
    pub fn overview() -> QitResult<Self> {
        Self::new(SpatialLimits::Symmetric(10.0), BinCount::Uniform(80))
    }

    /// Window of the comparison animation: 100 edges over `[-3, 3]`.
    pub fn comparison() -> QitResult<Self> {
        Self::new(SpatialLimits::Symmetric(3.0), BinCount::Uniform(100))
    }

    fn histogram(&self, positions: &Positions, step: usize) -> QitResult<Array2<f64>> {
        let block = positions.step(step).ok_or_else(|| {
            QitError::Usage(format!(
                "step {step} out of range for {} steps",
                positions.n_steps()
            ))
        })?;
        Ok(histogram2d(
            block.column(Z_AXIS),
            block.column(X_AXIS),
            &self.z_edges,
            &self.x_edges,
        ))
    }
}

/// Particle counts in the x/z plane at one step, indexed `[z_bin, x_bin]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityField {
    pub step: usize,
    pub counts: Array2<f64>,
}

pub fn xz_density(
    positions: &Positions,
    step: usize,
    grid: &DensityGrid,
) -> QitResult<DensityField> {
    Ok(DensityField {
        step,
        counts: grid.histogram(positions, step)?,
    })
}

/// Single-species density frames, computed on demand.
pub struct DensityAnimation<'a> {
    positions: &'a Positions,
    frames: FrameSequence,
    grid: DensityGrid,
}

impl<'a> DensityAnimation<'a> {
    pub fn new(
        positions: &'a Positions,
        frames: FrameSequence,
        grid: DensityGrid,
    ) -> QitResult<Self> {
        frames.validate(positions.n_steps())?;
        Ok(Self {
            positions,
            frames,
            grid,
        })
    }

    pub fn frame(&self, frame: usize) -> QitResult<DensityField> {
        self.frames.check_frame(frame)?;
        xz_density(self.positions, self.frames.frame_step(frame), &self.grid)
    }

    pub fn frames(&self) -> impl Iterator<Item = QitResult<DensityField>> + '_ {
        (0..self.frames.n_frames).map(move |i| self.frame(i))
    }
}

/// Maps a value in `[0, 1]` to an RGBA color with components in `[0, 1]`.
pub trait Colormap {
    fn rgba(&self, value: f64) -> [f64; 4];
}

/// Diverging blue to red scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoolWarm;

const COOL_WARM: [[f64; 3]; 9] = [
    [59.0, 76.0, 192.0],
    [98.0, 130.0, 234.0],
    [141.0, 176.0, 254.0],
    [184.0, 208.0, 249.0],
    [221.0, 221.0, 221.0],
    [245.0, 196.0, 173.0],
    [244.0, 154.0, 123.0],
    [222.0, 96.0, 77.0],
    [180.0, 4.0, 38.0],
];

impl Colormap for CoolWarm {
    fn rgba(&self, value: f64) -> [f64; 4] {
        if value.is_nan() {
            return [0.0, 0.0, 0.0, 0.0];
        }
        let last = COOL_WARM.len() - 1;
        let pos = value.clamp(0.0, 1.0) * last as f64;
        let lo = (pos.floor() as usize).min(last - 1);
        let t = pos - lo as f64;
        let mut out = [0.0, 0.0, 0.0, 1.0];
        for (c, v) in out.iter_mut().take(3).enumerate() {
            *v = (COOL_WARM[lo][c] + t * (COOL_WARM[lo + 1][c] - COOL_WARM[lo][c])) / 255.0;
        }
        out
    }
}

/// How the combined density of both species maps to opacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DensityScale {
    #[default]
    Linear,
    Logarithmic,
}

/// `a / (a + b + ε)` per bin.
pub fn relative_concentration(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    Zip::from(a)
        .and(b)
        .map_collect(|&a, &b| a / (a + b + RELATIVE_CONCENTRATION_EPSILON))
}

fn max_of(a: &Array2<f64>) -> f64 {
    a.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Opacity of the combined density; an empty frame yields NaN.
pub fn combined_opacity(a: &Array2<f64>, b: &Array2<f64>, scale: DensityScale) -> Array2<f64> {
    match scale {
        DensityScale::Linear => {
            let norm = max_of(a) + max_of(b);
            Zip::from(a).and(b).map_collect(|&a, &b| (a + b) / norm)
        }
        DensityScale::Logarithmic => {
            let log_a = a.mapv(|v| (v + 1.0).log10());
            let log_b = b.mapv(|v| (v + 1.0).log10());
            let norm = max_of(&log_a) + max_of(&log_b);
            Zip::from(&log_a).and(&log_b).map_collect(|&la, &lb| {
                let v = (la + lb) / norm * 0.5;
                if v > 0.0 {
                    v + LOG_OPACITY_FLOOR
                } else {
                    v
                }
            })
        }
    }
}

/// One frame of a two-species comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonFrame {
    pub step: usize,
    pub time: f64,
    pub counts_a: Array2<f64>,
    pub counts_b: Array2<f64>,
    pub relative_concentration: Array2<f64>,
    /// Opacity after the alpha factor.
    pub opacity: Array2<f64>,
    /// `[z_bin, x_bin, rgba]`.
    pub image: Array3<f64>,
}

/// Two-species density comparison frames.
///
/// Color encodes the relative concentration of species A, opacity the
/// combined density of both.
pub struct DensityComparison<C: Colormap = CoolWarm> {
    times: Vec<f64>,
    species_a: Positions,
    species_b: Positions,
    frames: FrameSequence,
    grid: DensityGrid,
    scale: DensityScale,
    alpha_factor: f64,
    colormap: C,
}

impl DensityComparison<CoolWarm> {
    /// Species A is taken from `trajectory_a`, species B from `trajectory_b`
    /// (which may be the same trajectory); frame times come from `trajectory_a`.
    pub fn new(
        trajectory_a: &Trajectory,
        species_a: &SpeciesSelector,
        trajectory_b: &Trajectory,
        species_b: &SpeciesSelector,
        frames: FrameSequence,
        grid: DensityGrid,
    ) -> QitResult<Self> {
        if trajectory_a.len() != trajectory_b.len() {
            return Err(QitError::Usage(format!(
                "compared trajectories have {} and {} steps",
                trajectory_a.len(),
                trajectory_b.len()
            )));
        }
        frames.validate(trajectory_a.len())?;
        Ok(Self {
            times: trajectory_a.times().to_vec(),
            species_a: species_a.select_positions(trajectory_a)?,
            species_b: species_b.select_positions(trajectory_b)?,
            frames,
            grid,
            scale: DensityScale::default(),
            alpha_factor: 1.0,
            colormap: CoolWarm,
        })
    }
}

impl<C: Colormap> DensityComparison<C> {
    pub fn with_scale(mut self, scale: DensityScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_alpha_factor(mut self, alpha_factor: f64) -> Self {
        self.alpha_factor = alpha_factor;
        self
    }

    pub fn with_colormap<D: Colormap>(self, colormap: D) -> DensityComparison<D> {
        DensityComparison {
            times: self.times,
            species_a: self.species_a,
            species_b: self.species_b,
            frames: self.frames,
            grid: self.grid,
            scale: self.scale,
            alpha_factor: self.alpha_factor,
            colormap,
        }
    }

    pub fn n_frames(&self) -> usize {
        self.frames.n_frames
    }

    pub fn grid(&self) -> &DensityGrid {
        &self.grid
    }

    pub fn frame(&self, frame: usize) -> QitResult<ComparisonFrame> {
        self.frames.check_frame(frame)?;
        let step = self.frames.frame_step(frame);
        let counts_a = self.grid.histogram(&self.species_a, step)?;
        let counts_b = self.grid.histogram(&self.species_b, step)?;
        let relative = relative_concentration(&counts_a, &counts_b);
        let opacity = combined_opacity(&counts_a, &counts_b, self.scale) * self.alpha_factor;

        let (nz, nx) = relative.dim();
        let mut image = Array3::<f64>::zeros((nz, nx, 4));
        for ((i, j), &rel) in relative.indexed_iter() {
            let [r, g, b, _] = self.colormap.rgba(rel);
            image[[i, j, 0]] = r;
            image[[i, j, 1]] = g;
            image[[i, j, 2]] = b;
            image[[i, j, 3]] = opacity[[i, j]];
        }
        Ok(ComparisonFrame {
            step,
            time: self.times[step],
            counts_a,
            counts_b,
            relative_concentration: relative,
            opacity,
            image,
        })
    }

    pub fn frames(&self) -> impl Iterator<Item = QitResult<ComparisonFrame>> + '_ {
        (0..self.frames.n_frames).map(move |i| self.frame(i))
    }
}
