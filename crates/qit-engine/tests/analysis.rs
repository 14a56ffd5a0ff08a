mod common;

use ndarray::Array3;
use qit_core::error::QitError;
use qit_core::filter::SpeciesSelector;
use qit_core::trajectory::{StepArrays, Trajectory};
use qit_engine::{
    analyse_fft_simulation, AcceptanceRegion, BinCount, DensityComparison, DensityGrid,
    DensityScale, FrameSequence, SpatialLimits, SpectrumOptions, TransientSource,
};
use qit_io::SimulationProject;

fn peak_frequency(freqs: &[f64], amps: impl Iterator<Item = f64>) -> f64 {
    let (idx, _) = amps
        .enumerate()
        .skip(1)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .expect("non-empty spectrum");
    freqs[idx]
}

#[test]
fn spectrum_from_fft_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let project = SimulationProject::new(dir.path().join("qitSim_fft"));
    common::write_conf(&project);
    common::write_fft_record(&project, 512, 1.0e6, 62.5e3);

    let rec = analyse_fft_simulation(&project, &SpectrumOptions::default())
        .expect("analyse fft simulation");
    assert_eq!(rec.frequencies.len(), 256);
    assert_eq!(rec.amplitudes.shape(), &[256, 1]);
    assert_eq!(rec.time.len(), 512);
    assert_eq!(
        rec.title,
        "qitSim_fft p:0.1 Pa, c gas mass:4 amu, space charge factor:   2.5"
    );
    let peak = peak_frequency(&rec.frequencies, rec.amplitudes.column(0).iter().copied());
    let bin = rec.frequencies[1];
    assert!((peak - 62.5e3).abs() <= bin, "peak at {peak}");
}

#[test]
fn windowed_spectrum() {
    let dir = tempfile::tempdir().expect("tempdir");
    let project = SimulationProject::new(dir.path().join("qitSim_win"));
    common::write_conf(&project);
    common::write_fft_record(&project, 100, 1.0e6, 1.0e5);

    let options = SpectrumOptions {
        freq_start: 0.1,
        freq_stop: 0.5,
        ..SpectrumOptions::default()
    };
    let rec = analyse_fft_simulation(&project, &options).expect("analyse fft simulation");
    // 50 bins, window [5, 25)
    assert_eq!(rec.frequencies.len(), 20);
    assert_eq!(rec.amplitudes.nrows(), 20);
    assert_eq!(rec.transient.nrows(), 100);
}

#[test]
fn reconstructed_spectrum_per_mass() {
    let dir = tempfile::tempdir().expect("tempdir");
    let project = SimulationProject::new(dir.path().join("qitSim_rec"));
    common::write_conf(&project);
    common::write_oscillating_trajectory(
        &project.artifact("_trajectories.npz"),
        400,
        0.1,
        50.0e3,
        150.0e3,
    );

    let options = SpectrumOptions {
        source: TransientSource::Reconstruct(AcceptanceRegion::default()),
        ..SpectrumOptions::default()
    };
    let rec = analyse_fft_simulation(&project, &options).expect("analyse fft simulation");
    assert_eq!(rec.transient.shape(), &[400, 2]);
    assert!((rec.time[399] - 39.9e-6).abs() < 1e-12);
    let bin = rec.frequencies[1];
    let light = peak_frequency(&rec.frequencies, rec.amplitudes.column(0).iter().copied());
    let heavy = peak_frequency(&rec.frequencies, rec.amplitudes.column(1).iter().copied());
    assert!((light - 50.0e3).abs() <= bin, "light peak at {light}");
    assert!((heavy - 150.0e3).abs() <= bin, "heavy peak at {heavy}");
}

#[test]
fn missing_project_files_fail() {
    let dir = tempfile::tempdir().expect("tempdir");
    let project = SimulationProject::new(dir.path().join("absent"));
    assert!(matches!(
        analyse_fft_simulation(&project, &SpectrumOptions::default()),
        Err(QitError::Io(_))
    ));
}

fn mixed_cloud(n_steps: usize) -> Trajectory {
    // particle 0 (mass 1) left of the axis, particle 1 (mass 2) right of it
    let mut pos = Array3::<f64>::zeros((2, 3, n_steps));
    for s in 0..n_steps {
        pos[[0, 0, s]] = -1.5;
        pos[[1, 0, s]] = 1.5;
        pos[[0, 2, s]] = 0.25;
        pos[[1, 2, s]] = 0.25;
    }
    let times = (0..n_steps).map(|s| s as f64 * 0.5).collect();
    Trajectory::new(StepArrays::Dense(pos), times)
        .expect("valid trajectory")
        .with_masses(vec![1.0, 2.0])
        .expect("with masses")
}

#[test]
fn comparison_frames_separate_species() {
    let tra = mixed_cloud(6);
    let grid = DensityGrid::new(SpatialLimits::Symmetric(3.0), BinCount::Uniform(5))
        .expect("density grid");
    let cmp = DensityComparison::new(
        &tra,
        &SpeciesSelector::Mass(1.0),
        &tra,
        &SpeciesSelector::Mass(2.0),
        FrameSequence::new(3, 2),
        grid,
    )
    .expect("density comparison")
    .with_scale(DensityScale::Linear)
    .with_alpha_factor(0.5);

    let frames: Vec<_> = cmp.frames().collect::<Result<_, _>>().expect("all frames");
    assert_eq!(frames.len(), 3);
    let last = &frames[2];
    assert_eq!(last.step, 4);
    assert_eq!(last.time, 2.0);
    // edges -3, -1.5, 0, 1.5, 3: z = 0.25 in bin 2, x = -1.5 in bin 1, x = 1.5 in bin 3
    assert_eq!(last.counts_a[[2, 1]], 1.0);
    assert_eq!(last.counts_b[[2, 3]], 1.0);
    assert!(last.relative_concentration[[2, 1]] > 0.99);
    assert_eq!(last.relative_concentration[[2, 3]], 0.0);
    assert_eq!(last.opacity[[2, 1]], 0.25);
    assert_eq!(last.image.shape(), &[4, 4, 4]);
    assert_eq!(last.image[[2, 3, 3]], 0.25);
    assert!(last.image[[2, 1, 0]] > last.image[[2, 1, 2]]);
    assert!(last.image[[2, 3, 2]] > last.image[[2, 3, 0]]);
}

#[test]
fn comparison_rejects_bad_requests() {
    let tra = mixed_cloud(6);
    let shorter = mixed_cloud(5);
    let grid = DensityGrid::comparison().expect("comparison grid");
    let a = SpeciesSelector::Mass(1.0);
    let b = SpeciesSelector::Mass(2.0);

    assert!(matches!(
        DensityComparison::new(&tra, &a, &tra, &b, FrameSequence::new(4, 2), grid.clone()),
        Err(QitError::Usage(_))
    ));
    assert!(matches!(
        DensityComparison::new(&tra, &a, &shorter, &b, FrameSequence::new(1, 1), grid.clone()),
        Err(QitError::Usage(_))
    ));
    assert!(DensityComparison::new(&tra, &a, &tra, &b, FrameSequence::new(3, 2), grid).is_ok());
}
