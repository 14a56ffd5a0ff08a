//! qit-analysis CLI: post-processing of ion trap simulation output.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use ndarray::ArrayView2;

use qit_core::error::{QitError, QitResult};
use qit_core::filter::SpeciesSelector;
use qit_core::trajectory::Trajectory;
use qit_engine::{
    analyse_fft_simulation, qit_stability_parameters, species_centers_of_charge, xz_density,
    AcceptanceRegion, BinCount, DensityGrid, RadialMeasure, SpatialLimits, SpectrumOptions,
    TransientSource,
};
use qit_io::{read_trajectory_file, SimulationProject, TrajectoryFormat};

#[derive(Parser)]
#[command(
    name = "qit-analysis",
    version,
    about = "Analysis of ion trap simulation trajectories and records"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Container,
}

impl From<FormatArg> for TrajectoryFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => TrajectoryFormat::Json,
            FormatArg::Container => TrajectoryFormat::Container,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a trajectory file.
    Info {
        trajectory: PathBuf,
        /// Format override; detected from the file name when omitted.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Spectrum of a simulation project's transient.
    ///
    /// Writes <name>_spectrum.txt and <name>_transient.txt to the output directory.
    Spectrum {
        /// Project prefix, e.g. runs/qitSim_2019_04_10_002
        project: PathBuf,
        /// Start of the frequency window as a fraction of the full range.
        #[arg(long, default_value_t = 0.0)]
        freq_start: f64,
        /// End of the frequency window as a fraction of the full range.
        #[arg(long, default_value_t = 1.0)]
        freq_stop: f64,
        /// Reconstruct the transient from the trajectory instead of the fft record.
        #[arg(long)]
        reconstruct: bool,
        /// Acceptance radius of the reconstructed detection.
        #[arg(long, default_value_t = qit_engine::spectrum::DEFAULT_ACCEPTANCE_RADIUS)]
        radius: f64,
        /// Measure the acceptance radius from the trap centre instead of the axis.
        #[arg(long)]
        spherical: bool,
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Center of charge per step, optionally of two species selected by mass.
    Coc {
        trajectory: PathBuf,
        #[arg(long, num_args = 2, value_names = ["MASS_A", "MASS_B"])]
        masses: Option<Vec<f64>>,
        /// First step (inclusive).
        #[arg(long)]
        start: Option<usize>,
        /// Last step (exclusive).
        #[arg(long)]
        stop: Option<usize>,
    },
    /// Particle density in the x/z plane at one step.
    Density {
        trajectory: PathBuf,
        #[arg(long, default_value_t = 0)]
        step: usize,
        /// Only count particles of this mass.
        #[arg(long)]
        mass: Option<f64>,
        /// Half width of the window.
        #[arg(long, default_value_t = 10.0)]
        limit: f64,
        /// Number of bin edges per axis.
        #[arg(long, default_value_t = 80)]
        edges: usize,
    },
    /// Stability parameters of an ideal quadrupole ion trap.
    Stability {
        /// Ion mass in amu.
        #[arg(long)]
        mass: f64,
        /// RF amplitude in volts.
        #[arg(long)]
        v_rf: f64,
        /// RF frequency in Hz.
        #[arg(long)]
        f_rf: f64,
        /// Ring electrode radius in metres.
        #[arg(long, default_value_t = qit_engine::stability::DEFAULT_R0)]
        r0: f64,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(e) = run_cli() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_cli() -> QitResult<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match cli.command {
        Commands::Info { trajectory, format } => {
            run_info(&trajectory, format.map(Into::into), &mut out)
        }
        Commands::Spectrum {
            project,
            freq_start,
            freq_stop,
            reconstruct,
            radius,
            spherical,
            output_dir,
        } => {
            let source = if reconstruct {
                TransientSource::Reconstruct(AcceptanceRegion {
                    radius,
                    measure: if spherical {
                        RadialMeasure::Spherical
                    } else {
                        RadialMeasure::Cylindrical
                    },
                })
            } else {
                TransientSource::FftRecord
            };
            let options = SpectrumOptions {
                freq_start,
                freq_stop,
                source,
            };
            run_spectrum(&SimulationProject::new(project), &options, &output_dir)
        }
        Commands::Coc {
            trajectory,
            masses,
            start,
            stop,
        } => run_coc(&trajectory, masses.as_deref(), start, stop, &mut out),
        Commands::Density {
            trajectory,
            step,
            mass,
            limit,
            edges,
        } => run_density(&trajectory, step, mass, limit, edges, &mut out),
        Commands::Stability {
            mass,
            v_rf,
            f_rf,
            r0,
        } => {
            let p = qit_stability_parameters(mass, v_rf, f_rf, r0)?;
            writeln!(out, "q_z {:.6}", p.q_z)?;
            writeln!(out, "well_depth_V {:.6}", p.well_depth)?;
            writeln!(out, "lmco_amu {:.6}", p.lmco)?;
            Ok(())
        }
    }?;
    out.flush()?;
    Ok(())
}

fn read(path: &Path, format: Option<TrajectoryFormat>) -> QitResult<Trajectory> {
    Ok(read_trajectory_file(path, format)?.trajectory)
}

fn run_info(path: &Path, format: Option<TrajectoryFormat>, out: &mut impl Write) -> QitResult<()> {
    let file = read_trajectory_file(path, format)?;
    let tra = &file.trajectory;
    writeln!(out, "file          {}", path.display())?;
    writeln!(out, "format        {:?} v{}", file.format, file.file_version_id)?;
    writeln!(out, "steps         {}", tra.len())?;
    writeln!(out, "static        {}", tra.is_static_trajectory())?;
    if let (Some(first), Some(last)) = (tra.times().first(), tra.times().last()) {
        writeln!(out, "time range    {first} .. {last}")?;
    }
    match tra.n_particles() {
        Some(n) => writeln!(out, "particles     {n}")?,
        None => {
            let counts: Vec<usize> = (0..tra.len())
                .filter_map(|s| tra.particle_count(s))
                .collect();
            let min = counts.iter().min().copied().unwrap_or(0);
            let max = counts.iter().max().copied().unwrap_or(0);
            writeln!(out, "particles     {min} .. {max}")?;
        }
    }
    if let Some(masses) = tra.masses() {
        let distinct = qit_engine::spectrum::distinct_masses(masses);
        writeln!(out, "masses        {distinct:?}")?;
    }
    if !tra.additional_attribute_names().is_empty() {
        writeln!(out, "attributes    {}", tra.additional_attribute_names().join(", "))?;
    }
    Ok(())
}

fn write_table(out: &mut impl Write, header: &str, columns: &[&[f64]]) -> QitResult<()> {
    writeln!(out, "# {header}")?;
    let n_rows = columns.iter().map(|c| c.len()).min().unwrap_or(0);
    for row in 0..n_rows {
        let line: Vec<String> = columns.iter().map(|c| format!("{:e}", c[row])).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    Ok(())
}

fn write_matrix(
    out: &mut impl Write,
    header: &str,
    leading: &[f64],
    values: ArrayView2<'_, f64>,
) -> QitResult<()> {
    writeln!(out, "# {header}")?;
    for (lead, row) in leading.iter().zip(values.rows()) {
        let mut line = format!("{lead:e}");
        for v in row {
            line.push_str(&format!(" {v:e}"));
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn run_spectrum(
    project: &SimulationProject,
    options: &SpectrumOptions,
    output_dir: &Path,
) -> QitResult<()> {
    let rec = analyse_fft_simulation(project, options)?;
    let name = project.name();
    let spectrum_path = output_dir.join(format!("{name}_spectrum.txt"));
    let mut w = BufWriter::new(File::create(&spectrum_path)?);
    write_matrix(
        &mut w,
        &format!("{}\n# freq_hz amplitude...", rec.title),
        &rec.frequencies,
        rec.amplitudes.view(),
    )?;
    w.flush()?;

    let transient_path = output_dir.join(format!("{name}_transient.txt"));
    let mut w = BufWriter::new(File::create(&transient_path)?);
    write_matrix(&mut w, "time_s signal...", &rec.time, rec.transient.view())?;
    w.flush()?;
    log::info!(
        "wrote {} and {}",
        spectrum_path.display(),
        transient_path.display()
    );
    Ok(())
}

fn run_coc(
    path: &Path,
    masses: Option<&[f64]>,
    start: Option<usize>,
    stop: Option<usize>,
    out: &mut impl Write,
) -> QitResult<()> {
    let tra = read(path, None)?;
    let steps = step_range(start, stop, tra.len())?;
    match masses {
        Some([a, b]) => {
            let c = species_centers_of_charge(
                &tra,
                &SpeciesSelector::Mass(*a),
                &SpeciesSelector::Mass(*b),
                steps.as_deref(),
            )?;
            let cols: Vec<Vec<f64>> = [&c.coc_a, &c.coc_b, &c.coc_all]
                .iter()
                .flat_map(|m| {
                    m.columns()
                        .into_iter()
                        .map(|col| col.to_vec())
                        .collect::<Vec<_>>()
                })
                .collect();
            let mut table: Vec<&[f64]> = vec![c.times.as_slice()];
            table.extend(cols.iter().map(Vec::as_slice));
            write_table(out, "time ax ay az bx by bz x y z", &table)
        }
        _ => {
            let tra = match &steps {
                Some(steps) => tra.select_steps(steps)?,
                None => tra,
            };
            let coc = qit_core::centers::center_of_charge(tra.positions());
            write_matrix(out, "time x y z", tra.times(), coc.view())
        }
    }
}

/// Steps `[start, stop)` of a trajectory with `n_steps` steps; `None` keeps all of them.
fn step_range(
    start: Option<usize>,
    stop: Option<usize>,
    n_steps: usize,
) -> QitResult<Option<Vec<usize>>> {
    if start.is_none() && stop.is_none() {
        return Ok(None);
    }
    let start = start.unwrap_or(0);
    let stop = stop.unwrap_or(n_steps);
    if start >= stop || stop > n_steps {
        return Err(QitError::Usage(format!(
            "step range {start}..{stop} is empty or exceeds the {n_steps} steps of the trajectory"
        )));
    }
    Ok(Some((start..stop).collect()))
}

fn run_density(
    path: &Path,
    step: usize,
    mass: Option<f64>,
    limit: f64,
    edges: usize,
    out: &mut impl Write,
) -> QitResult<()> {
    let tra = read(path, None)?;
    let positions = match mass {
        Some(m) => SpeciesSelector::Mass(m).select_positions(&tra)?,
        None => tra.positions().clone(),
    };
    let grid = DensityGrid::new(SpatialLimits::Symmetric(limit), BinCount::Uniform(edges))?;
    let field = xz_density(&positions, step, &grid)?;
    writeln!(out, "# rows: z bins, columns: x bins")?;
    writeln!(out, "# x centers {:?}", grid.x_edges.centers())?;
    writeln!(out, "# z centers {:?}", grid.z_edges.centers())?;
    for row in field.counts.rows() {
        let line: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    Ok(())
}
