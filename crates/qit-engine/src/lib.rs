//! Derived quantities of ion trap trajectories: spectra, densities, centers of charge.

pub mod coc;
pub mod density;
pub mod frames;
pub mod spectrum;
pub mod stability;

pub use coc::{species_centers_of_charge, CocTraceAnimation, SpeciesCenters};
pub use density::{
    histogram2d, relative_concentration, xz_density, BinCount, BinEdges, Colormap,
    ComparisonFrame, CoolWarm, DensityAnimation, DensityComparison, DensityField, DensityGrid,
    DensityScale, SpatialLimits,
};
pub use frames::FrameSequence;
pub use spectrum::{
    analyse_fft_simulation, fft_spectrum, reconstruct_transient, transient_from_trajectory,
    AcceptanceRegion, RadialMeasure, SpectralRecord, Spectrum, SpectrumOptions, Transient,
    TransientSource,
};
pub use stability::{qit_stability_parameters, StabilityParameters};
