#![forbid(unsafe_code)]

pub mod centers;
pub mod config;
pub mod error;
pub mod filter;
pub mod trajectory;

pub use centers::{center_of_charge, center_of_positions};
pub use config::SimulationConfig;
pub use error::{QitError, QitResult};
pub use filter::{filter_mass, filter_parameter, ParameterValues, SpeciesSelector};
pub use trajectory::{
    Attributes, Positions, StepArrays, Trajectory, CHEMICAL_ID_ATTRIBUTE, SPATIAL_DIMS,
};
