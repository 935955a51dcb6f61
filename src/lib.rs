//! Connected spin-correlation spectra from simulation output tables.
//!
//! A data directory holds one magnetization file (`mag*`) and one
//! correlation file per lattice distance (`corr*-r<n>.out`). The pipeline
//! parses them ([`data::loader`]), subtracts the disconnected part
//! ([`correlation`]) and reduces the result to six spectrum components per
//! momentum index ([`spectrum`]).

pub mod correlation;
pub mod data;
pub mod output;
pub mod pipeline;
pub mod spectrum;
