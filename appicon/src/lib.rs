pub mod cli;
pub mod config;
pub mod generator;

pub use config::{IconConfig, OutputRole, OutputSpec};
pub use generator::{Outcome, generate};
