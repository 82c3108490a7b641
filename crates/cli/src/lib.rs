//! Public library modules for the CLI crate
pub mod doctor;
pub mod log_stats;
pub mod logging;
