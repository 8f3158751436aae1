//! qwatch - Slurm pending-queue contention analyzer and live queue dashboard

pub mod analyzer;
pub mod contention;
pub mod display;
pub mod error;
pub mod formatting;
pub mod models;
pub mod normalize;
pub mod slurm;
pub mod snapshot;
pub mod tui;
pub mod utils;
