//! Storm animation job.
//!
//! Given a storm start date and duration, loads the hourly precipitation
//! partitions for that window, renders one frame per hour over the
//! watershed, assembles the frames into an animated GIF and uploads it.

pub mod config;
pub mod logging;
pub mod params;
pub mod pipeline;

pub use config::StormConfig;
pub use params::PluginParams;
pub use pipeline::{run, RunResult};
