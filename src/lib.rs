pub mod core;
pub mod error;
pub mod models;

pub use crate::core::orchestrator::{run, RunOutcome};
pub use crate::models::profile::{Profile, RunConfig};
pub use crate::models::setup::TargetConfig;
