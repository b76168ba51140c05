pub mod api_endpoint;
pub mod args;
pub mod bottleneck;
pub mod duplex_metrics;
pub mod profile;
pub mod report;
pub mod result;
pub mod role_credential;
pub mod setup;
pub mod step_option;
