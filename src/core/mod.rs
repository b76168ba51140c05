pub mod bottleneck;
pub mod check_target;
pub mod duplex;
pub mod execute;
pub mod orchestrator;
pub mod percentile;
pub mod progress;
pub mod provision;
pub mod recommend;
pub mod report_writer;
pub mod show_result_with_table;
pub mod sleep_guard;
pub mod stress;
pub mod summary;
