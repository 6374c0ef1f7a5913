//! Inferoute Worker
//!
//! Executes inference jobs against the compute collaborator while
//! self-reporting its in-flight load to the dispatcher.

pub mod compute;
pub mod load;
pub mod server;

pub use compute::ComputeClient;
pub use load::{LoadReporter, LoadTracker};
pub use server::{build_router, AppState};
