//! Inferoute Dispatcher
//!
//! Routes inference jobs to the least-loaded worker backend, tracking
//! backend health and self-reported load in an in-memory registry.

pub mod balancer;
pub mod prober;
pub mod registry;
pub mod server;

pub use balancer::Balancer;
pub use prober::HealthProber;
pub use registry::{BackendRecord, BackendRegistry};
pub use server::{build_router, AppState};
