//! Inferoute Edge
//!
//! User-facing front door: a question form that submits jobs to the
//! dispatcher and a small cluster-health dashboard.

pub mod server;

pub use server::{build_router, AppState};
