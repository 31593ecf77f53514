//! Readiness orchestration
//!
//! Walks every selected domain of a managed certificate, resolves which
//! challenge config applies and runs the matching network probes,
//! aggregating per-domain results without short-circuiting.

pub mod orchestrator;

pub use orchestrator::{DomainProber, ReadinessOrchestrator};
