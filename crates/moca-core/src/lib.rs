//! moca-core — Task catalog, scoring rules and aggregation for MoCA
//! administrations.
//!
//! Deterministic scorers, the model-assisted adapter, the session engine and
//! the final report all live here. Model backends are implemented in
//! `moca-providers`.

pub mod artifact;
pub mod assisted;
pub mod catalog;
pub mod clock;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod response;
pub mod rubric;
pub mod scoring;
pub mod session;
pub mod stimuli;
pub mod store;
pub mod traits;
