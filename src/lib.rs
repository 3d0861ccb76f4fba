//! user-recon - behavioral and structural signals from usernames
//!
//! Entropy and pattern characterization, hybrid similarity scoring, alias
//! prediction, unsupervised outlier detection and templated explanations,
//! plus trained vector-space and label models persisted as JSON.

pub mod aliases;
pub mod anomaly;
pub mod config;
pub mod entropy;
pub mod error;
pub mod features;
pub mod patterns;
pub mod pipeline;
pub mod presence;
pub mod reasoning;
pub mod security;
pub mod similarity;
pub mod text;
pub mod trainer;

pub use error::{ReconError, ReconResult};
