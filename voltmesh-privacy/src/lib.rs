//! Privacy engine for cross-participant payloads.
//!
//! Every outbound payload passes through one of five tiers before it leaves
//! its owner. The homomorphic and secure-MPC tiers are simulations: they
//! return structurally valid, non-reversible placeholders and make no
//! cryptographic claim.

pub mod aggregated;
pub mod config;
pub mod dp;
pub mod engine;
pub mod errors;
pub mod fhe;
pub mod hash;
pub mod mpc;
pub mod tier;

pub use aggregated::AggregatedTransform;
pub use config::PrivacyConfig;
pub use dp::LaplaceMechanism;
pub use engine::{PassThrough, PrivacyEngine, PrivacyTransform};
pub use errors::{PrivacyError, PrivacyResult};
pub use fhe::HomomorphicSimulator;
pub use hash::ContentHash;
pub use mpc::{SecureAggregate, SecureMpcSimulator};
pub use tier::PrivacyTier;
