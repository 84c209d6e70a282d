//! Adaptive filter-chain configuration.
//!
//! ```text
//! AudioMeasurements ─▶ DerivationContext (floor, speech level) ─▶ DERIVATIONS ─▶ FilterChainConfig
//! ```

pub mod derive;
pub mod filter_chain;

pub use derive::{configure, AdaptiveConfigurator, Derivation, DerivationContext, DERIVATIONS};
pub use filter_chain::{FilterChainConfig, NormalizationMode};
