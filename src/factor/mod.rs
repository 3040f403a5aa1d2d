pub mod init;
pub mod update_rules;
pub mod wnmf;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenience
pub use init::init_factors;
pub use update_rules::weighted_loss;
pub use wnmf::{DenominatorGuard, FittedFactors, WnmfConfig, WnmfModel};
