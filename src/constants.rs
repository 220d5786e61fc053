//! Well-known system-contract addresses and event signatures
//!
//! A small, immutable compile-time table — not a mutable global registry
//! (`spec.md` §9 rejects global mutable state for the parser registry;
//! this table is read-only reference data, not a substitute for it).

/// Event name emitted for chain configuration changes.
pub const CHAIN_CONFIG_EVENT: &str = "ChainConfigUpdated";

/// Event name emitted for validator set changes.
pub const VALIDATOR_SET_EVENT: &str = "ValidatorSetUpdated";

/// Well-known system contract names, for diagnostics and tests.
pub const SYSTEM_CONTRACT_NAMES: &[&str] = &["ChainConfig", "ValidatorSet", "Staking"];
