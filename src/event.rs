//! Core event model
//!
//! `Event` is a tagged union over the six domain event kinds the bus
//! fans out. Every variant shares a small common contract: a kind tag
//! and a creation timestamp.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::abi::ArgValue;

/// Tag identifying which `Event` variant a value carries.
///
/// Subscriptions express interest as a set of `EventKind`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Block,
    Transaction,
    Log,
    ChainConfig,
    ValidatorSet,
    SystemContract,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Block => "Block",
            EventKind::Transaction => "Transaction",
            EventKind::Log => "Log",
            EventKind::ChainConfig => "ChainConfig",
            EventKind::ValidatorSet => "ValidatorSet",
            EventKind::SystemContract => "SystemContract",
        };
        f.write_str(s)
    }
}

/// Arbitrary-precision integer carried as a decimal string at the
/// serialization boundary, to avoid precision loss (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DecimalU256(pub U256);

impl From<U256> for DecimalU256 {
    fn from(v: U256) -> Self {
        Self(v)
    }
}

impl From<DecimalU256> for U256 {
    fn from(v: DecimalU256) -> Self {
        v.0
    }
}

impl fmt::Display for DecimalU256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DecimalU256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for DecimalU256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        U256::from_str(&s)
            .map(DecimalU256)
            .map_err(serde::de::Error::custom)
    }
}

/// Reference to a transaction's on-chain receipt.
///
/// Kept opaque — receipt shape is owned by the node-client collaborator,
/// not this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRef {
    /// Hash of the transaction the receipt belongs to
    pub transaction_hash: B256,
    /// Whether the transaction succeeded
    pub success: bool,
    /// Gas used, if known
    pub gas_used: Option<u64>,
}

/// A raw, undecoded contract log record as produced by the node client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    /// Contract address that emitted the log
    pub address: Address,
    /// Topics; `topics[0]` is the event signature hash when non-anonymous
    pub topics: Vec<B256>,
    /// ABI-encoded, non-indexed event data
    pub data: Bytes,
    /// Block number the log was emitted in
    pub block_number: u64,
    /// Hash of the transaction that emitted the log
    pub transaction_hash: B256,
    /// Index of the log within its block
    pub log_index: u64,
}

/// Opaque reference to a block body.
///
/// The node client owns the concrete block representation; this crate
/// only needs to carry it through unopened.
pub type BlockBody = serde_json::Value;

/// A domain event flowing through the bus.
///
/// Every variant carries a creation timestamp via [`Event::created_at`]
/// and a kind tag via [`Event::kind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Event {
    /// A newly produced block
    Block {
        number: u64,
        hash: B256,
        transaction_count: u64,
        body: BlockBody,
        created_at: chrono::DateTime<chrono::Utc>,
    },
    /// A confirmed transaction
    Transaction {
        sender: Address,
        /// Absent for contract-creation transactions
        recipient: Option<Address>,
        value: DecimalU256,
        block_number: u64,
        block_hash: B256,
        index: u64,
        receipt: Option<ReceiptRef>,
        created_at: chrono::DateTime<chrono::Utc>,
    },
    /// A raw, undecoded contract log
    Log {
        log: RawLog,
        created_at: chrono::DateTime<chrono::Utc>,
    },
    /// A chain configuration change
    ChainConfig {
        config: serde_json::Value,
        created_at: chrono::DateTime<chrono::Utc>,
    },
    /// A validator set change
    ValidatorSet {
        validators: Vec<Address>,
        created_at: chrono::DateTime<chrono::Utc>,
    },
    /// A decoded, named system-contract event, produced by the pipeline's
    /// publish stage (spec.md §4.5 `PublishStage`)
    SystemContract {
        address: Address,
        event_name: String,
        block_number: u64,
        transaction_hash: B256,
        log_index: u64,
        args: HashMap<String, ArgValue>,
        created_at: chrono::DateTime<chrono::Utc>,
    },
}

impl Event {
    /// The kind tag for this event
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Block { .. } => EventKind::Block,
            Event::Transaction { .. } => EventKind::Transaction,
            Event::Log { .. } => EventKind::Log,
            Event::ChainConfig { .. } => EventKind::ChainConfig,
            Event::ValidatorSet { .. } => EventKind::ValidatorSet,
            Event::SystemContract { .. } => EventKind::SystemContract,
        }
    }

    /// When this event was created
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            Event::Block { created_at, .. }
            | Event::Transaction { created_at, .. }
            | Event::Log { created_at, .. }
            | Event::ChainConfig { created_at, .. }
            | Event::ValidatorSet { created_at, .. }
            | Event::SystemContract { created_at, .. } => *created_at,
        }
    }

    /// Build a `SystemContract` event wrapping a parsed pipeline event,
    /// stamping the current time as its creation instant.
    pub fn system_contract(
        address: Address,
        event_name: impl Into<String>,
        block_number: u64,
        transaction_hash: B256,
        log_index: u64,
        args: HashMap<String, ArgValue>,
    ) -> Self {
        Event::SystemContract {
            address,
            event_name: event_name.into(),
            block_number,
            transaction_hash,
            log_index,
            args,
            created_at: chrono::Utc::now(),
        }
    }
}
