//! Contract ABI schema and runtime log decoding
//!
//! Schemas are loaded at runtime (no `sol!`-macro codegen): a
//! [`ContractAbi`] pairs an address with an ordered argument schema per
//! event, keyed by the event's topic0 signature hash. [`AbiParser`] uses
//! that schema to decode a [`RawLog`] into a name + argument map without
//! any compile-time knowledge of the contract.

use alloy_dyn_abi::DynSolValue;
use alloy_json_abi::JsonAbi;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EventError, Result};
use crate::event::RawLog;

/// A single decoded event argument.
///
/// Indexed arguments of a dynamic type (`string`, `bytes`, arrays) cannot
/// be recovered from a log topic — only their keccak256 hash is present
/// on-chain — so they decode to [`ArgValue::HashedIndexed`] rather than
/// a reconstructed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ArgValue {
    Address(Address),
    Uint(UintValue),
    FixedBytes(Bytes),
    Bytes(Bytes),
    String(String),
    Bool(bool),
    /// An indexed dynamic-type argument, surfaced as its topic hash since
    /// the original value cannot be recovered from the log alone.
    HashedIndexed(B256),
}

/// Wrapper so `U256` round-trips through JSON as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UintValue(#[serde(with = "uint_as_decimal")] pub U256);

mod uint_as_decimal {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(v: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let s = String::deserialize(d)?;
        U256::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// One argument position in an event's schema, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgSchema {
    pub name: String,
    /// Solidity type name, e.g. `"address"`, `"uint256"`, `"bytes32"`
    pub ty: String,
    pub indexed: bool,
}

fn is_dynamic_type(ty: &str) -> bool {
    ty == "string" || ty == "bytes" || ty.ends_with("[]")
}

/// A contract's known event schemas, keyed by topic0.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    pub address: Address,
    pub name: String,
    topic0_to_event: HashMap<B256, String>,
    events: HashMap<String, Vec<ArgSchema>>,
}

impl ContractAbi {
    /// Build an ABI schema directly from event definitions, without
    /// going through a JSON ABI document.
    pub fn new(
        address: Address,
        name: impl Into<String>,
        events: HashMap<String, Vec<ArgSchema>>,
    ) -> Self {
        let mut topic0_to_event = HashMap::with_capacity(events.len());
        for (event_name, args) in &events {
            let signature = format!(
                "{event_name}({})",
                args.iter()
                    .map(|a| a.ty.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            );
            topic0_to_event.insert(keccak256(signature.as_bytes()), event_name.clone());
        }
        Self {
            address,
            name: name.into(),
            topic0_to_event,
            events,
        }
    }

    /// Parse a standard JSON ABI document into a schema for `address`.
    pub fn from_json_abi(address: Address, name: impl Into<String>, json_abi: &JsonAbi) -> Self {
        let mut events = HashMap::new();
        for event in json_abi.events.values().flatten() {
            let args = event
                .inputs
                .iter()
                .map(|input| ArgSchema {
                    name: input.name.clone(),
                    ty: input.ty.clone(),
                    indexed: input.indexed,
                })
                .collect();
            events.insert(event.name.clone(), args);
        }
        Self::new(address, name, events)
    }

    fn event_name_for_topic0(&self, topic0: &B256) -> Option<&str> {
        self.topic0_to_event.get(topic0).map(|s| s.as_str())
    }

    fn schema_for(&self, event_name: &str) -> Option<&Vec<ArgSchema>> {
        self.events.get(event_name)
    }
}

/// Name + decoded argument map produced by a contract parser, annotated
/// with the provenance of the log it was decoded from (spec.md §4.3: "The
/// parsed event exposes: contract address, event name, block number,
/// transaction hash, log index, and a string-keyed map of decoded
/// arguments").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    pub address: Address,
    pub event_name: String,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
    pub args: HashMap<String, ArgValue>,
}

/// A parser capable of recognizing and decoding logs for one contract.
///
/// Implementations may be hand-written (a "custom parser" in the
/// registry, for contracts with bespoke decoding needs) or
/// schema-driven, as [`AbiParser`] is.
pub trait ContractParser: Send + Sync {
    /// Whether this parser recognizes `log` as one of its events.
    fn can_parse(&self, log: &RawLog) -> bool;

    /// Decode `log` into a named, typed argument map.
    fn parse(&self, log: &RawLog) -> Result<ParsedEvent>;
}

/// A [`ContractParser`] driven entirely by a [`ContractAbi`] schema —
/// no per-contract code, just topic0 lookup and type-directed decoding.
pub struct AbiParser {
    abi: ContractAbi,
}

impl AbiParser {
    pub fn new(abi: ContractAbi) -> Self {
        Self { abi }
    }

    pub fn address(&self) -> Address {
        self.abi.address
    }

    fn topic0(log: &RawLog) -> Option<&B256> {
        log.topics.first()
    }
}

impl ContractParser for AbiParser {
    fn can_parse(&self, log: &RawLog) -> bool {
        if log.address != self.abi.address || log.topics.is_empty() {
            return false;
        }
        Self::topic0(log)
            .and_then(|t0| self.abi.event_name_for_topic0(t0))
            .is_some()
    }

    fn parse(&self, log: &RawLog) -> Result<ParsedEvent> {
        let topic0 = Self::topic0(log).ok_or_else(|| {
            EventError::MalformedLog("log has no topics; cannot determine event signature".into())
        })?;
        let event_name = self
            .abi
            .event_name_for_topic0(topic0)
            .ok_or_else(|| EventError::NoParser(format!("{:#x}", self.abi.address)))?
            .to_string();
        let schema = self
            .abi
            .schema_for(&event_name)
            .expect("event_name came from topic0_to_event, schema must exist")
            .clone();

        let indexed_count = schema.iter().filter(|a| a.indexed).count();
        if log.topics.len() != indexed_count + 1 {
            return Err(EventError::MalformedLog(format!(
                "event '{event_name}' expects {indexed_count} indexed topics plus topic0, got {} topics",
                log.topics.len()
            )));
        }

        let mut args = HashMap::with_capacity(schema.len());
        let mut indexed_topics = log.topics[1..].iter();
        let non_indexed: Vec<&ArgSchema> = schema.iter().filter(|a| !a.indexed).collect();

        let decoded_non_indexed = decode_non_indexed(&non_indexed, &log.data)?;
        let mut decoded_iter = decoded_non_indexed.into_iter();

        for arg in &schema {
            if arg.indexed {
                let topic = indexed_topics.next().ok_or_else(|| {
                    EventError::MalformedLog(format!(
                        "event '{event_name}' missing topic for indexed argument '{}'",
                        arg.name
                    ))
                })?;
                args.insert(arg.name.clone(), decode_indexed(&arg.ty, topic)?);
            } else {
                let value = decoded_iter.next().ok_or_else(|| {
                    EventError::MalformedLog(format!(
                        "event '{event_name}' missing data for argument '{}'",
                        arg.name
                    ))
                })?;
                args.insert(arg.name.clone(), value);
            }
        }

        Ok(ParsedEvent {
            address: log.address,
            event_name,
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
            args,
        })
    }
}

fn decode_indexed(ty: &str, topic: &B256) -> Result<ArgValue> {
    if is_dynamic_type(ty) {
        return Ok(ArgValue::HashedIndexed(*topic));
    }
    match ty {
        "address" => Ok(ArgValue::Address(Address::from_word(*topic))),
        "bool" => Ok(ArgValue::Bool(topic.0[31] != 0)),
        t if t.starts_with("uint") || t.starts_with("int") => {
            Ok(ArgValue::Uint(UintValue(U256::from_be_bytes(topic.0))))
        }
        t if t.starts_with("bytes") => Ok(ArgValue::FixedBytes(Bytes::copy_from_slice(&topic.0))),
        other => Err(EventError::MalformedLog(format!(
            "unsupported indexed argument type '{other}'"
        ))),
    }
}

/// Decode the non-indexed portion of a log's data as a tuple of `schema`'s
/// types, in order, using `alloy_dyn_abi`'s ABI decoder.
fn decode_non_indexed(schema: &[&ArgSchema], data: &[u8]) -> Result<Vec<ArgValue>> {
    if schema.is_empty() {
        return Ok(Vec::new());
    }

    let types: Result<Vec<alloy_dyn_abi::DynSolType>> = schema
        .iter()
        .map(|a| {
            a.ty.parse::<alloy_dyn_abi::DynSolType>()
                .map_err(|e| EventError::MalformedLog(format!("unknown type '{}': {e}", a.ty)))
        })
        .collect();
    let types = types?;
    let tuple_ty = alloy_dyn_abi::DynSolType::Tuple(types);

    let decoded = tuple_ty
        .abi_decode_sequence(data)
        .map_err(|e| EventError::MalformedLog(format!("failed to decode log data: {e}")))?;

    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };

    if values.len() != schema.len() {
        return Err(EventError::MalformedLog(format!(
            "expected {} decoded values, got {}",
            schema.len(),
            values.len()
        )));
    }

    values.into_iter().map(dyn_value_to_arg_value).collect()
}

fn dyn_value_to_arg_value(value: DynSolValue) -> Result<ArgValue> {
    match value {
        DynSolValue::Address(a) => Ok(ArgValue::Address(a)),
        DynSolValue::Bool(b) => Ok(ArgValue::Bool(b)),
        DynSolValue::Uint(u, _) => Ok(ArgValue::Uint(UintValue(u))),
        DynSolValue::Int(i, _) => Ok(ArgValue::Uint(UintValue(i.into_raw()))),
        DynSolValue::FixedBytes(b, _) => Ok(ArgValue::FixedBytes(Bytes::copy_from_slice(b.as_slice()))),
        DynSolValue::Bytes(b) => Ok(ArgValue::Bytes(Bytes::from(b))),
        DynSolValue::String(s) => Ok(ArgValue::String(s)),
        other => Err(EventError::MalformedLog(format!(
            "unsupported decoded argument shape: {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_abi(address: Address) -> ContractAbi {
        let mut events = HashMap::new();
        events.insert(
            "Transfer".to_string(),
            vec![
                ArgSchema {
                    name: "from".into(),
                    ty: "address".into(),
                    indexed: true,
                },
                ArgSchema {
                    name: "to".into(),
                    ty: "address".into(),
                    indexed: true,
                },
                ArgSchema {
                    name: "value".into(),
                    ty: "uint256".into(),
                    indexed: false,
                },
            ],
        );
        ContractAbi::new(address, "ERC20", events)
    }

    #[test]
    fn test_transfer_topic0_matches_known_signature() {
        let abi = transfer_abi(Address::ZERO);
        let expected = keccak256("Transfer(address,address,uint256)".as_bytes());
        assert_eq!(abi.event_name_for_topic0(&expected), Some("Transfer"));
    }

    #[test]
    fn test_decode_transfer_log() {
        let address = Address::repeat_byte(0x11);
        let abi = transfer_abi(address);
        let parser = AbiParser::new(abi);

        let from = Address::repeat_byte(0xAA);
        let to = Address::repeat_byte(0xBB);
        let topic0 = keccak256("Transfer(address,address,uint256)".as_bytes());

        let data: [u8; 32] = U256::from(1_000_000u64).to_be_bytes();

        let log = RawLog {
            address,
            topics: vec![topic0, from.into_word(), to.into_word()],
            data: Bytes::copy_from_slice(&data),
            block_number: 1,
            transaction_hash: B256::repeat_byte(0xCC),
            log_index: 0,
        };

        assert!(parser.can_parse(&log));
        let parsed = parser.parse(&log).expect("should decode");
        assert_eq!(parsed.event_name, "Transfer");
        assert_eq!(parsed.args.get("from"), Some(&ArgValue::Address(from)));
        assert_eq!(parsed.args.get("to"), Some(&ArgValue::Address(to)));
        assert_eq!(
            parsed.args.get("value"),
            Some(&ArgValue::Uint(UintValue(U256::from(1_000_000u64))))
        );
    }

    #[test]
    fn test_topic_count_mismatch_is_malformed() {
        let address = Address::repeat_byte(0x11);
        let abi = transfer_abi(address);
        let parser = AbiParser::new(abi);
        let topic0 = keccak256("Transfer(address,address,uint256)".as_bytes());
        let log = RawLog {
            address,
            topics: vec![topic0],
            data: Bytes::copy_from_slice(&[0u8; 32]),
            block_number: 1,
            transaction_hash: B256::ZERO,
            log_index: 0,
        };
        assert!(matches!(parser.parse(&log), Err(EventError::MalformedLog(_))));
    }

    #[test]
    fn test_unknown_topic0_cannot_parse() {
        let address = Address::repeat_byte(0x11);
        let abi = transfer_abi(address);
        let parser = AbiParser::new(abi);
        let mut unknown = [0u8; 32];
        unknown[31] = 1;
        let log = RawLog {
            address,
            topics: vec![B256::from(unknown)],
            data: Bytes::new(),
            block_number: 1,
            transaction_hash: B256::ZERO,
            log_index: 0,
        };
        assert!(!parser.can_parse(&log));
    }
}
