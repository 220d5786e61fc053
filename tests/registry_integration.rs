//! Integration tests for the parser registry and contract-log pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use chain_event_bus::{
    ArgSchema, ArgValue, ContractAbi, EventBus, EventKind, EventPipeline, Handler, ParsedEvent,
    ParserRegistry, RawLog, StorageHandler, UintValue,
};

fn erc20_transfer_abi(address: Address) -> ContractAbi {
    let mut events = HashMap::new();
    events.insert(
        "Transfer".to_string(),
        vec![
            ArgSchema { name: "from".into(), ty: "address".into(), indexed: true },
            ArgSchema { name: "to".into(), ty: "address".into(), indexed: true },
            ArgSchema { name: "value".into(), ty: "uint256".into(), indexed: false },
        ],
    );
    ContractAbi::new(address, "ERC20", events)
}

fn transfer_log(address: Address, from: Address, to: Address, value: u64) -> RawLog {
    let topic0 = keccak256("Transfer(address,address,uint256)".as_bytes());
    let data: [u8; 32] = U256::from(value).to_be_bytes();
    RawLog {
        address,
        topics: vec![topic0, from.into_word(), to.into_word()],
        data: Bytes::copy_from_slice(&data),
        block_number: 55,
        transaction_hash: B256::repeat_byte(0x42),
        log_index: 3,
    }
}

struct RecordingHandler {
    event_name: String,
    calls: Arc<AtomicUsize>,
    /// Log index the handler observed on its most recent invocation, so
    /// tests can confirm log provenance reaches the handler stage.
    seen_log_index: Arc<std::sync::atomic::AtomicU64>,
}

#[async_trait]
impl Handler for RecordingHandler {
    fn event_name(&self) -> &str {
        &self.event_name
    }

    async fn handle(&self, event: &ParsedEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_log_index.store(event.log_index, Ordering::SeqCst);
        Ok(())
    }
}

struct RecordingStorage {
    types: Vec<String>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl StorageHandler for RecordingStorage {
    fn event_types(&self) -> &[String] {
        &self.types
    }

    async fn store(&self, _event: &ParsedEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn scenario_transfer_log_dispatches_once_through_every_stage() {
    let address = Address::repeat_byte(0x77);
    let registry = Arc::new(ParserRegistry::new());
    registry.register_abi(erc20_transfer_abi(address)).unwrap();

    let handler_calls = Arc::new(AtomicUsize::new(0));
    let storage_calls = Arc::new(AtomicUsize::new(0));
    let handler_seen_log_index = Arc::new(std::sync::atomic::AtomicU64::new(u64::MAX));
    registry
        .register_handler(Arc::new(RecordingHandler {
            event_name: "Transfer".to_string(),
            calls: handler_calls.clone(),
            seen_log_index: handler_seen_log_index.clone(),
        }))
        .unwrap();
    registry
        .register_storage_handler(Arc::new(RecordingStorage {
            types: vec!["Transfer".to_string()],
            calls: storage_calls.clone(),
        }))
        .unwrap();

    let bus = EventBus::new();
    let mut bus_watcher = bus
        .subscribe("bus-watcher", [EventKind::SystemContract], None, 8)
        .await
        .unwrap();

    let pipeline = EventPipeline::new(registry, bus);

    let from = Address::repeat_byte(0xA1);
    let to = Address::repeat_byte(0xB2);
    let parsed = pipeline
        .process_log(&transfer_log(address, from, to, 555))
        .await
        .expect("known ABI, should decode and dispatch cleanly");

    assert_eq!(parsed.address, address);
    assert_eq!(parsed.event_name, "Transfer");
    assert_eq!(parsed.block_number, 55);
    assert_eq!(parsed.transaction_hash, B256::repeat_byte(0x42));
    assert_eq!(parsed.log_index, 3);
    assert_eq!(parsed.args.get("from"), Some(&ArgValue::Address(from)));
    assert_eq!(parsed.args.get("to"), Some(&ArgValue::Address(to)));
    assert_eq!(
        parsed.args.get("value"),
        Some(&ArgValue::Uint(UintValue(U256::from(555u64))))
    );

    // the handler must see the log's provenance, not just its args
    assert_eq!(handler_seen_log_index.load(Ordering::SeqCst), 3);

    assert_eq!(handler_calls.load(Ordering::SeqCst), 1);
    assert_eq!(storage_calls.load(Ordering::SeqCst), 1);

    let republished = bus_watcher.recv().await.expect("pipeline should publish a SystemContract event");
    match republished {
        chain_event_bus::Event::SystemContract { event_name, args, .. } => {
            assert_eq!(event_name, "Transfer");
            assert_eq!(args.get("to"), Some(&ArgValue::Address(to)));
        }
        other => panic!("expected SystemContract event, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_unregistered_address_has_no_side_effects() {
    let registry = Arc::new(ParserRegistry::new());
    let handler_calls = Arc::new(AtomicUsize::new(0));
    registry
        .register_handler(Arc::new(RecordingHandler {
            event_name: "*".to_string(),
            calls: handler_calls.clone(),
            seen_log_index: Arc::new(std::sync::atomic::AtomicU64::new(u64::MAX)),
        }))
        .unwrap();

    let bus = EventBus::new();
    let mut bus_watcher = bus
        .subscribe("bus-watcher", [EventKind::SystemContract], None, 8)
        .await
        .unwrap();

    let pipeline = EventPipeline::new(registry, bus);

    let unknown_address = Address::repeat_byte(0x99);
    let err = pipeline
        .process_log(&transfer_log(
            unknown_address,
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
            1,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, chain_event_bus::EventError::NoParser(_)));
    assert_eq!(handler_calls.load(Ordering::SeqCst), 0);
    assert!(bus_watcher.try_recv().is_err());
}

#[test]
fn abi_decodes_a_handwritten_transfer_log_end_to_end() {
    // A realistic, non-mechanical decode: construct a log the way a node
    // client would hand it to us, then check the full decoded shape.
    let address = Address::repeat_byte(0x33);
    let abi = erc20_transfer_abi(address);
    let registry = ParserRegistry::new();
    registry.register_abi(abi).unwrap();

    let from = Address::repeat_byte(0x10);
    let to = Address::repeat_byte(0x20);
    let log = transfer_log(address, from, to, 42_000_000);

    let parsed = registry.parse_log(&log).expect("should decode");
    assert_eq!(parsed.args.len(), 3);
    assert_eq!(parsed.args["from"], ArgValue::Address(from));
    assert_eq!(parsed.args["to"], ArgValue::Address(to));
    assert_eq!(parsed.args["value"], ArgValue::Uint(UintValue(U256::from(42_000_000u64))));
}
