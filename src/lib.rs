//! # chain-event-bus
//!
//! In-process event bus with subscription filtering, plus a contract-log
//! parsing and dispatch pipeline for blockchain event streams.
//!
//! ## Overview
//!
//! `chain-event-bus` fans domain events (blocks, transactions, raw logs,
//! chain configuration, validator set changes, decoded system-contract
//! events) out to in-process subscribers. Subscribers narrow the stream
//! by event kind and, for transactions, by an address/value/block
//! [`Filter`]. A separate [`ParserRegistry`]/[`EventPipeline`] pair turns
//! raw contract logs into named, typed events via runtime ABI schemas —
//! no per-contract codegen required — and republishes the result onto
//! the bus.
//!
//! Persistent storage, wire protocols, the node client, and HTTP/metrics
//! surfaces are not part of this crate; it exposes narrow trait seams
//! ([`Handler`], [`StorageHandler`], [`ContractParser`]) for those
//! concerns to plug into.
//!
//! ## Quick Start
//!
//! ```rust
//! use chain_event_bus::{EventBus, EventKind};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut sub = bus
//!     .subscribe("watcher", [EventKind::Block], None, 64)
//!     .await
//!     .unwrap();
//!
//! // ... elsewhere, a producer calls bus.publish(event).await ...
//!
//! if let Some(event) = sub.recv().await {
//!     println!("received {:?}", event.kind());
//! }
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`EventBus`] — single broker task, bounded per-subscriber queues,
//!   non-blocking delivery
//! - [`Filter`] — address/value/block predicate narrowing transaction
//!   delivery
//! - [`ContractAbi`]/[`AbiParser`] — runtime-schema-driven log decoding
//! - [`ParserRegistry`] — address-to-parser routing and handler dispatch
//!   tables
//! - [`EventPipeline`] — decode → handle → store → publish, per log

pub mod abi;
pub mod bus;
pub mod constants;
pub mod error;
pub mod event;
pub mod filter;
pub mod handler;
pub mod pipeline;
pub mod registry;
pub mod subscription;

pub use abi::{ArgSchema, ArgValue, ContractAbi, ContractParser, ParsedEvent, UintValue};
pub use bus::{BusStats, EventBus};
pub use error::{EventError, Result};
pub use event::{DecimalU256, Event, EventKind, RawLog, ReceiptRef};
pub use filter::Filter;
pub use handler::{Handler, StorageHandler};
pub use pipeline::EventPipeline;
pub use registry::ParserRegistry;
pub use subscription::{SubscriberId, SubscriberInfo, Subscription};
