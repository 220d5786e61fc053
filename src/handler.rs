//! Handler and storage-handler seams consumed by the parser registry

use async_trait::async_trait;

use crate::abi::ParsedEvent;

/// A handler reacts to a decoded contract event.
///
/// An event name of `"*"` registers a default handler, invoked for any
/// event with no more specific handler registered. The `ParsedEvent`
/// passed to `handle` carries the log's provenance (contract address,
/// block number, transaction hash, log index) alongside its decoded
/// arguments, so a handler never has to re-derive where an event came
/// from.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name of the event this handler reacts to, or `"*"` for a default
    /// handler that matches any event.
    fn event_name(&self) -> &str;

    /// React to a decoded event. An error short-circuits the rest of the
    /// pipeline for this log (`spec.md` §4.5).
    async fn handle(&self, event: &ParsedEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// A storage handler persists a decoded contract event.
///
/// Unlike `Handler`, there is no default/wildcard storage handler —
/// storage handlers register for the specific event types they persist.
#[async_trait]
pub trait StorageHandler: Send + Sync {
    /// Event names this handler persists.
    fn event_types(&self) -> &[String];

    /// Persist a decoded event. An error short-circuits the rest of the
    /// pipeline for this log (`spec.md` §4.5).
    async fn store(&self, event: &ParsedEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
