//! Three-stage contract-log dispatch pipeline
//!
//! `process_log` decodes a raw log via the parser registry, then runs it
//! through `HandlerStage` (reactive handlers), `StorageStage` (storage
//! handlers), and `PublishStage` (re-publishes a decoded `SystemContract`
//! event onto the bus). Each stage short-circuits the pipeline on its
//! first failure; the publish stage is fire-and-forget and cannot fail
//! the pipeline.
//!
//! The handler and storage-handler lists for a log are resolved from the
//! registry once, before any stage runs, so a registration racing with
//! dispatch cannot produce a half-built pipeline for that log.

use std::sync::Arc;

use crate::abi::ParsedEvent;
use crate::bus::EventBus;
use crate::error::{EventError, Result};
use crate::event::{Event, RawLog};
use crate::handler::{Handler, StorageHandler};
use crate::registry::ParserRegistry;

struct HandlerStage {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerStage {
    async fn run(&self, parsed: &ParsedEvent) -> Result<()> {
        for handler in &self.handlers {
            handler
                .handle(parsed)
                .await
                .map_err(|source| EventError::HandlerFailed {
                    event_name: parsed.event_name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

struct StorageStage {
    handlers: Vec<Arc<dyn StorageHandler>>,
}

impl StorageStage {
    async fn run(&self, parsed: &ParsedEvent) -> Result<()> {
        for handler in &self.handlers {
            handler
                .store(parsed)
                .await
                .map_err(|source| EventError::StorageFailed {
                    event_name: parsed.event_name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

struct PublishStage<'a> {
    bus: &'a EventBus,
}

impl PublishStage<'_> {
    async fn run(&self, parsed: &ParsedEvent) {
        let event = Event::system_contract(
            parsed.address,
            parsed.event_name.clone(),
            parsed.block_number,
            parsed.transaction_hash,
            parsed.log_index,
            parsed.args.clone(),
        );
        // Fire-and-forget: a subscriber-side drop or a stopped bus does
        // not fail the pipeline (spec.md §4.5).
        let _ = self.bus.publish(event).await;
    }
}

/// Drives a raw log through decode → handle → store → publish.
pub struct EventPipeline {
    registry: Arc<ParserRegistry>,
    bus: EventBus,
}

impl EventPipeline {
    pub fn new(registry: Arc<ParserRegistry>, bus: EventBus) -> Self {
        Self { registry, bus }
    }

    /// Process one raw log to completion.
    ///
    /// Returns the decoded event on success. Propagates `NoParser` or
    /// `MalformedLog` from decoding, or `HandlerFailed`/`StorageFailed`
    /// from whichever stage failed first.
    pub async fn process_log(&self, log: &RawLog) -> Result<ParsedEvent> {
        let parsed = self.registry.parse_log(log)?;
        let handler_stage = HandlerStage {
            handlers: self.registry.handlers_for(&parsed.event_name)?,
        };
        let storage_stage = StorageStage {
            handlers: self.registry.storage_handlers_for(&parsed.event_name)?,
        };

        handler_stage.run(&parsed).await?;
        storage_stage.run(&parsed).await?;

        let publish_stage = PublishStage { bus: &self.bus };
        publish_stage.run(&parsed).await;

        Ok(parsed)
    }
}
