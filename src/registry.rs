//! Parser registry — address-to-parser routing and event dispatch

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::abi::{AbiParser, ContractAbi, ContractParser, ParsedEvent};
use crate::error::{EventError, Result};
use crate::event::RawLog;
use crate::handler::{Handler, StorageHandler};

const DEFAULT_HANDLER_KEY: &str = "*";

fn lock_poisoned(what: &str) -> EventError {
    EventError::Internal(format!("{what} lock poisoned"))
}

/// Address-to-parser routing plus event-name-to-handler dispatch tables.
///
/// Each address may have at most one custom parser *and* at most one ABI
/// parser registered simultaneously (spec.md §4.4): the two are tracked in
/// independent tables so `RegisterParser`/`RegisterABI` never collide with
/// each other, only with a prior registration of their own kind.
///
/// One optional default handler backstops any event with no specific
/// handler registered. Storage handlers have no default — they register
/// for the specific event types they persist.
pub struct ParserRegistry {
    custom_parsers: RwLock<HashMap<alloy_primitives::Address, Arc<dyn ContractParser>>>,
    abi_parsers: RwLock<HashMap<alloy_primitives::Address, Arc<AbiParser>>>,
    handlers: RwLock<HashMap<String, Vec<Arc<dyn Handler>>>>,
    storage_handlers: RwLock<HashMap<String, Vec<Arc<dyn StorageHandler>>>>,
    default_handler: RwLock<Option<Arc<dyn Handler>>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            custom_parsers: RwLock::new(HashMap::new()),
            abi_parsers: RwLock::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            storage_handlers: RwLock::new(HashMap::new()),
            default_handler: RwLock::new(None),
        }
    }

    /// Register a hand-written parser for `address`. Independent of any
    /// ABI parser registered for the same address.
    pub fn register_parser(
        &self,
        address: alloy_primitives::Address,
        parser: Arc<dyn ContractParser>,
    ) -> Result<()> {
        let mut parsers = self
            .custom_parsers
            .write()
            .map_err(|_| lock_poisoned("custom parser registry"))?;
        if parsers.contains_key(&address) {
            return Err(EventError::DuplicateRegistration(format!("{address:#x}")));
        }
        parsers.insert(address, parser);
        Ok(())
    }

    /// Register a runtime ABI schema for `abi.address`, wrapped in an
    /// [`AbiParser`]. Independent of any custom parser registered for the
    /// same address.
    pub fn register_abi(&self, abi: ContractAbi) -> Result<()> {
        let address = abi.address;
        let mut abi_parsers = self
            .abi_parsers
            .write()
            .map_err(|_| lock_poisoned("abi parser registry"))?;
        if abi_parsers.contains_key(&address) {
            return Err(EventError::DuplicateRegistration(format!("{address:#x}")));
        }
        abi_parsers.insert(address, Arc::new(AbiParser::new(abi)));
        Ok(())
    }

    /// Remove both the custom parser and the ABI parser registered for
    /// `address`, if any. Returns whether either was present.
    pub fn unregister_parser(&self, address: alloy_primitives::Address) -> Result<bool> {
        let mut custom_parsers = self
            .custom_parsers
            .write()
            .map_err(|_| lock_poisoned("custom parser registry"))?;
        let mut abi_parsers = self
            .abi_parsers
            .write()
            .map_err(|_| lock_poisoned("abi parser registry"))?;
        let had_custom = custom_parsers.remove(&address).is_some();
        let had_abi = abi_parsers.remove(&address).is_some();
        Ok(had_custom || had_abi)
    }

    /// Register a handler for `handler.event_name()`. An event name of
    /// `"*"` installs it as the default handler; an explicit default is
    /// also settable via [`ParserRegistry::set_default_handler`].
    pub fn register_handler(&self, handler: Arc<dyn Handler>) -> Result<()> {
        let name = handler.event_name().to_string();
        if name == DEFAULT_HANDLER_KEY {
            return self.set_default_handler(handler);
        }
        let mut handlers = self.handlers.write().map_err(|_| lock_poisoned("handler table"))?;
        handlers.entry(name).or_default().push(handler);
        Ok(())
    }

    /// Register a storage handler for each of its declared event types.
    pub fn register_storage_handler(&self, handler: Arc<dyn StorageHandler>) -> Result<()> {
        let mut storage_handlers = self
            .storage_handlers
            .write()
            .map_err(|_| lock_poisoned("storage handler table"))?;
        for event_type in handler.event_types() {
            storage_handlers
                .entry(event_type.clone())
                .or_default()
                .push(handler.clone());
        }
        Ok(())
    }

    /// Install (or replace) the default handler invoked for events with
    /// no specific handler registered.
    pub fn set_default_handler(&self, handler: Arc<dyn Handler>) -> Result<()> {
        let mut default_handler = self
            .default_handler
            .write()
            .map_err(|_| lock_poisoned("default handler"))?;
        *default_handler = Some(handler);
        Ok(())
    }

    /// Decode `log` using the parser registered for its address.
    ///
    /// Routing order (spec.md §4.4): a custom parser for `log.address` is
    /// tried first, then the ABI parser for that address; the first of
    /// the two whose `can_parse` accepts the log decodes it.
    pub fn parse_log(&self, log: &RawLog) -> Result<ParsedEvent> {
        {
            let custom_parsers = self
                .custom_parsers
                .read()
                .map_err(|_| lock_poisoned("custom parser registry"))?;
            if let Some(parser) = custom_parsers.get(&log.address) {
                if parser.can_parse(log) {
                    return parser.parse(log);
                }
            }
        }
        {
            let abi_parsers = self
                .abi_parsers
                .read()
                .map_err(|_| lock_poisoned("abi parser registry"))?;
            if let Some(parser) = abi_parsers.get(&log.address) {
                if parser.can_parse(log) {
                    return parser.parse(log);
                }
            }
        }
        Err(EventError::NoParser(format!("{:#x}", log.address)))
    }

    /// Resolve the handlers to invoke for `event_name`: specific
    /// handlers if any are registered, otherwise the default handler if
    /// one is installed.
    pub fn handlers_for(&self, event_name: &str) -> Result<Vec<Arc<dyn Handler>>> {
        let handlers = self.handlers.read().map_err(|_| lock_poisoned("handler table"))?;
        if let Some(specific) = handlers.get(event_name) {
            if !specific.is_empty() {
                return Ok(specific.clone());
            }
        }
        drop(handlers);
        let default_handler = self
            .default_handler
            .read()
            .map_err(|_| lock_poisoned("default handler"))?;
        Ok(default_handler.iter().cloned().collect())
    }

    /// Storage handlers registered for `event_name`, if any.
    pub fn storage_handlers_for(&self, event_name: &str) -> Result<Vec<Arc<dyn StorageHandler>>> {
        let storage_handlers = self
            .storage_handlers
            .read()
            .map_err(|_| lock_poisoned("storage handler table"))?;
        Ok(storage_handlers.get(event_name).cloned().unwrap_or_default())
    }

    /// Whether any parser (custom or ABI) is registered for `address`.
    pub fn has_parser(&self, address: alloy_primitives::Address) -> bool {
        let has_custom = self
            .custom_parsers
            .read()
            .map(|p| p.contains_key(&address))
            .unwrap_or(false);
        let has_abi = self
            .abi_parsers
            .read()
            .map(|p| p.contains_key(&address))
            .unwrap_or(false);
        has_custom || has_abi
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
